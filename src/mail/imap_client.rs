use crate::domain::email::{MessageId, RawMessage};
use crate::mail::Mailbox;
use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use log::{debug, info};
use native_tls::TlsConnector;
use std::net::TcpStream;

type TlsSession = imap::Session<native_tls::TlsStream<TcpStream>>;

const IMAP_PORT: u16 = 993;
const FOLDER: &str = "INBOX";

/// Build canonical auth string as bytes.
fn build_xoauth2_bytes(user: &str, access_token: &str) -> Vec<u8> {
    format!("user={user}\x01auth=Bearer {access_token}\x01\x01").into_bytes()
}

struct OAuth2Authenticator {
    response: Vec<u8>,
}

impl imap::Authenticator for OAuth2Authenticator {
    type Response = Vec<u8>;
    fn process(&self, _challenge: &[u8]) -> Self::Response {
        self.response.clone()
    }
}

/// Search key for a Gmail query, or every message when there is none.
fn search_command(query: Option<&str>) -> String {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => format!("X-GM-RAW {}", quote_imap_string(q)),
        None => "ALL".to_string(),
    }
}

fn quote_imap_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Newest `max` uids, newest first.
fn newest_first(mut uids: Vec<u32>, max: u32) -> Vec<u32> {
    uids.sort_unstable_by(|a, b| b.cmp(a));
    uids.dedup();
    uids.truncate(max as usize);
    uids
}

/// Gmail inbox over IMAP, authenticated with an OAuth2 access token.
pub struct ImapMailbox {
    session: TlsSession,
}

impl ImapMailbox {
    pub fn connect(server: &str, user: &str, access_token: &str) -> Result<Self> {
        let tls = TlsConnector::builder().build()?;
        let mut client = imap::connect((server, IMAP_PORT), server, &tls)
            .with_context(|| format!("connecting to {server}:{IMAP_PORT}"))?;

        let raw_payload = build_xoauth2_bytes(user, access_token);

        // Try RAW first
        let auth_raw = OAuth2Authenticator {
            response: raw_payload.clone(),
        };
        let mut session = match client.authenticate("XOAUTH2", &auth_raw) {
            Ok(session) => session,
            Err((e, returned_client)) => {
                debug!("raw XOAUTH2 rejected ({e}); retrying base64");
                client = returned_client;

                // Fallback BASE64
                let auth_b64 = OAuth2Authenticator {
                    response: general_purpose::STANDARD.encode(&raw_payload).into_bytes(),
                };
                client
                    .authenticate("XOAUTH2", &auth_b64)
                    .map_err(|(e, _)| anyhow!("XOAUTH2 failed (raw+base64): {e}"))?
            }
        };

        session.select(FOLDER)?;
        info!("authenticated to {server} as {user}");
        Ok(Self { session })
    }
}

impl Mailbox for ImapMailbox {
    fn list_message_ids(&mut self, query: Option<&str>, max: u32) -> Result<Vec<MessageId>> {
        let command = search_command(query);
        let uids: Vec<u32> = self
            .session
            .uid_search(&command)
            .with_context(|| format!("UID SEARCH {command}"))?
            .into_iter()
            .collect();
        debug!("{} messages match {command}", uids.len());

        Ok(newest_first(uids, max)
            .into_iter()
            .map(|uid| uid.to_string())
            .collect())
    }

    fn fetch_message(&mut self, id: &MessageId) -> Result<RawMessage> {
        let fetches = self.session.uid_fetch(id, "(UID BODY.PEEK[])")?;
        let f = fetches
            .iter()
            .next()
            .ok_or_else(|| anyhow!("email UID {id} not found"))?;
        let body = f
            .body()
            .ok_or_else(|| anyhow!("UID {id}: server returned no body"))?;

        Ok(RawMessage {
            id: id.clone(),
            rfc822: body.to_vec(),
        })
    }

    fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        Ok(())
    }
}
