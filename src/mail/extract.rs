use chrono_tz::Tz;
use log::warn;
use mailparse::{MailHeaderMap, ParsedMail};
use thiserror::Error;

use crate::domain::email::{MessageId, ParsedEmail, RawMessage};
use crate::mail::decoders::{first_plain_text, resolve_timestamp};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("message {id} is not a parseable RFC 822 message: {source}")]
    Malformed {
        id: MessageId,
        #[source]
        source: mailparse::MailParseError,
    },
}

/// Turn a fetched message into the fields the pipeline works on.
///
/// Only a message that cannot be parsed at all is an error. A bad Date
/// header becomes "now" and an undecodable body becomes empty.
pub fn extract(raw: &RawMessage, tz: Tz) -> Result<ParsedEmail, ExtractError> {
    let parsed = mailparse::parse_mail(&raw.rfc822).map_err(|source| ExtractError::Malformed {
        id: raw.id.clone(),
        source,
    })?;

    let sender = parsed.headers.get_first_value("From").unwrap_or_default();
    // get_first_value decodes RFC 2047 encoded words
    let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();
    let date = parsed.headers.get_first_value("Date");
    let timestamp = resolve_timestamp(date.as_deref(), tz);
    let body = extract_body(&raw.id, &parsed);

    Ok(ParsedEmail {
        sender,
        subject,
        body,
        timestamp,
    })
}

fn extract_body(id: &MessageId, parsed: &ParsedMail) -> String {
    if parsed.ctype.mimetype.starts_with("multipart/") {
        return first_plain_text(parsed).unwrap_or_else(|| {
            warn!("message {id}: no decodable text/plain part; using empty body");
            String::new()
        });
    }

    match parsed.get_body() {
        Ok(body) => body,
        Err(e) => {
            warn!("message {id}: body failed to decode ({e}); using empty body");
            String::new()
        }
    }
}
