use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "job_mail_tracker";

fn entry(account: &str) -> Result<Entry> {
    Entry::new(SERVICE, account).map_err(|e| anyhow!("keyring entry for {account}: {e}"))
}

fn load(account: &str) -> Result<Option<String>> {
    match entry(account)?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

fn save(account: &str, secret: &str) -> Result<()> {
    entry(account)?
        .set_password(secret)
        .map_err(|e| anyhow!(e.to_string()))
}

/// Refresh tokens are keyed by the mailbox address.
pub fn save_refresh_token(user_email: &str, refresh_token: &str) -> Result<()> {
    save(user_email, refresh_token)
}

pub fn load_refresh_token(user_email: &str) -> Result<Option<String>> {
    load(user_email)
}

/// Client secrets are keyed by the OAuth client id.
pub fn save_client_secret(client_id: &str, client_secret: &str) -> Result<()> {
    save(client_id, client_secret)
}

pub fn load_client_secret(client_id: &str) -> Result<Option<String>> {
    load(client_id)
}
