use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::app_dir;

/// Tokens are treated as expired this many seconds early.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Short-lived access token kept on disk between runs. Not a secret store:
/// the refresh token stays in the keyring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at_epoch: i64,
}

impl CachedToken {
    pub fn new(access_token: String, now: i64, expires_in: Option<u64>) -> Self {
        let lifetime = expires_in.map(|s| s as i64).unwrap_or(3500);
        Self {
            access_token,
            expires_at_epoch: now + lifetime,
        }
    }

    pub fn is_valid(&self, now: i64) -> bool {
        !self.access_token.is_empty() && now + EXPIRY_SKEW_SECS < self.expires_at_epoch
    }
}

pub fn cache_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("token_cache.json"))
}

pub fn load_from(path: &Path) -> Result<Option<CachedToken>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path)?;
    // A corrupt cache only costs one refresh.
    Ok(serde_json::from_str(&s).ok())
}

pub fn save_to(path: &Path, token: &CachedToken) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(token)?)?;
    Ok(())
}

pub fn load() -> Result<Option<CachedToken>> {
    load_from(&cache_path()?)
}

pub fn save(token: &CachedToken) -> Result<()> {
    save_to(&cache_path()?, token)
}
