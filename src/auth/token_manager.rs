use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::token_cache::{self, CachedToken};
use crate::auth::{oauth, token_store};
use crate::config::{CLIENT_SECRET_ENV, Config, REFRESH_TOKEN_ENV};

#[derive(Clone)]
pub struct TokenManager {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub user_email: String,
}

fn now_epoch() -> Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

/// Non-empty environment value first, then the keyring. A keyring error is
/// logged and counts as nothing stored.
fn resolve_secret(
    what: &str,
    env: Option<String>,
    stored: impl FnOnce() -> Result<Option<String>>,
) -> Option<String> {
    if let Some(v) = env.filter(|v| !v.trim().is_empty()) {
        return Some(v);
    }
    match stored() {
        Ok(v) => v,
        Err(e) => {
            warn!("keyring unavailable for {what}: {e}");
            None
        }
    }
}

impl TokenManager {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client_id = cfg.client_id()?.to_string();
        let client_secret = resolve_secret(
            "client secret",
            std::env::var(CLIENT_SECRET_ENV).ok(),
            || token_store::load_client_secret(&client_id),
        );

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: cfg.redirect_uri().to_string(),
            user_email: cfg.user_email()?.to_string(),
        })
    }

    fn refresh_token(&self) -> Option<String> {
        resolve_secret(
            "refresh token",
            std::env::var(REFRESH_TOKEN_ENV).ok(),
            || token_store::load_refresh_token(&self.user_email),
        )
    }

    /// A usable access token: the cached one while it lasts, otherwise a
    /// fresh one from the refresh token. Never opens a browser.
    pub fn access_token(&self) -> Result<String> {
        let now = now_epoch()?;

        if let Some(cached) = token_cache::load()?
            && cached.is_valid(now)
        {
            debug!("using cached access token");
            return Ok(cached.access_token);
        }

        let rt = self.refresh_token().ok_or_else(|| {
            anyhow!(
                "no refresh token for {}; run `job_mail_tracker authorize` \
                 or set {REFRESH_TOKEN_ENV}",
                self.user_email
            )
        })?;

        let t = oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), &rt)?;
        if let Some(rotated) = &t.refresh_token
            && let Err(e) = token_store::save_refresh_token(&self.user_email, rotated)
        {
            warn!("could not store rotated refresh token: {e}");
        }
        token_cache::save(&CachedToken::new(t.access_token.clone(), now, t.expires_in))?;
        info!("access token refreshed for {}", self.user_email);
        Ok(t.access_token)
    }

    /// Interactive browser consent; stores the refresh token in the keyring.
    pub fn authorize(&self) -> Result<()> {
        let now = now_epoch()?;
        let t = oauth::perform_pkce_flow(
            &self.client_id,
            self.client_secret.as_deref(),
            &self.redirect_uri,
        )?;

        let rt = t
            .refresh_token
            .as_deref()
            .ok_or_else(|| anyhow!("Google returned no refresh token; revoke access and retry"))?;
        token_store::save_refresh_token(&self.user_email, rt)?;
        token_cache::save(&CachedToken::new(t.access_token, now, t.expires_in))?;
        info!("refresh token stored for {}", self.user_email);
        Ok(())
    }
}
