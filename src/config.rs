use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::classifier::ClassifierConfig;
use crate::pipeline::filter::FilterRules;

/// Environment variables read for unattended runs (e.g. a scheduled job with
/// no config file and no keyring).
pub const CLIENT_ID_ENV: &str = "GMAIL_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "GMAIL_CLIENT_SECRET";
pub const REFRESH_TOKEN_ENV: &str = "GMAIL_REFRESH_TOKEN";
pub const USER_EMAIL_ENV: &str = "GMAIL_USER_EMAIL";

pub const DEFAULT_QUERY: &str = r#"(subject:job OR subject:application OR subject:interview OR subject:work OR from:(linkedin.com OR indeed.com OR "noreply@"))"#;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Overridden by `GMAIL_CLIENT_ID`.
    #[serde(default)]
    pub client_id: String,
    /// Overridden by `GMAIL_USER_EMAIL`.
    pub user_email: Option<String>,
    pub imap_server: Option<String>,
    pub redirect_uri: Option<String>,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Gmail search expression; empty fetches everything.
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub filter: FilterRules,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Overridden by `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("job_emails.csv")
}

fn default_batch_size() -> u32 {
    50
}

fn default_timezone() -> String {
    "Europe/Dublin".to_string()
}

fn default_query() -> String {
    DEFAULT_QUERY.to_string()
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl Config {
    /// Built-in defaults with no credentials; used when only the
    /// environment is configured.
    fn defaults() -> Self {
        Config {
            client_id: String::new(),
            user_email: None,
            imap_server: None,
            redirect_uri: None,
            output_path: default_output_path(),
            batch_size: default_batch_size(),
            timezone: default_timezone(),
            query: default_query(),
            summarizer: SummarizerConfig::default(),
            filter: FilterRules::default(),
            classifier: ClassifierConfig::default(),
        }
    }

    fn template() -> Self {
        Config {
            client_id: "YOUR_CLIENT_ID.apps.googleusercontent.com".to_string(),
            user_email: Some("you@gmail.com".to_string()),
            imap_server: Some("imap.gmail.com".to_string()),
            redirect_uri: Some("http://127.0.0.1:8080/callback".to_string()),
            output_path: default_output_path(),
            batch_size: default_batch_size(),
            timezone: default_timezone(),
            query: default_query(),
            summarizer: SummarizerConfig::default(),
            filter: FilterRules::default(),
            classifier: ClassifierConfig::default(),
        }
    }

    /// Let non-empty `GMAIL_CLIENT_ID` / `GMAIL_USER_EMAIL` replace the file values.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        if let Some(id) = var(CLIENT_ID_ENV) {
            self.client_id = id;
        }
        if let Some(email) = var(USER_EMAIL_ENV) {
            self.user_email = Some(email);
        }
    }

    pub fn client_id(&self) -> Result<&str> {
        Some(self.client_id.as_str())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow!("client_id not set in config or {CLIENT_ID_ENV}"))
    }

    pub fn user_email(&self) -> Result<&str> {
        self.user_email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| anyhow!("user_email not set in config or {USER_EMAIL_ENV}"))
    }

    pub fn imap_server(&self) -> &str {
        self.imap_server.as_deref().unwrap_or("imap.gmail.com")
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri
            .as_deref()
            .unwrap_or("http://127.0.0.1:8080/callback")
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid timezone {:?}: {e}", self.timezone))
    }

    pub fn query(&self) -> Option<&str> {
        Some(self.query.trim()).filter(|q| !q.is_empty())
    }

    /// `OPENAI_API_KEY` first, then the config file. Empty means unset.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .or_else(|| self.summarizer.api_key.clone())
            .filter(|k| !k.trim().is_empty())
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join("job_mail_tracker"))
}

pub fn app_dir() -> Result<PathBuf> {
    let p = config_dir()?;
    fs::create_dir_all(&p)?;
    Ok(p)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("config.toml"))
}

/// Write a template with every default filled in.
pub fn write_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml::to_string_pretty(&Config::template())?)?;
    Ok(())
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s)?;
    cfg.timezone()?;
    Ok(cfg)
}

/// Load `path`, or the default location when `None`, then apply the
/// environment overrides.
///
/// A missing file with `GMAIL_CLIENT_ID` set runs on built-in defaults.
/// Otherwise a missing file gets a template written in its place and an
/// error back, so the first run stops before touching the mailbox.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if !path.exists() {
        let mut cfg = Config::defaults();
        cfg.apply_env(env_var);
        if cfg.client_id().is_ok() {
            info!("{} not found; using defaults and environment", path.display());
            return Ok(cfg);
        }
        write_template(&path)?;
        return Err(anyhow!(
            "Created template config at {} - edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(&path)?;
    let mut cfg = parse_config(&s).map_err(|e| anyhow!("{}: {e}", path.display()))?;
    cfg.apply_env(env_var);
    Ok(cfg)
}
