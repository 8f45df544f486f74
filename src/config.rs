//! Process configuration read from `ACCOUNT_*` environment variables.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use crate::identity::{DisplayNamePolicy, TokenSettings, DEFAULT_TTL_SECS};

pub const DEFAULT_HTTP_PORT: u16 = 8081;
/// Development-only signing secret. Deployments must set `ACCOUNT_JWT_SECRET`.
pub const DEV_JWT_SECRET: &str = "mySecretKeyForJWTTokenGenerationThatIsLongEnough";
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    /// `Some` selects the file-backed store rooted here; `None` keeps identities in memory.
    pub db_folder: Option<PathBuf>,
    pub token: TokenSettings,
    pub display_name_policy: DisplayNamePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            db_folder: None,
            token: TokenSettings::new(DEV_JWT_SECRET, DEFAULT_TTL_SECS),
            display_name_policy: DisplayNamePolicy::Lenient,
        }
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("{} must be a boolean, got '{}'", name, other)),
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(p) = lookup("ACCOUNT_HTTP_PORT") {
            cfg.http_port = p.trim().parse().with_context(|| format!("ACCOUNT_HTTP_PORT is not a port: '{}'", p))?;
        }
        if let Some(dir) = lookup("ACCOUNT_DB_FOLDER").filter(|d| !d.trim().is_empty()) {
            cfg.db_folder = Some(PathBuf::from(dir.trim()));
        }
        if let Some(secret) = lookup("ACCOUNT_JWT_SECRET") {
            cfg.token.secret = secret;
        }
        if let Some(ttl) = lookup("ACCOUNT_JWT_EXPIRATION") {
            cfg.token.ttl_secs = ttl.trim().parse().with_context(|| format!("ACCOUNT_JWT_EXPIRATION is not a number of seconds: '{}'", ttl))?;
        }
        if let Some(flag) = lookup("ACCOUNT_STRICT_DISPLAY_NAME") {
            if parse_bool("ACCOUNT_STRICT_DISPLAY_NAME", &flag)? {
                cfg.display_name_policy = DisplayNamePolicy::strict();
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.secret.len() < MIN_SECRET_BYTES {
            bail!("ACCOUNT_JWT_SECRET must be at least {} bytes", MIN_SECRET_BYTES);
        }
        if self.token.ttl_secs == 0 {
            bail!("ACCOUNT_JWT_EXPIRATION must be greater than zero");
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool { self.token.secret == DEV_JWT_SECRET }
}
