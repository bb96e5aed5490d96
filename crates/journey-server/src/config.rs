use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

const PLACEHOLDER_SECRETS: &[&str] = &["", "change-me", "dev-secret-change-me", "secret"];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub session_secret: String,
    pub invite_secret: String,
    /// Base used when building invitation links.
    pub public_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = get("JOURNEY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("JOURNEY_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("JOURNEY_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("JOURNEY_HOST must be an IP address")?;

        let session_secret = secret(&get, "JOURNEY_SESSION_SECRET")?;
        let invite_secret = secret(&get, "JOURNEY_INVITE_SECRET")?;
        if session_secret == invite_secret {
            bail!("JOURNEY_SESSION_SECRET and JOURNEY_INVITE_SECRET must differ");
        }

        Ok(Self {
            addr,
            db_path: PathBuf::from(get("JOURNEY_DB_PATH").unwrap_or_else(|| "journey.db".into())),
            session_secret,
            invite_secret,
            public_url: get("JOURNEY_PUBLIC_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
        })
    }
}

fn secret(get: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    let value = get(key).with_context(|| format!("{} is not set", key))?;
    if PLACEHOLDER_SECRETS.contains(&value.trim()) {
        bail!("{} is still a placeholder", key);
    }
    Ok(value)
}
