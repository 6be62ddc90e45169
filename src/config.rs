use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => anyhow::bail!("unknown STORE {other:?}, expected postgres or memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let store = match lookup("STORE") {
            Some(v) => v.parse()?,
            None => StoreKind::Postgres,
        };
        let database_url = lookup("DATABASE_URL");
        if store == StoreKind::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE=postgres");
        }
        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS")?,
            None => 10,
        };
        let port = match lookup("APP_PORT") {
            Some(v) => v.parse().context("APP_PORT")?,
            None => 8080,
        };
        Ok(Self {
            store,
            database_url,
            max_connections,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
