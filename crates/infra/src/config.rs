//! Configuration loading and representation.
//!
//! Everything comes from environment variables:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `DATABASE_URL` | unset | Postgres URL; unset selects the in-memory store |
//! | `DB_MAX_CONNECTIONS` | `5` | Postgres pool size |
//! | `CATALOG_SEED` | `true` | seed demo categories and tags |

use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Which store implementation backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub bind_addr: SocketAddr,
    pub backend: StoreBackend,
    pub seed_demo_data: bool,
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let backend = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(database_url) => {
                let max_connections = match lookup("DB_MAX_CONNECTIONS") {
                    Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                        ConfigError::Invalid {
                            var: "DB_MAX_CONNECTIONS",
                            reason: format!("expected a positive integer, got {raw:?}"),
                        }
                    })?,
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                StoreBackend::Postgres {
                    database_url,
                    max_connections,
                }
            }
            None => StoreBackend::InMemory,
        };

        let seed_demo_data = match lookup("CATALOG_SEED") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "CATALOG_SEED",
                reason: format!("expected true/false, got {raw:?}"),
            })?,
            None => true,
        };

        Ok(Self {
            bind_addr,
            backend,
            seed_demo_data,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
