//! Server configuration from environment variables.
//!
//! | Variable                | Default           |
//! |-------------------------|-------------------|
//! | `INVOICE_BIND_ADDR`     | `127.0.0.1:8080`  |
//! | `INVOICE_PDF_DIR`       | `pdf-invoices`    |
//! | `INVOICE_PUBLIC_URL`    | request `Host`    |
//! | `INVOICE_SEED_PRODUCTS` | `true`            |

use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const BIND_ADDR_VAR: &str = "INVOICE_BIND_ADDR";
pub const PDF_DIR_VAR: &str = "INVOICE_PDF_DIR";
pub const PUBLIC_URL_VAR: &str = "INVOICE_PUBLIC_URL";
pub const SEED_PRODUCTS_VAR: &str = "INVOICE_SEED_PRODUCTS";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_PDF_DIR: &str = "pdf-invoices";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding cached artifacts.
    pub storage_dir: PathBuf,
    /// Base for redirect URLs; `None` derives it from the request.
    pub public_url: Option<String>,
    /// Fill the product store with the demo catalogue.
    pub seed_products: bool,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for malformed values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for malformed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup(BIND_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::ConfigError(format!("{}: {}", BIND_ADDR_VAR, e)))?;

        let storage_dir: PathBuf = lookup(PDF_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PDF_DIR.to_string())
            .into();

        let public_url = lookup(PUBLIC_URL_VAR)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let seed_products = match lookup(SEED_PRODUCTS_VAR) {
            None => true,
            Some(value) => parse_flag(&value).ok_or_else(|| {
                Error::ConfigError(format!(
                    "{}: expected true or false, got {:?}",
                    SEED_PRODUCTS_VAR, value
                ))
            })?,
        };

        Ok(ServerConfig {
            bind_addr,
            storage_dir,
            public_url,
            seed_products,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            storage_dir: PathBuf::from(DEFAULT_PDF_DIR),
            public_url: None,
            seed_products: true,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
