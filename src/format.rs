//! Invoice output formats and the registry that maps request keys to them.
//!
//! The set of formats is closed: every renderer matches on [`InvoiceFormat`]
//! exhaustively. The [`FormatRegistry`] is built once at startup and handed to
//! the service; it only maps the user-facing type names onto variants.
//!
//! | Key   | Format | Response                         |
//! |-------|--------|----------------------------------|
//! | `raw` | Raw    | line items and their total       |
//! | `pdf` | Pdf    | redirect URL of the cached PDF   |

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Type name used when the request names none.
pub const DEFAULT_FORMAT: &str = "raw";

/// How an invoice is returned to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum InvoiceFormat {
    /// Line items and total as structured data.
    #[default]
    Raw,

    /// Reference to a cached PDF rendering.
    Pdf,
}

impl InvoiceFormat {
    pub const ALL: [InvoiceFormat; 2] = [InvoiceFormat::Raw, InvoiceFormat::Pdf];

    /// Request key of this format.
    pub fn name(&self) -> &'static str {
        match self {
            InvoiceFormat::Raw => "raw",
            InvoiceFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for InvoiceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable table of request keys to formats.
#[derive(Clone, Debug, Default)]
pub struct FormatRegistry {
    formats: HashMap<String, InvoiceFormat>,
}

impl FormatRegistry {
    /// Empty registry; every lookup fails until formats are registered.
    pub fn new() -> Self {
        FormatRegistry {
            formats: HashMap::new(),
        }
    }

    /// Registry with every format under its own name.
    pub fn standard() -> Self {
        InvoiceFormat::ALL
            .into_iter()
            .fold(FormatRegistry::new(), |registry, format| {
                registry.register(format.name(), format)
            })
    }

    /// Register `format` under `name`.
    pub fn register(mut self, name: impl Into<String>, format: InvoiceFormat) -> Self {
        self.formats.insert(name.into(), format);
        self
    }

    /// Look up a request key, falling back to `raw` when absent.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFormat` naming the key if it is not registered.
    pub fn resolve(&self, key: Option<&str>) -> Result<InvoiceFormat> {
        let key = key.unwrap_or(DEFAULT_FORMAT);
        self.formats.get(key).copied().ok_or_else(|| {
            warn!("Unknown invoice type requested: {}", key);
            Error::UnknownFormat(key.to_string())
        })
    }

    /// Registered keys, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
