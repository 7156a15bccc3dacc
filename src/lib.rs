//! # invoice-kit
//!
//! Resolves product IDs into invoices and renders them either as structured
//! data or as cached PDF documents.
//!
//! ## Features
//!
//! - **Fail-fast aggregation:** IDs resolve in request order; the first
//!   unknown ID aborts the invoice
//! - **Closed format set:** `raw` and `pdf`, looked up in a registry built at startup
//! - **Content-addressed PDF cache:** one artifact per distinct line item
//!   sequence, generated at most once even under concurrent requests
//! - **Guarded read path:** caller-supplied file names are validated before
//!   they touch the filesystem
//! - **Store agnostic:** implement [`ProductStore`] for any product backend
//!
//! ## Quick Start
//!
//! ```ignore
//! use invoice_kit::{
//!     http, FormatRegistry, InMemoryProductStore, InvoiceService, PdfCache,
//! };
//!
//! let cache = PdfCache::new("pdf-invoices");
//! cache.prepare().await?;
//!
//! let service = InvoiceService::new(
//!     InMemoryProductStore::with_demo_catalogue(),
//!     FormatRegistry::standard(),
//!     cache,
//! )?;
//!
//! let app = http::router(http::AppState::new(service, None));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#[macro_use]
extern crate log;

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod format;
pub mod guard;
pub mod http;
pub mod key;
pub mod observability;
pub mod render;
pub mod repository;
pub mod service;

// Re-exports for convenience
pub use aggregator::ProductAggregator;
pub use cache::{CachedArtifact, PdfCache};
pub use config::ServerConfig;
pub use document::PdfDocumentBuilder;
pub use entity::{InvoiceResult, ProductId, ProductRecord};
pub use error::{Error, Result};
pub use format::{FormatRegistry, InvoiceFormat};
pub use guard::{FileNameGuard, SafeName};
pub use key::CacheKey;
pub use render::{InvoiceRenderer, RenderContext, RenderedInvoice};
pub use repository::{InMemoryProductStore, ProductStore};
pub use service::InvoiceService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
