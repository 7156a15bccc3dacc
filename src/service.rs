//! High-level invoice service for web applications.
//!
//! Bundles the product aggregator, the format registry, the renderer and the
//! file name guard behind one cheaply clonable handle.

use crate::aggregator::ProductAggregator;
use crate::cache::PdfCache;
use crate::entity::{ProductId, ProductRecord};
use crate::error::Result;
use crate::format::FormatRegistry;
use crate::guard::{FileNameGuard, SafeName};
use crate::render::{InvoiceRenderer, RenderContext, RenderedInvoice};
use crate::repository::ProductStore;
use std::sync::Arc;

/// Invoice service shared across request handlers.
///
/// Clones share the same store, registry and cache.
///
/// # Example
///
/// ```no_run
/// use invoice_kit::{FormatRegistry, InMemoryProductStore, InvoiceService, PdfCache};
/// use invoice_kit::render::RenderContext;
///
/// # async fn run() -> invoice_kit::Result<()> {
/// let service = InvoiceService::new(
///     InMemoryProductStore::with_demo_catalogue(),
///     FormatRegistry::standard(),
///     PdfCache::new("pdf-invoices"),
/// )?;
///
/// let rendered = service
///     .invoice(Some("pdf"), &[1, 3], &RenderContext::new("http://localhost:8080"))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct InvoiceService<S: ProductStore> {
    aggregator: ProductAggregator<S>,
    formats: Arc<FormatRegistry>,
    renderer: Arc<InvoiceRenderer>,
    guard: Arc<FileNameGuard>,
}

impl<S: ProductStore> InvoiceService<S> {
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the file name guard cannot be built.
    pub fn new(store: S, formats: FormatRegistry, cache: PdfCache) -> Result<Self> {
        Ok(InvoiceService {
            aggregator: ProductAggregator::new(store),
            formats: Arc::new(formats),
            renderer: Arc::new(InvoiceRenderer::new(cache)),
            guard: Arc::new(FileNameGuard::new()?),
        })
    }

    pub fn store(&self) -> &S {
        self.aggregator.store()
    }

    pub fn cache(&self) -> &PdfCache {
        self.renderer.cache()
    }

    /// Every product in the store.
    pub async fn products(&self) -> Result<Vec<ProductRecord>> {
        self.store().fetch_all().await
    }

    /// Resolve `ids` and render them as the format named by `kind`.
    ///
    /// The format is checked before any product lookup.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownFormat`: `kind` is not registered
    /// - `Error::ProductNotFound`: the first ID missing from the store
    /// - `Error::Store`: the store failed
    /// - `Error::Generation` / `Error::Storage`: the PDF could not be produced
    pub async fn invoice(
        &self,
        kind: Option<&str>,
        ids: &[ProductId],
        context: &RenderContext,
    ) -> Result<RenderedInvoice> {
        let format = self.formats.resolve(kind)?;
        let invoice = self.aggregator.resolve(ids).await?;
        debug!("Rendering {} line items as {}", invoice.len(), format);
        self.renderer.render(format, invoice, context).await
    }

    /// Read a cached artifact by a caller-supplied name.
    ///
    /// # Errors
    ///
    /// - `Error::IllegalFileAccess`: the name failed the guard
    /// - `Error::ArtifactMissing`: no artifact by that name
    /// - `Error::Storage`: the artifact could not be read
    pub async fn access_pdf(&self, raw_name: &str) -> Result<(SafeName, Vec<u8>)> {
        let name = self.guard.validate(raw_name)?;
        let bytes = self.cache().read(&name).await?;
        Ok((name, bytes))
    }
}

impl<S: ProductStore> Clone for InvoiceService<S> {
    fn clone(&self) -> Self {
        InvoiceService {
            aggregator: self.aggregator.clone(),
            formats: Arc::clone(&self.formats),
            renderer: Arc::clone(&self.renderer),
            guard: Arc::clone(&self.guard),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::repository::InMemoryProductStore;

    fn service(dir: &tempfile::TempDir) -> InvoiceService<InMemoryProductStore> {
        let store = vec![
            ProductRecord::new(1, "ItemA", 7),
            ProductRecord::new(2, "ItemB", 14),
            ProductRecord::new(3, "ItemC", 9),
        ]
        .into_iter()
        .collect();
        InvoiceService::new(store, FormatRegistry::standard(), PdfCache::new(dir.path()))
            .expect("service")
    }

    #[tokio::test]
    async fn test_unknown_format_wins_over_missing_product() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = service(&dir)
            .invoice(Some("xml"), &[99], &RenderContext::default())
            .await
            .expect_err("unknown format");
        assert_eq!(err, Error::UnknownFormat("xml".to_string()));
    }

    #[tokio::test]
    async fn test_missing_product_aborts_pdf_before_rendering() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = service(&dir)
            .invoice(Some("pdf"), &[1, 42], &RenderContext::default())
            .await
            .expect_err("missing product");
        assert_eq!(err, Error::ProductNotFound(42));
        assert_eq!(std::fs::read_dir(dir.path()).expect("list").count(), 0);
    }

    #[tokio::test]
    async fn test_access_pdf_rejects_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = service(&dir)
            .access_pdf("../../etc/passwd")
            .await
            .expect_err("illegal name");
        assert_eq!(err, Error::IllegalFileAccess);
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(&dir);
        let clone = service.clone();

        let url = match service
            .invoice(Some("pdf"), &[2], &RenderContext::default())
            .await
            .expect("pdf")
        {
            RenderedInvoice::Redirect { url } => url,
            other => panic!("expected redirect, got {:?}", other),
        };
        let file = url.rsplit('/').next().expect("file name");

        let (name, bytes) = clone.access_pdf(file).await.expect("served by clone");
        assert_eq!(name.as_str(), file);
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
