//! Invoice rendering dispatch.

use crate::cache::PdfCache;
use crate::entity::InvoiceResult;
use crate::error::Result;
use crate::format::InvoiceFormat;

/// Route prefix under which cached artifacts are served.
pub const ACCESS_PDF_ROUTE: &str = "/api/access-pdf";

/// Per-request rendering context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderContext {
    /// Scheme and authority redirect URLs are built on, e.g.
    /// `http://localhost:8080`. Empty yields a bare path.
    pub base_url: String,
}

impl RenderContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        RenderContext {
            base_url: base_url.into(),
        }
    }

    /// URL at which the artifact `file_name` is served.
    pub fn artifact_url(&self, file_name: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            ACCESS_PDF_ROUTE,
            file_name
        )
    }
}

/// Outcome of rendering an invoice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedInvoice {
    /// The invoice itself.
    Raw(InvoiceResult),

    /// Where to fetch the cached PDF.
    Redirect { url: String },
}

/// Renders an [`InvoiceResult`] in the requested format.
pub struct InvoiceRenderer {
    cache: PdfCache,
}

impl InvoiceRenderer {
    pub fn new(cache: PdfCache) -> Self {
        InvoiceRenderer { cache }
    }

    pub fn cache(&self) -> &PdfCache {
        &self.cache
    }

    /// Render `invoice` as `format`.
    ///
    /// Raw never fails. Pdf fills the cache on a miss (a disk write) and
    /// returns a redirect to the artifact.
    ///
    /// # Errors
    ///
    /// - `Error::Generation` / `Error::Storage`: the PDF could not be produced
    pub async fn render(
        &self,
        format: InvoiceFormat,
        invoice: InvoiceResult,
        context: &RenderContext,
    ) -> Result<RenderedInvoice> {
        match format {
            InvoiceFormat::Raw => Ok(RenderedInvoice::Raw(invoice)),
            InvoiceFormat::Pdf => {
                let artifact = self
                    .cache
                    .get_or_create(&invoice.entities, invoice.total_sum)
                    .await?;
                Ok(RenderedInvoice::Redirect {
                    url: context.artifact_url(&artifact.file_name()),
                })
            }
        }
    }
}
