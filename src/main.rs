use invoice_kit::http::{self, AppState};
use invoice_kit::observability::LogMetrics;
use invoice_kit::{FormatRegistry, InMemoryProductStore, InvoiceService, PdfCache, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()
        .ok();

    let config = ServerConfig::from_env()?;

    let store = if config.seed_products {
        InMemoryProductStore::with_demo_catalogue()
    } else {
        InMemoryProductStore::new()
    };
    log::info!("Product store ready with {} products", store.len());

    let cache = PdfCache::new(&config.storage_dir).with_metrics(Box::new(LogMetrics));
    cache.prepare().await?;

    let service = InvoiceService::new(store, FormatRegistry::standard(), cache)?;
    let app = http::router(AppState::new(service, config.public_url.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!(
        "invoice-server {} listening on http://{} (artifacts in {})",
        invoice_kit::VERSION,
        config.bind_addr,
        config.storage_dir.display()
    );

    axum::serve(listener, app).await?;
    Ok(())
}
