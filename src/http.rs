//! HTTP surface over [`InvoiceService`].
//!
//! | Route                          | Response                                   |
//! |--------------------------------|--------------------------------------------|
//! | `GET /api/products`            | every product                              |
//! | `GET /api/invoice?id=..`       | raw invoice                                |
//! | `GET /api/invoice/{type}?id=..`| raw invoice or `{"redirectUrl": ..}`       |
//! | `GET /api/access-pdf/{file}`   | cached PDF bytes                           |
//!
//! Errors are returned as `{"status": "<message>"}`: 400 for caller errors,
//! 500 for storage and rendering failures.

use crate::entity::ProductId;
use crate::error::{Error, Result};
use crate::render::{RenderContext, RenderedInvoice};
use crate::repository::ProductStore;
use crate::service::InvoiceService;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

/// Query parameter carrying product IDs.
const ID_PARAM: &str = "id";

/// Shared handler state.
pub struct AppState<S: ProductStore> {
    service: InvoiceService<S>,
    public_url: Option<String>,
}

impl<S: ProductStore> AppState<S> {
    /// `public_url` overrides the `Host`-derived base of redirect URLs.
    pub fn new(service: InvoiceService<S>, public_url: Option<String>) -> Self {
        AppState {
            service,
            public_url,
        }
    }

    pub fn service(&self) -> &InvoiceService<S> {
        &self.service
    }

    fn render_context(&self, headers: &HeaderMap) -> RenderContext {
        if let Some(url) = &self.public_url {
            return RenderContext::new(url.clone());
        }
        headers
            .get(header::HOST)
            .and_then(|host| host.to_str().ok())
            .map(|host| RenderContext::new(format!("http://{}", host)))
            .unwrap_or_default()
    }
}

impl<S: ProductStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            service: self.service.clone(),
            public_url: self.public_url.clone(),
        }
    }
}

/// Build the router with every route under `/api`.
pub fn router<S: ProductStore + 'static>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/products", get(list_products::<S>))
        .route("/invoice", get(invoice_default::<S>))
        .route("/invoice/{type}", get(invoice_typed::<S>))
        .route("/access-pdf/{file}", get(access_pdf::<S>));

    Router::new().nest("/api", api).with_state(state)
}

async fn list_products<S: ProductStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Response> {
    let products = state.service.products().await?;
    Ok(Json(products).into_response())
}

async fn invoice_default<S: ProductStore + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response> {
    let params = query_params(query)?;
    respond_invoice(&state, None, &headers, &params).await
}

async fn invoice_typed<S: ProductStore + 'static>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response> {
    let params = query_params(query)?;
    respond_invoice(&state, Some(&kind), &headers, &params).await
}

async fn respond_invoice<S: ProductStore>(
    state: &AppState<S>,
    kind: Option<&str>,
    headers: &HeaderMap,
    params: &[(String, String)],
) -> Result<Response> {
    let ids = parse_ids(params)?;
    let context = state.render_context(headers);

    let response = match state.service.invoice(kind, &ids, &context).await? {
        RenderedInvoice::Raw(invoice) => Json(invoice).into_response(),
        RenderedInvoice::Redirect { url } => Json(json!({ "redirectUrl": url })).into_response(),
    };
    Ok(response)
}

async fn access_pdf<S: ProductStore + 'static>(
    State(state): State<AppState<S>>,
    Path(file): Path<String>,
) -> Result<Response> {
    let (_, bytes) = state.service.access_pdf(&file).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response())
}

/// Unwrap an extracted query string, turning axum's rejection into
/// `Error::InvalidRequest` so it gets the JSON error body.
fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| Error::InvalidRequest(rejection.body_text()))
}

/// Collect product IDs from repeated and/or comma-separated `id` parameters,
/// in order of appearance.
///
/// # Errors
///
/// Returns `Error::InvalidRequest` if no `id` parameter is present or an ID
/// is not an integer.
pub fn parse_ids(params: &[(String, String)]) -> Result<Vec<ProductId>> {
    let mut present = false;
    let mut ids = Vec::new();

    for (_, value) in params.iter().filter(|(name, _)| name == ID_PARAM) {
        present = true;
        for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let id = part
                .parse::<ProductId>()
                .map_err(|_| Error::InvalidRequest(format!("Invalid product ID {}.", part)))?;
            ids.push(id);
        }
    }

    if !present {
        return Err(Error::InvalidRequest(format!(
            "Required parameter '{}' is not present.",
            ID_PARAM
        )));
    }
    Ok(ids)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "status": self.to_string() }))).into_response()
    }
}
