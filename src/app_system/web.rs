use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::error::AppError;
use super::views::{EditView, IndexView, PageView};
use crate::clients::ProductClient;
use crate::config::GatewayConfig;
use crate::error::ODataError;

/// Number of products shown on the list page.
pub const LIST_PAGE_SIZE: usize = 10;

/// Shared by all handlers. Holds no per-request state.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<GatewayConfig>,
    http: reqwest::Client,
}

impl AppState {
    /// Checks the base URL and header values up front so a bad setting fails
    /// at startup instead of on every request.
    pub fn new(gateway: GatewayConfig) -> Result<Self, ODataError> {
        let settings = crate::clients::configure(&gateway.base_url, &gateway.credentials())?;
        info!(base_url = %settings.base_url(), "Gateway configured");

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ODataError::Configuration(e.to_string()))?;
        Ok(Self {
            gateway: Arc::new(gateway),
            http,
        })
    }

    fn product_client(&self) -> Result<ProductClient, ODataError> {
        ProductClient::configure(self.http.clone(), &self.gateway)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/products", get(index))
        .route("/edit/:id", get(edit_form))
        .route("/edit", post(edit_submit))
        .route("/about", get(about))
        .route("/contact", get(contact))
        .route("/privacy", get(privacy))
        .with_state(state)
}

#[instrument(skip(state))]
async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let products = state.product_client()?.list_products(LIST_PAGE_SIZE).await?;
    info!(count = products.len(), "Listing products");
    Ok(Html(IndexView { products: &products }.render()?))
}

#[instrument(skip(state))]
async fn edit_form(State(state): State<AppState>, Path(id): Path<String>) -> Result<Html<String>, AppError> {
    let product = state.product_client()?.get_product(&id).await?;
    Ok(Html(EditView::for_product(&product).render()?))
}

/// Raw form fields; checked by [`EditForm::validate`] rather than the extractor
/// so a bad submission re-renders the form.
#[derive(Debug, Deserialize)]
pub struct EditForm {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    price: Option<String>,
}

impl EditForm {
    fn validate(&self) -> Result<(String, f64), &'static str> {
        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or("Product id is required")?;
        let price = self
            .price
            .as_deref()
            .map(str::trim)
            .filter(|price| !price.is_empty())
            .ok_or("Price is required")?;
        let price: f64 = price.parse().map_err(|_| "Price must be a number")?;
        if !price.is_finite() || price < 0.0 {
            return Err("Price must be a non-negative number");
        }
        Ok((id.to_string(), price))
    }
}

#[instrument(skip(state))]
async fn edit_submit(State(state): State<AppState>, Form(form): Form<EditForm>) -> Result<Response, AppError> {
    match form.validate() {
        Ok((id, price)) => {
            // The returned record is not needed; the list page re-reads from the gateway.
            state.product_client()?.update_price(&id, price).await?;
            info!(product_id = %id, price, "Price updated");
            Ok(Redirect::to("/").into_response())
        }
        Err(message) => {
            warn!(error = message, "Rejected edit submission");
            let view = EditView {
                id: form.id.as_deref().unwrap_or_default(),
                name: "",
                price: form.price.clone().unwrap_or_default(),
                fields: Vec::new(),
                error: message,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(view.render()?)).into_response())
        }
    }
}

async fn about() -> Result<Html<String>, AppError> {
    page("About", "Browse and reprice products served by the OData gateway.")
}

async fn contact() -> Result<Html<String>, AppError> {
    page("Contact", "Contact your gateway administrator for access.")
}

async fn privacy() -> Result<Html<String>, AppError> {
    page("Privacy", "No product data is stored by this application.")
}

fn page(title: &str, message: &str) -> Result<Html<String>, AppError> {
    Ok(Html(PageView { title, message }.render()?))
}
