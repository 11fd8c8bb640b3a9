use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use askama::Template;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use super::views::ErrorView;
use crate::error::ODataError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Gateway(#[from] ODataError),

    #[error("Template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Gateway(ODataError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Gateway(ODataError::Validation(_)) => StatusCode::BAD_REQUEST,
            AppError::Gateway(ODataError::Query(_)) => StatusCode::BAD_GATEWAY,
            AppError::Gateway(ODataError::Configuration(_)) | AppError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let request_id = Uuid::new_v4().to_string();
        error!(status = %status, error = %message, request_id = %request_id, "Request failed");

        let view = ErrorView {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error"),
            message: &message,
            request_id: &request_id,
        };
        match view.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, message).into_response(),
        }
    }
}
