//! Errors surfaced by a conversion request.
//!
//! Every kind is terminal for its request. The HTTP layer renders each one
//! as a small HTML page with a distinct status and message.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::app::cache_store::StoreError;
use crate::app::fetch::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no markdown url was provided")]
    MissingInput,

    #[error("url must start with {required_prefix}")]
    Forbidden { required_prefix: String },

    #[error("source is unreachable: {0}")]
    Unreachable(String),

    #[error("markdown file not found: {0}")]
    NotFound(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("no steps found (the document needs `## ` headings)")]
    NoContent,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<FetchError> for ConvertError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unreachable(msg) => Self::Unreachable(msg),
            FetchError::NotFound(msg) => Self::NotFound(msg),
            FetchError::Failed(msg) => Self::FetchFailed(msg),
        }
    }
}

impl ConvertError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingInput | Self::Forbidden { .. } | Self::Unreachable(_) | Self::NoContent => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::FetchFailed(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            Self::MissingInput => "Missing URL",
            Self::Forbidden { .. } => "URL not allowed",
            Self::Unreachable(_) => "Source unreachable",
            Self::NotFound(_) => "Markdown file not found",
            Self::FetchFailed(_) => "Conversion failed",
            Self::NoContent => "No steps found",
            Self::Store(_) => "Storage error",
        }
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "conversion failed");
        } else {
            tracing::info!(error = %self, "conversion rejected");
        }

        let page = crate::render::render_message_page(self.heading(), &self.to_string());
        (status, Html(page)).into_response()
    }
}
