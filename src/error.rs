use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::domain::Ack;

/// why an ingestion request was turned away
///
/// every variant is a 400; the stored facet is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("No message provided")]
    MissingMessage,

    #[error("Invalid coordinates")]
    InvalidCoordinates,

    #[error("Invalid bin fill payload")]
    MalformedBinFill,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(Ack::failed(self.to_string()))).into_response()
    }
}
