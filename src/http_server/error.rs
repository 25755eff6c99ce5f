use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};

use crate::error::FeedError;

// Invalid identifiers are the client's fault, everything else is ours.
// The body is the plain error text in both cases.
impl IntoResponse for FeedError {
    fn into_response(self) -> Response<Body> {
        let status = match &self {
            FeedError::InvalidIdentifier(identifier) => {
                tracing::warn!(identifier, "Received a request for an invalid show ID");
                StatusCode::BAD_REQUEST
            }
            error => {
                tracing::error!(%error, "Failed to produce feed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
