use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::FeedError;
use crate::http_server::state::AppState;
use crate::request_parameters::RequestParameters;
use crate::services::{ard, zdf};

const RSS_CONTENT_TYPE: &str = "application/rss+xml";

fn rss_response(feed: String) -> Response {
    ([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], feed).into_response()
}

/// `GET /ard/show/{id}` and the older `GET /show/id/{id}`.
pub async fn get_ard_feed(
    State(app_state): State<Arc<AppState>>,
    Path(show_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, FeedError> {
    if !ard::is_valid_show_id(&show_id) {
        return Err(FeedError::InvalidIdentifier(show_id));
    }
    let parameters = RequestParameters::from_query(&query);
    tracing::info!(show_id, %parameters, "Received a request for an ARD show");

    let feed = app_state.ard.serve(&show_id, &parameters).await?;
    Ok(rss_response(feed))
}

/// `GET /zdf/show/{*path}`, e.g. `/zdf/show/comedy/die-anstalt`.
pub async fn get_zdf_feed(
    State(app_state): State<Arc<AppState>>,
    Path(show_path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, FeedError> {
    if !zdf::is_valid_show_path(&show_path) {
        return Err(FeedError::InvalidIdentifier(show_path));
    }
    let parameters = RequestParameters::from_query(&query);
    tracing::info!(show_path, %parameters, "Received a request for a ZDF show");

    let feed = app_state.zdf.serve(&show_path, &parameters).await?;
    Ok(rss_response(feed))
}
