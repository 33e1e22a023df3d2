// handlers.rs
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::db::Warehouse;
use crate::models::ApiResponse;
use crate::pages::Page;
use crate::poll::PollService;

/// Poll results as JSON
pub async fn poll_data<W: Warehouse>(
    State(service): State<Arc<PollService<W>>>,
    Path(code): Path<String>,
) -> Json<ApiResponse> {
    Json(service.poll_data(&code).await)
}

/// Poll results page
pub async fn poll_page<W: Warehouse>(
    State(service): State<Arc<PollService<W>>>,
    Path(code): Path<String>,
) -> Page {
    service.poll_page(&code).await
}
