// routes.rs
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::db::Warehouse;
use crate::handlers;
use crate::poll::PollService;

pub fn create_routes<W: Warehouse + 'static>(service: Arc<PollService<W>>) -> Router {
    Router::new()
        .route("/poll/{code}", get(handlers::poll_page::<W>))
        .route("/data/poll/{code}", get(handlers::poll_data::<W>))
        .layer(CorsLayer::permissive())
        .with_state(service)
}
