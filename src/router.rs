use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::health;
use crate::portfolio;
use crate::state::State;
use crate::ticker_details;

pub fn create_app() -> Router {
    create_app_with_state(State::from_env())
}

pub fn create_app_with_state(state: State) -> Router {
    // Wide open so any frontend origin can call the API; tighten before
    // exposing this outside development.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::check))
        .route("/portfolio", post(portfolio::create))
        .route("/portfolio/example", get(portfolio::example))
        .route("/ticker/:ticker", get(ticker_details::get))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
