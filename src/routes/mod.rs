use axum::Router;

use crate::AppState;

mod fertilizers;
mod health;
mod recommendations;
mod soil_health;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(soil_health::router())
        .merge(fertilizers::router())
        .merge(recommendations::router())
        .merge(health::router())
        .with_state(state)
}
