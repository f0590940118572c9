// Export route modules
pub mod execute;
pub mod version;

use axum::Router;

use crate::state::AppState;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(execute::routes(state))
        .merge(version::routes())
}
