use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

async fn version_handler() -> Json<Value> {
    Json(json!({"version": env!("CARGO_PKG_VERSION")}))
}

pub fn routes() -> Router {
    Router::new().route("/version", get(version_handler))
}
