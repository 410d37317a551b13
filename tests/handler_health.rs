mod common;

use axum::{Router, routing::get};
use axum_test::TestServer;
use serde_json::Value;

use common::create_test_context;
use linkforge::api::handlers::health_handler;

#[tokio::test]
async fn test_health_reports_ok() {
    let ctx = create_test_context();
    let app: Router = Router::new()
        .route("/health", get(health_handler))
        .with_state(ctx.state.clone());

    let server = TestServer::new(app).unwrap();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cache"], true);
}
