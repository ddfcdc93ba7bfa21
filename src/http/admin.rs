//! Operational read endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use crate::limit::{LimiterStats, Limiters};

/// Current snapshot of every registered limiter, keyed by name.
pub async fn limits(
    State(limiters): State<Arc<Limiters>>,
) -> Json<BTreeMap<String, LimiterStats>> {
    Json(limiters.stats(Utc::now()))
}

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limit::LimiterPolicy;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_limits_snapshot_as_json() {
        let limiters = Arc::new(Limiters::new([(
            "moderate".to_string(),
            LimiterPolicy::moderate(),
        )]));
        limiters.get("moderate").unwrap().check("203.0.113.5", Utc::now());

        let app = Router::new()
            .route("/admin/limits", get(limits))
            .with_state(limiters);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/limits")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["moderate"]["tracked_keys"], 1);
        assert_eq!(body["moderate"]["blocked_keys"], 0);
        assert_eq!(body["moderate"]["top_requesters"][0]["key"], "203.0.113.5");
    }
}
