//! REST API handlers.
//!
//! Each handler operates on the shared `Sandbox` (and, for the
//! recommendation endpoints, the recommendation engine) and returns
//! JSON responses.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::info;

use gridsim_recommender::{ScaleUpRecommender, scale_down_candidates};
use gridsim_sandbox::PodTemplate;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Sandbox preparation ────────────────────────────────────────

/// DELETE /api/v1/sandbox
pub async fn clear_sandbox(State(state): State<ApiState>) -> impl IntoResponse {
    state.sandbox.clear_all().await;
    info!("sandbox cleared via api");
    ApiResponse::ok("cleared")
}

/// POST /api/v1/sandbox/sync
pub async fn sync_sandbox(State(state): State<ApiState>) -> impl IntoResponse {
    match state.sandbox.seed_from_spec(&state.cluster, &state.catalog).await {
        Ok(added) => {
            info!(nodes_added = added, "sandbox nodes synced from cluster spec");
            ApiResponse::ok(serde_json::json!({ "nodes_added": added })).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Sandbox inspection ─────────────────────────────────────────

/// GET /api/v1/nodes
pub async fn list_nodes(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.sandbox.list_nodes().await)
}

/// GET /api/v1/pods
pub async fn list_pods(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.sandbox.list_pods().await)
}

/// Deploy request body: an inline YAML pod template plus replica count.
#[derive(serde::Deserialize)]
pub struct DeployRequest {
    pub template: String,
    pub count: u32,
}

/// POST /api/v1/pods
pub async fn deploy_pods(
    State(state): State<ApiState>,
    Json(req): Json<DeployRequest>,
) -> impl IntoResponse {
    let template = match PodTemplate::from_yaml(&req.template) {
        Ok(t) => t,
        Err(e) => return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    };
    match state
        .sandbox
        .create_pods_from_template(&template, req.count)
        .await
    {
        Ok(()) => (
            StatusCode::CREATED,
            ApiResponse::ok(serde_json::json!({
                "template": template.name,
                "count": req.count
            })),
        )
            .into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Recommendations ────────────────────────────────────────────

/// POST /api/v1/recommend/scale-up
pub async fn recommend_scale_up(State(state): State<ApiState>) -> impl IntoResponse {
    let recommender = ScaleUpRecommender::new(
        state.sandbox.clone(),
        state.cluster.clone(),
        state.catalog.clone(),
        state.weights,
        state.settings.clone(),
        state.cancel.clone(),
    );
    match recommender.run().await {
        Ok(outcome) => ApiResponse::ok(outcome).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/v1/recommend/scale-down
pub async fn recommend_scale_down(State(state): State<ApiState>) -> impl IntoResponse {
    match scale_down_candidates(&state.sandbox, &state.cluster, &state.catalog).await {
        Ok(candidates) => ApiResponse::ok(candidates).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::sync::watch;
    use tower::ServiceExt;

    use gridsim_core::{
        ClusterSpec, MachineCatalog, MachineType, TrialSettings, WorkerPoolSpec,
    };
    use gridsim_recommender::StrategyWeights;
    use gridsim_sandbox::Sandbox;

    use crate::{ApiState, build_router};

    fn test_state() -> ApiState {
        let (_tx, cancel) = watch::channel(false);
        // The sender is dropped; recommendation runs simply become
        // uncancellable, which is fine for router tests.
        let machine = MachineType {
            name: "m".to_string(),
            cpu_millis: 2000,
            memory_bytes: 8 << 30,
            hourly_cost: 0.1,
        };
        ApiState {
            sandbox: Sandbox::new(),
            cluster: ClusterSpec {
                name: "dev".to_string(),
                worker_pools: vec![WorkerPoolSpec {
                    name: "a".to_string(),
                    zones: Vec::new(),
                    machine_type: "m".to_string(),
                    min: 0,
                    max: 3,
                    current: 2,
                    taints: Vec::new(),
                }],
            },
            catalog: MachineCatalog::from_machines([machine]),
            weights: StrategyWeights::default(),
            settings: TrialSettings::default(),
            cancel,
        }
    }

    #[tokio::test]
    async fn sync_then_list_nodes() {
        let state = test_state();
        let router = build_router(state.clone());

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/sandbox/sync")
            .body(Body::empty())
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(state.sandbox.list_nodes().await.len(), 2);

        let req = Request::builder()
            .uri("/api/v1/nodes")
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn clear_sandbox_empties_store() {
        let state = test_state();
        state.sandbox.seed_from_spec(&state.cluster, &state.catalog).await.unwrap();
        let router = build_router(state.clone());

        let req = Request::builder()
            .method("DELETE")
            .uri("/api/v1/sandbox")
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.sandbox.list_nodes().await.is_empty());
    }

    #[tokio::test]
    async fn deploy_pods_from_template() {
        let state = test_state();
        let router = build_router(state.clone());

        let body = serde_json::json!({
            "template": "name: web\nrequests:\n  cpu_millis: 500\n  memory_bytes: 1024\n",
            "count": 3
        });
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/pods")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(state.sandbox.list_pods().await.len(), 3);
    }

    #[tokio::test]
    async fn deploy_rejects_bad_template() {
        let router = build_router(test_state());

        let body = serde_json::json!({ "template": "requests: [oops", "count": 1 });
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/pods")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn scale_down_endpoint_ranks_candidates() {
        let state = test_state();
        state.sandbox.seed_from_spec(&state.cluster, &state.catalog).await.unwrap();
        let router = build_router(state);

        let req = Request::builder()
            .uri("/api/v1/recommend/scale-down")
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn scale_up_with_empty_pending_is_immediate() {
        let router = build_router(test_state());

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/recommend/scale-up")
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
