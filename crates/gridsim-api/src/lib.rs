//! gridsim-api — REST API for the scaling recommender.
//!
//! Thin front door for preparing sandbox state and invoking the
//! recommendation engine. Handlers carry no scheduling logic.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | DELETE | `/api/v1/sandbox` | Clear all sandbox objects |
//! | POST | `/api/v1/sandbox/sync` | Sync sandbox nodes from the cluster spec |
//! | GET | `/api/v1/nodes` | List sandbox nodes |
//! | GET | `/api/v1/pods` | List sandbox pods |
//! | POST | `/api/v1/pods` | Deploy pods from a YAML template |
//! | POST | `/api/v1/recommend/scale-up` | Run the scale-up loop |
//! | GET | `/api/v1/recommend/scale-down` | Rank scale-down candidates |

pub mod handlers;

use axum::Router;
use axum::routing::{delete, get, post};
use tokio::sync::watch;

use gridsim_core::{ClusterSpec, MachineCatalog, TrialSettings};
use gridsim_recommender::StrategyWeights;
use gridsim_sandbox::Sandbox;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub sandbox: Sandbox,
    pub cluster: ClusterSpec,
    pub catalog: MachineCatalog,
    pub weights: StrategyWeights,
    pub settings: TrialSettings,
    /// Cancellation signal propagated into recommendation runs.
    pub cancel: watch::Receiver<bool>,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/sandbox", delete(handlers::clear_sandbox))
        .route("/sandbox/sync", post(handlers::sync_sandbox))
        .route("/nodes", get(handlers::list_nodes))
        .route("/pods", get(handlers::list_pods).post(handlers::deploy_pods))
        .route("/recommend/scale-up", post(handlers::recommend_scale_up))
        .route("/recommend/scale-down", get(handlers::recommend_scale_down))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
