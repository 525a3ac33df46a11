use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{ApiError, AppState, HealthCheck, HealthChecks, HealthResponse, ResyncResponse};
use crate::models::now_timestamp;

pub const SERVICE_NAME: &str = "agrigrant-search";

async fn probe<F, E>(name: &'static str, deadline: Duration, check: F) -> HealthCheck
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let error = match tokio::time::timeout(deadline, check).await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("no answer within {}ms", deadline.as_millis())),
    };

    if let Some(error) = &error {
        warn!(event = "health_check_failed", dependency = name, error = %error);
    }

    HealthCheck {
        status: if error.is_none() { "healthy" } else { "unhealthy" }.to_string(),
        error,
    }
}

fn not_configured() -> HealthCheck {
    HealthCheck {
        status: "disabled".to_string(),
        error: None,
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let deadline = Duration::from_millis(state.shared.config.server.health_timeout_ms);
    let shared = &state.shared;

    let (database, cache, search_index) = futures::join!(
        probe("database", deadline, shared.store.ping()),
        probe("cache", deadline, shared.cache.ping()),
        async {
            match &shared.index {
                Some(index) => probe("search_index", deadline, index.ping()).await,
                None => not_configured(),
            }
        }
    );

    let healthy = [&database, &cache, &search_index]
        .iter()
        .all(|check| check.status != "unhealthy");

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: now_timestamp(),
        service: SERVICE_NAME.to_string(),
        checks: HealthChecks {
            database,
            cache,
            search_index,
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

pub async fn resync(State(state): State<Arc<AppState>>) -> Result<Json<ResyncResponse>, ApiError> {
    let Some(synchronizer) = state.shared.synchronizer.clone() else {
        return Err(ApiError::ServiceUnavailable(
            "Search index is disabled".to_string(),
        ));
    };

    info!(event = "resync_requested", source = "api", "Manual resync requested");
    let report = synchronizer.resync().await?;

    Ok(Json(ResyncResponse {
        success: true,
        report,
    }))
}
