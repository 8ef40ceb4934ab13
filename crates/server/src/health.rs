use std::future::Future;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use guildhall_store::{EventRepository, VerificationRepository};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    pub events: EventRepository,
    pub verifications: VerificationRepository,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub events: HealthCheck,
    pub verifications: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Serves `app` in the background until `shutdown` resolves. Bind failures
/// surface to the caller.
pub async fn spawn(
    bind_address: &str,
    port: u16,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<JoinHandle<()>> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "http endpoint started"
    );

    Ok(tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "http endpoint terminated unexpectedly"
            );
        }
    }))
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let events = match state.events.all().await {
        Ok(records) => ready(format!("{} event(s) readable", records.len())),
        Err(error) => degraded(format!("events document unreadable: {error}")),
    };
    let verifications = match state.verifications.count().await {
        Ok(count) => ready(format!("{count} verification(s) readable")),
        Err(error) => degraded(format!("verifications document unreadable: {error}")),
    };
    let healthy = events.status == "ready" && verifications.status == "ready";

    let payload = HealthResponse {
        status: if healthy { "ready" } else { "degraded" },
        service: ready("guildhall-server runtime initialized".to_string()),
        events,
        verifications,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn ready(detail: String) -> HealthCheck {
    HealthCheck { status: "ready", detail }
}

fn degraded(detail: String) -> HealthCheck {
    HealthCheck { status: "degraded", detail }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, extract::State, http::Request, http::StatusCode, Json};
    use guildhall_store::document::{CollectionSpec, Retention};
    use guildhall_store::{
        EventRepository, InMemoryRecordStore, JsonFileStore, VerificationRepository,
    };
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    fn in_memory_state() -> HealthState {
        let events = InMemoryRecordStore::new(CollectionSpec::events(Retention { ceiling: 50, keep: 25 }));
        let verifications = InMemoryRecordStore::new(CollectionSpec::verifications());
        HealthState {
            events: EventRepository::new(Arc::new(events)),
            verifications: VerificationRepository::new(Arc::new(verifications)),
        }
    }

    #[tokio::test]
    async fn health_returns_ready_when_documents_are_readable() {
        let (status, Json(payload)) = health(State(in_memory_state())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.events.status, "ready");
        assert_eq!(payload.verifications.status, "ready");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_a_document_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("eventos.json");
        let store = JsonFileStore::open(&path, CollectionSpec::events(Retention { ceiling: 50, keep: 25 }))
            .await
            .expect("open");
        tokio::fs::write(&path, "{ not json").await.expect("corrupt document");

        let state = HealthState { events: EventRepository::new(Arc::new(store)), ..in_memory_state() };
        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.events.status, "degraded");
        assert_eq!(payload.verifications.status, "ready");
    }

    #[tokio::test]
    async fn router_serves_health_route() {
        let response = router(in_memory_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
