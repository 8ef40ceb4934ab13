//! `POST /interactions`: the HTTP entry point Discord delivers interactions
//! to. Request signatures are checked by the fronting proxy; this handler
//! only decodes the payload and queues it for the interaction runner, which
//! answers through the REST callback.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use guildhall_discord::events::InteractionEnvelope;
use guildhall_discord::wire::{self, Inbound};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct InteractionsState {
    sender: mpsc::Sender<InteractionEnvelope>,
}

pub fn router(sender: mpsc::Sender<InteractionEnvelope>) -> Router {
    Router::new().route("/interactions", post(receive)).with_state(InteractionsState { sender })
}

pub async fn receive(
    State(state): State<InteractionsState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let envelope = match wire::decode_interaction(&payload) {
        Ok(Inbound::Ping) => return (StatusCode::OK, Json(wire::pong())),
        Ok(Inbound::Interaction(envelope)) => envelope,
        Err(error) => {
            warn!(
                event_name = "ingress.discord.decode_failed",
                error = %error,
                "rejected interaction payload"
            );
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": error.to_string() })));
        }
    };

    let correlation_id = envelope.interaction.id.clone();
    match state.sender.try_send(envelope) {
        Ok(()) => {
            debug!(
                event_name = "ingress.discord.interaction_queued",
                correlation_id = %correlation_id,
                "interaction queued"
            );
            (StatusCode::ACCEPTED, Json(json!({ "status": "queued" })))
        }
        Err(TrySendError::Full(_)) => {
            warn!(
                event_name = "ingress.discord.queue_full",
                correlation_id = %correlation_id,
                "interaction queue is full"
            );
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "interaction queue is full" })))
        }
        Err(TrySendError::Closed(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "interaction runner stopped" })))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::interactions::router;

    async fn post(app: Router, payload: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/interactions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn slash_command(id: &str) -> Value {
        json!({
            "id": id, "token": "tok", "type": 2,
            "guild_id": "100", "channel_id": "200",
            "member": {
                "user": { "id": "42", "username": "noctiis", "global_name": "Noctiis" },
                "nick": null,
                "roles": [],
                "permissions": "0"
            },
            "data": { "name": "resultado_evento" }
        })
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let (sender, _receiver) = mpsc::channel(1);
        let (status, body) = post(router(sender), json!({ "id": "1", "token": "t", "type": 1 })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn interactions_are_queued_for_the_runner() {
        let (sender, mut receiver) = mpsc::channel(1);
        let (status, _) = post(router(sender), slash_command("10")).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        let envelope = receiver.recv().await.expect("queued envelope");
        assert_eq!(envelope.interaction.id, "10");
    }

    #[tokio::test]
    async fn full_queue_is_reported_as_unavailable() {
        let (sender, _receiver) = mpsc::channel(1);
        let app = router(sender);

        let (first, _) = post(app.clone(), slash_command("10")).await;
        let (second, body) = post(app, slash_command("11")).await;

        assert_eq!(first, StatusCode::ACCEPTED);
        assert_eq!(second, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "interaction queue is full");
    }

    #[tokio::test]
    async fn undecodable_payload_is_rejected() {
        let (sender, _receiver) = mpsc::channel(1);
        let payload = json!({ "id": "1", "token": "t", "type": 2, "channel_id": "3", "data": { "name": "x" } });
        let (status, body) = post(router(sender), payload).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|message| !message.is_empty()));
    }
}
