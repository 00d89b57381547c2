//! In-process gateway over tokio channels.
//!
//! Used by tests and local wiring: requests flow out on an mpsc
//! channel with a oneshot reply slot, events flow in on the shared
//! broadcast stream. The handler side decides the semantics.

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use agentdeck_core::frames::EventFrame;

use crate::client::{EVENT_CHANNEL_CAPACITY, GatewayClient, GatewayError};

/// One in-flight RPC awaiting a reply.
pub struct GatewayRequest {
    pub method: String,
    pub params: Value,
    pub reply: oneshot::Sender<Result<Value, GatewayError>>,
}

/// Channel-backed [`GatewayClient`].
pub struct ChannelGateway {
    requests: mpsc::Sender<GatewayRequest>,
    events: broadcast::Sender<EventFrame>,
}

impl ChannelGateway {
    /// Build a gateway plus the request receiver the handler drains.
    pub fn new() -> (Self, mpsc::Receiver<GatewayRequest>) {
        let (requests, rx) = mpsc::channel(32);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        (Self { requests, events }, rx)
    }

    /// Publish a frame to all subscribers.
    pub fn publish(&self, frame: EventFrame) {
        // No subscribers is fine; frames are fire-and-forget.
        let _ = self.events.send(frame);
    }
}

impl GatewayClient for ChannelGateway {
    async fn call(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(GatewayRequest {
                method: method.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|_| GatewayError::Closed)?;
        rx.await.map_err(|_| GatewayError::Closed)?
    }

    fn subscribe(&self) -> broadcast::Receiver<EventFrame> {
        self.events.subscribe()
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn call_round_trips_through_handler() {
        let (gateway, mut rx) = ChannelGateway::new();
        let handler = tokio::spawn(async move {
            let request = rx.recv().await.expect("request");
            assert_eq!(request.method, "chat.send");
            assert_eq!(request.params["message"], "hi");
            let _ = request.reply.send(Ok(json!({"ok": true})));
        });

        let result = gateway.call("chat.send", json!({"message": "hi"})).await;
        assert_eq!(result.expect("reply"), json!({"ok": true}));
        handler.await.expect("handler");
    }

    #[tokio::test]
    async fn call_surfaces_handler_error() {
        let (gateway, mut rx) = ChannelGateway::new();
        tokio::spawn(async move {
            let request = rx.recv().await.expect("request");
            let _ = request.reply.send(Err(GatewayError::Rpc {
                method: request.method,
                message: "no such session".into(),
            }));
        });

        let err = gateway
            .call("chat.send", json!({}))
            .await
            .expect_err("error");
        assert!(err.to_string().contains("no such session"));
    }

    #[tokio::test]
    async fn dropped_handler_reports_closed() {
        let (gateway, rx) = ChannelGateway::new();
        drop(rx);
        let err = gateway.call("models.list", Value::Null).await.expect_err("closed");
        assert!(matches!(err, GatewayError::Closed));
    }

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let (gateway, _rx) = ChannelGateway::new();
        let mut events = gateway.subscribe();
        gateway.publish(EventFrame {
            event: "chat".into(),
            payload: json!({"sessionKey": "s", "state": "delta", "message": "x"}),
        });
        let frame = events.recv().await.expect("frame");
        assert_eq!(frame.event, "chat");
    }
}
