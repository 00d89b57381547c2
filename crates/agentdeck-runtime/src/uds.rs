//! Gateway client over a Unix domain socket.
//!
//! The wire is newline-delimited JSON. Requests carry an `id`; the
//! matching response echoes it with `result` or `error`. Frames
//! without an `id` are event pushes and fan out to subscribers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};

use agentdeck_core::frames::EventFrame;
use agentdeck_gateway::client::{EVENT_CHANNEL_CAPACITY, GatewayClient, GatewayError};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, GatewayError>>>>>;

/// What one inbound line means.
#[derive(Debug, PartialEq)]
enum Inbound {
    Reply { id: u64, result: Result<Value, String> },
    Event(EventFrame),
    Ignored,
}

fn classify_line(line: &str) -> Inbound {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return Inbound::Ignored;
    };
    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown gateway error")
                .to_string();
            return Inbound::Reply {
                id,
                result: Err(message),
            };
        }
        return Inbound::Reply {
            id,
            result: Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
    }
    if let Some(event) = value.get("event").and_then(Value::as_str) {
        return Inbound::Event(EventFrame {
            event: event.to_string(),
            payload: value.get("payload").cloned().unwrap_or(Value::Null),
        });
    }
    Inbound::Ignored
}

/// UDS-backed [`GatewayClient`].
pub struct UdsGateway {
    next_id: AtomicU64,
    pending: Pending,
    outbound: mpsc::Sender<String>,
    events: broadcast::Sender<EventFrame>,
}

impl UdsGateway {
    /// Connect and spawn the reader and writer tasks.
    pub async fn connect(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let stream = UnixStream::connect(path).await?;
        let (read_half, mut write_half) = stream.into_split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound, mut outbound_rx) = mpsc::channel::<String>(32);

        tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if write_half.write_all(line.as_bytes()).await.is_err()
                    || write_half.write_all(b"\n").await.is_err()
                {
                    break;
                }
                if write_half.flush().await.is_err() {
                    break;
                }
            }
        });

        let reader_pending = Arc::clone(&pending);
        let reader_events = events.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match classify_line(&line) {
                        Inbound::Reply { id, result } => {
                            let sender = reader_pending.lock().await.remove(&id);
                            if let Some(sender) = sender {
                                let result = result.map_err(|message| GatewayError::Rpc {
                                    method: String::new(),
                                    message,
                                });
                                let _ = sender.send(result);
                            }
                        }
                        Inbound::Event(frame) => {
                            let _ = reader_events.send(frame);
                        }
                        Inbound::Ignored => {
                            tracing::debug!(line, "ignoring unrecognized gateway line");
                        }
                    },
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "gateway read failed");
                        break;
                    }
                }
            }
            // Fail every caller still waiting on a reply.
            for (_, sender) in reader_pending.lock().await.drain() {
                let _ = sender.send(Err(GatewayError::Closed));
            }
        });

        Ok(Self {
            next_id: AtomicU64::new(1),
            pending,
            outbound,
            events,
        })
    }
}

impl GatewayClient for UdsGateway {
    async fn call(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let request = json!({"id": id, "method": method, "params": params});
        let line = serde_json::to_string(&request)
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        if self.outbound.send(line).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(GatewayError::Closed);
        }

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(GatewayError::Rpc { message, .. })) => Err(GatewayError::Rpc {
                method: method.to_string(),
                message,
            }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(GatewayError::Closed),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<EventFrame> {
        self.events.subscribe()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
