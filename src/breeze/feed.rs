//! Breeze live feed: socket.io (Engine.IO v4) over a WebSocket.
//!
//! Only the packet types the feed actually uses are handled: open, ping/pong,
//! namespace connect/disconnect and events. Ticks arrive as `stock` events
//! and are handed to the registered [`TickHandler`]; a feed the server ends
//! fires the [`CloseHandler`].

use super::{BrokerError, CloseHandler, TickHandler};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Event carrying market ticks.
const TICK_EVENT: &str = "stock";

/// A decoded Engine.IO / socket.io text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake (`0{...}`).
    Open(Value),
    /// Engine.IO ping (`2`); must be answered with a pong.
    Ping,
    Pong,
    /// socket.io namespace connect ack (`40...`).
    Connect,
    /// socket.io connect refused (`44{...}`).
    ConnectError(String),
    /// socket.io event (`42["name", args...]`).
    Event { name: String, args: Vec<Value> },
    /// socket.io namespace disconnect (`41`) or Engine.IO close (`1`).
    Disconnect,
    Other(String),
}

/// Decode one text frame.
pub fn decode_packet(text: &str) -> Packet {
    if let Some(rest) = text.strip_prefix("42") {
        return match serde_json::from_str::<Vec<Value>>(rest) {
            Ok(mut items) if !items.is_empty() => match items.remove(0) {
                Value::String(name) => Packet::Event { name, args: items },
                _ => Packet::Other(text.to_string()),
            },
            _ => Packet::Other(text.to_string()),
        };
    }
    if text.starts_with("40") {
        return Packet::Connect;
    }
    if text.starts_with("41") || text == "1" {
        return Packet::Disconnect;
    }
    if let Some(rest) = text.strip_prefix("44") {
        let message = serde_json::from_str::<Value>(rest)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| rest.to_string());
        return Packet::ConnectError(message);
    }
    if let Some(rest) = text.strip_prefix('0') {
        return Packet::Open(serde_json::from_str(rest).unwrap_or(Value::Null));
    }
    match text {
        "2" => Packet::Ping,
        "3" => Packet::Pong,
        _ => Packet::Other(text.to_string()),
    }
}

/// Encode a socket.io event frame.
pub fn encode_event(name: &str, args: &[Value]) -> String {
    let mut frame = Vec::with_capacity(args.len() + 1);
    frame.push(Value::String(name.to_string()));
    frame.extend(args.iter().cloned());
    format!("42{}", Value::Array(frame))
}

/// Arguments for a `join`/`leave` event.
pub fn subscription_args(stock_token: &str, interval: Option<&str>) -> Vec<Value> {
    let mut args = vec![json!([stock_token])];
    if let Some(interval) = interval {
        args.push(Value::String(interval.to_string()));
    }
    args
}

/// Normalize the arguments of a `stock` event into tick records.
///
/// Object payloads pass through untouched. Array payloads carry the stock
/// token first; the remaining fields are kept under `data`.
pub fn ticks_from_event(args: Vec<Value>) -> Vec<Value> {
    args.into_iter()
        .flat_map(|arg| match arg {
            Value::Array(items) if items.iter().all(Value::is_array) => items,
            other => vec![other],
        })
        .filter_map(|tick| match tick {
            Value::Object(_) => Some(tick),
            Value::Array(mut fields) if !fields.is_empty() => {
                let token = fields.remove(0);
                Some(json!({ "stock_token": token, "data": fields }))
            }
            _ => None,
        })
        .collect()
}

type FeedSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Callbacks the reader task drives.
#[derive(Clone, Default)]
pub struct FeedHandlers {
    pub on_ticks: Option<TickHandler>,
    pub on_close: Option<CloseHandler>,
}

/// A live feed session. Dropping it closes the command channel, which stops
/// the reader task.
pub struct FeedConnection {
    outgoing: mpsc::UnboundedSender<String>,
    closing: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Connect and run the socket.io handshake until the namespace ack.
async fn handshake(url: &str, auth: &Value) -> Result<FeedSocket, BrokerError> {
    let (mut socket, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| BrokerError::Feed(format!("WebSocket connect failed: {}", e)))?;

    while let Some(frame) = socket.next().await {
        let frame = frame.map_err(|e| BrokerError::Feed(e.to_string()))?;
        let Message::Text(text) = frame else { continue };

        match decode_packet(&text) {
            Packet::Open(info) => {
                debug!("Feed handshake: {}", info);
                socket
                    .send(Message::Text(format!("40{}", auth)))
                    .await
                    .map_err(|e| BrokerError::Feed(e.to_string()))?;
            }
            Packet::Ping => {
                socket
                    .send(Message::Text("3".into()))
                    .await
                    .map_err(|e| BrokerError::Feed(e.to_string()))?;
            }
            Packet::Connect => return Ok(socket),
            Packet::ConnectError(message) => {
                return Err(BrokerError::Feed(format!(
                    "feed refused connection: {}",
                    message
                )));
            }
            Packet::Disconnect => break,
            other => debug!("Ignoring pre-connect frame: {:?}", other),
        }
    }

    Err(BrokerError::Feed("feed closed during handshake".into()))
}

impl FeedConnection {
    /// Connect, authenticate the namespace and start the reader task.
    ///
    /// The connect and handshake together must finish within `timeout`.
    pub async fn open(
        url: &str,
        user_id: &str,
        session_key: &str,
        timeout: Duration,
        handlers: FeedHandlers,
    ) -> Result<Self, BrokerError> {
        let auth = json!({ "user": user_id, "token": session_key });
        let mut socket = tokio::time::timeout(timeout, handshake(url, &auth))
            .await
            .map_err(|_| BrokerError::Feed("handshake timed out".into()))??;

        info!("Live feed connected");

        let closing = Arc::new(AtomicBool::new(false));
        let closing_flag = Arc::clone(&closing);
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outgoing_rx.recv() => {
                        let Some(text) = outbound else { break };
                        if let Err(e) = socket.send(Message::Text(text)).await {
                            warn!("Feed send failed: {}", e);
                            break;
                        }
                    }
                    inbound = socket.next() => {
                        let text = match inbound {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                warn!("Feed read failed: {}", e);
                                break;
                            }
                        };
                        match decode_packet(&text) {
                            Packet::Ping => {
                                if socket.send(Message::Text("3".into())).await.is_err() {
                                    break;
                                }
                            }
                            Packet::Event { name, args } if name == TICK_EVENT => {
                                let ticks = ticks_from_event(args);
                                debug!("Received ticks: {} items", ticks.len());
                                if let Some(on_ticks) = &handlers.on_ticks {
                                    on_ticks(ticks);
                                }
                            }
                            Packet::Disconnect => break,
                            other => debug!("Ignoring feed frame: {:?}", other),
                        }
                    }
                }
            }
            let _ = socket.close(None).await;

            if closing_flag.load(Ordering::Acquire) {
                info!("Live feed reader stopped");
            } else {
                warn!("Live feed dropped by server");
                if let Some(on_close) = &handlers.on_close {
                    on_close();
                }
            }
        });

        Ok(Self {
            outgoing,
            closing,
            task,
        })
    }

    /// Emit an event on the feed namespace.
    pub fn emit(&self, name: &str, args: &[Value]) -> Result<(), BrokerError> {
        self.outgoing
            .send(encode_event(name, args))
            .map_err(|_| BrokerError::FeedClosed)
    }

    /// Leave the namespace and stop the reader.
    pub async fn close(self) {
        self.closing.store(true, Ordering::Release);
        let _ = self.outgoing.send("41".into());
        drop(self.outgoing);
        if tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .is_err()
        {
            warn!("Feed reader did not stop in time");
        }
    }
}
