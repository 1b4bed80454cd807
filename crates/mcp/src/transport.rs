//! MCP over SSE: a long-lived `GET` stream for server messages and `POST`s
//! to the endpoint the server announces for client messages.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use stepwise_core::error::ToolError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::jsonrpc::{IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::sse::{SseDecoder, SseEvent};

/// Request/notification channel to an MCP server.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for its result.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ToolError>;

    /// Fire-and-forget notification.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ToolError>;

    /// False once the server stream has ended.
    fn is_alive(&self) -> bool;
}

type PendingMap = HashMap<i64, oneshot::Sender<Result<Value, ToolError>>>;

#[derive(Clone, Default)]
struct Pending(Arc<Mutex<PendingMap>>);

impl Pending {
    fn lock(&self) -> MutexGuard<'_, PendingMap> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct SseTransport {
    client: reqwest::Client,
    endpoint: Url,
    pending: Pending,
    next_id: AtomicI64,
    alive: Arc<AtomicBool>,
    timeout: Duration,
    reader: JoinHandle<()>,
}

impl SseTransport {
    /// Open the event stream and wait for the server's `endpoint` event.
    pub async fn connect(url: Url, timeout: Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ToolError::Transport(format!("Failed to create HTTP client: {e}")))?;

        let response = tokio::time::timeout(
            timeout,
            client
                .get(url.clone())
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .send(),
        )
        .await
        .map_err(|_| ToolError::Timeout {
            method: "connect".into(),
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|e| ToolError::Transport(format!("SSE connect failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Transport(format!("SSE connect failed: {status} - {body}")));
        }

        let pending = Pending::default();
        let alive = Arc::new(AtomicBool::new(true));
        let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();

        let reader = tokio::spawn(read_stream(
            response,
            ReaderState {
                client: client.clone(),
                base: url.clone(),
                endpoint: None,
                endpoint_tx: Some(endpoint_tx),
                pending: pending.clone(),
                alive: Arc::clone(&alive),
            },
        ));

        let announced = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(path)) => resolve_endpoint(&url, &path),
            Ok(Err(_)) => Err(ToolError::Transport(
                "SSE stream closed before the endpoint event".into(),
            )),
            Err(_) => Err(ToolError::Timeout {
                method: "endpoint".into(),
                timeout_secs: timeout.as_secs(),
            }),
        };
        let endpoint = match announced {
            Ok(endpoint) => endpoint,
            Err(e) => {
                reader.abort();
                return Err(e);
            }
        };

        debug!(endpoint = %endpoint.path(), "MCP SSE endpoint announced");

        Ok(Self {
            client,
            endpoint,
            pending,
            next_id: AtomicI64::new(1),
            alive,
            timeout,
            reader,
        })
    }

    async fn post(&self, body: &impl serde::Serialize) -> Result<reqwest::Response, ToolError> {
        let response = tokio::time::timeout(self.timeout, self.client.post(self.endpoint.clone()).json(body).send())
            .await
            .map_err(|_| ToolError::Timeout {
                method: "post".into(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ToolError::Transport(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Transport(format!("HTTP error: {status} - {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl McpTransport for SseTransport {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ToolError> {
        if !self.is_alive() {
            return Err(ToolError::SessionNotReady);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        debug!(id, method, "MCP request");
        let response = match self.post(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.pending.lock().remove(&id);
                return Err(e);
            }
        };

        // Some servers answer inline instead of on the stream.
        if let Ok(body) = response.text().await
            && let Ok(IncomingMessage::Response(inline)) = IncomingMessage::parse(&body)
            && inline.numeric_id() == Some(id)
        {
            self.pending.lock().remove(&id);
            return inline.into_result();
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.pending.lock().remove(&id);
                Err(ToolError::Transport("MCP connection closed".into()))
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(ToolError::Timeout {
                    method: method.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ToolError> {
        if !self.is_alive() {
            return Err(ToolError::SessionNotReady);
        }
        self.post(&JsonRpcNotification::new(method, params)).await?;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.reader.abort();
        self.pending.lock().clear();
        debug!("MCP SSE transport closed");
    }
}

fn resolve_endpoint(base: &Url, path: &str) -> Result<Url, ToolError> {
    base.join(path.trim())
        .map_err(|e| ToolError::Protocol(format!("invalid endpoint '{path}': {e}")))
}

struct ReaderState {
    client: reqwest::Client,
    base: Url,
    endpoint: Option<Url>,
    endpoint_tx: Option<oneshot::Sender<String>>,
    pending: Pending,
    alive: Arc<AtomicBool>,
}

impl ReaderState {
    fn handle(&mut self, event: SseEvent) {
        match event.event.as_str() {
            "endpoint" => {
                self.endpoint = resolve_endpoint(&self.base, &event.data).ok();
                if let Some(tx) = self.endpoint_tx.take() {
                    let _ = tx.send(event.data);
                }
            }
            "message" => match IncomingMessage::parse(&event.data) {
                Ok(IncomingMessage::Response(response)) => {
                    let Some(id) = response.numeric_id() else {
                        warn!(id = %response.id, "MCP response with non-numeric id");
                        return;
                    };
                    if let Some(tx) = self.pending.lock().remove(&id) {
                        let _ = tx.send(response.into_result());
                    }
                }
                Ok(IncomingMessage::Request { id, method }) => self.answer_server_request(id, &method),
                Ok(IncomingMessage::Notification(note)) => {
                    debug!(method = %note.method, "MCP notification");
                }
                Err(e) => warn!(error = %e, "Failed to parse MCP message"),
            },
            other => debug!(event = other, "Ignoring SSE event"),
        }
    }

    /// Only `ping` is answered; MCP clients that advertise no capabilities
    /// receive nothing else.
    fn answer_server_request(&self, id: Value, method: &str) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        let body = if method == "ping" {
            serde_json::json!({"jsonrpc": "2.0", "id": id, "result": {}})
        } else {
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("Method not found: {method}")}
            })
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.post(endpoint).json(&body).send().await {
                warn!(error = %e, "Failed to answer MCP server request");
            }
        });
    }
}

async fn read_stream(response: reqwest::Response, mut state: ReaderState) {
    let mut bytes = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = bytes.next().await {
        match chunk {
            Ok(chunk) => {
                for event in decoder.push(&chunk) {
                    state.handle(event);
                }
            }
            Err(e) => {
                warn!(error = %e, "MCP SSE stream error");
                break;
            }
        }
    }
    if let Some(event) = decoder.finish() {
        state.handle(event);
    }

    state.alive.store(false, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with a closed-connection error.
    state.pending.lock().clear();
    debug!("MCP SSE stream ended");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::sse::{Event, Sse};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use futures::Stream;
    use serde_json::json;
    use std::convert::Infallible;
    use tokio::sync::mpsc;

    /// In-process MCP server speaking the SSE transport.
    #[derive(Clone, Default)]
    pub(crate) struct MockMcpServer {
        pub(crate) outbox: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
        pub(crate) received: Arc<Mutex<Vec<String>>>,
        pub(crate) required_key: Option<String>,
    }

    async fn sse_handler(
        State(server): State<MockMcpServer>,
        axum::extract::Query(query): axum::extract::Query<HashMap<String, String>>,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
        if let Some(key) = &server.required_key
            && query.get("key") != Some(key)
        {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        *server.outbox.lock().unwrap() = Some(tx);

        let endpoint = futures::stream::once(async {
            Ok(Event::default().event("endpoint").data("/messages?sessionId=test"))
        });
        let messages = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|m| (Ok(Event::default().event("message").data(m)), rx))
        });
        Ok(Sse::new(endpoint.chain(messages)))
    }

    async fn message_handler(
        State(server): State<MockMcpServer>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        let method = body["method"].as_str().unwrap_or_default().to_string();
        server.received.lock().unwrap().push(method.clone());

        let Some(id) = body.get("id").and_then(Value::as_i64) else {
            return StatusCode::ACCEPTED;
        };
        let result = match method.as_str() {
            "initialize" => json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "mock-amap", "version": "0.0.1"}
            }),
            "tools/list" => json!({
                "tools": [{
                    "name": "maps_weather",
                    "description": "根据城市名称或者标准adcode查询指定城市的天气",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                        "required": ["city"]
                    }
                }]
            }),
            "tools/call" => {
                let city = body["params"]["arguments"]["city"].as_str().unwrap_or("?");
                json!({"content": [{"type": "text", "text": format!("{city}：晴，25℃")}]})
            }
            _ => {
                let error = json!({
                    "jsonrpc": "2.0", "id": id,
                    "error": {"code": -32601, "message": "Method not found"}
                });
                server.send(error.to_string());
                return StatusCode::ACCEPTED;
            }
        };
        server.send(serde_json::to_string(&JsonRpcResponse::success(id, result)).unwrap());
        StatusCode::ACCEPTED
    }

    impl MockMcpServer {
        fn send(&self, message: String) {
            if let Some(tx) = self.outbox.lock().unwrap().as_ref() {
                let _ = tx.send(message);
            }
        }

        /// Close the event stream from the server side.
        pub(crate) fn hang_up(&self) {
            self.outbox.lock().unwrap().take();
        }

        /// Serve on an ephemeral port; returns the SSE URL.
        pub(crate) async fn spawn(self) -> Url {
            let router = Router::new()
                .route("/sse", get(sse_handler))
                .route("/messages", post(message_handler))
                .with_state(self);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            Url::parse(&format!("http://{addr}/sse")).unwrap()
        }
    }

    #[test]
    fn endpoint_resolves_against_base() {
        let base = Url::parse("https://mcp.amap.com/sse?key=abc").unwrap();
        let endpoint = resolve_endpoint(&base, "/messages?sessionId=1").unwrap();
        assert_eq!(endpoint.as_str(), "https://mcp.amap.com/messages?sessionId=1");
    }

    #[tokio::test]
    async fn request_round_trip_over_sse() {
        let server = MockMcpServer::default();
        let url = server.clone().spawn().await;
        let transport = SseTransport::connect(url, Duration::from_secs(5)).await.unwrap();

        let result = transport.request("tools/list", None).await.unwrap();
        assert_eq!(result["tools"][0]["name"], "maps_weather");
        assert!(transport.is_alive());
        assert_eq!(server.received.lock().unwrap().as_slice(), ["tools/list"]);
    }

    #[tokio::test]
    async fn server_error_is_protocol_error() {
        let server = MockMcpServer::default();
        let url = server.clone().spawn().await;
        let transport = SseTransport::connect(url, Duration::from_secs(5)).await.unwrap();

        let err = transport.request("resources/list", None).await.unwrap_err();
        assert!(matches!(err, ToolError::Protocol(_)));
    }

    #[tokio::test]
    async fn rejected_connect_is_transport_error() {
        let server = MockMcpServer {
            required_key: Some("secret".into()),
            ..Default::default()
        };
        let url = server.spawn().await;
        let err = SseTransport::connect(url, Duration::from_secs(5)).await.err().unwrap();
        assert!(matches!(err, ToolError::Transport(msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn hang_up_marks_transport_dead() {
        let server = MockMcpServer::default();
        let url = server.clone().spawn().await;
        let transport = SseTransport::connect(url, Duration::from_secs(5)).await.unwrap();

        server.hang_up();
        for _ in 0..50 {
            if !transport.is_alive() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!transport.is_alive());
        let err = transport.request("tools/list", None).await.unwrap_err();
        assert!(matches!(err, ToolError::SessionNotReady));
    }
}
