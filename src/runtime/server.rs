//! Invocation shim HTTP server.

use crate::action::{Action, ActionError};
use crate::error::{ShimError, ShimResult};
use crate::http::{InvocationRequest, MeteredBody, ShimResponse};
use crate::runtime::ShimConfig;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Readiness check path.
pub const INIT_PATH: &str = "/init";
/// Invocation path.
pub const RUN_PATH: &str = "/run";

/// Read-only state shared by every connection task.
pub(crate) struct ShimState {
    action: Option<Arc<dyn Action>>,
}

/// Invocation shim server.
///
/// Holds the configuration and the single registered action. The action
/// must be registered before [`ActionServer::bind`] or [`ActionServer::run`];
/// both consume the server, so nothing can be registered once traffic is
/// being accepted.
pub struct ActionServer {
    config: ShimConfig,
    action: Option<Arc<dyn Action>>,
}

impl ActionServer {
    /// Create a server with no action registered yet.
    pub fn new(config: ShimConfig) -> Self {
        Self {
            config,
            action: None,
        }
    }

    /// Create a server with its action already registered.
    pub fn with_action(config: ShimConfig, action: impl Action) -> Self {
        let mut server = Self::new(config);
        server.register_action(action);
        server
    }

    /// Register the action served on `/run`.
    ///
    /// Registering again replaces the previous action.
    pub fn register_action(&mut self, action: impl Action) {
        if self.action.is_some() {
            warn!("Replacing previously registered action");
        }
        self.action = Some(Arc::new(action));
        info!("Registered action");
    }

    /// Whether an action has been registered.
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Bind the listening socket without accepting connections yet.
    pub async fn bind(self) -> ShimResult<BoundServer> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ShimError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ShimError::Bind { addr, source })?;

        if self.action.is_none() {
            warn!("No action registered; /run will answer 500");
        }

        Ok(BoundServer {
            listener,
            local_addr,
            state: Arc::new(ShimState {
                action: self.action,
            }),
        })
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> ShimResult<()> {
        let bound = self.bind().await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let result = bound.serve(shutdown_rx).await;
        drop(shutdown_tx);
        result
    }
}

/// A server whose listener is bound and ready to serve.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<ShimState>,
}

impl BoundServer {
    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` flips to `true` or its sender
    /// is dropped. Spawns a tokio task per connection using HTTP/1.1.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> ShimResult<()> {
        info!("Action shim listening on {}", self.local_addr);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let state = self.state.clone();

                    tokio::task::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = state.clone();
                            async move { handle_request(req, state).await }
                        });

                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection from {}: {:?}", remote_addr, err);
                        }
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Action shim shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Route one request to `/init` or `/run`.
pub(crate) async fn handle_request<B>(
    req: Request<B>,
    state: Arc<ShimState>,
) -> Result<Response<MeteredBody>, Infallible>
where
    B: Body,
    B::Error: Display,
{
    let request_id = generate_request_id();
    let path = req.uri().path().to_string();
    let headers_only = req.method() == Method::HEAD;

    debug!("Handling request: {} {} [{}]", req.method(), path, request_id);

    let response = match path.as_str() {
        INIT_PATH => init_response(),
        RUN_PATH => match run(req.into_body(), &state).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Invocation failed: {} [{}]", e, request_id);
                ShimResponse::error(e.status(), e.to_string())
            }
        },
        _ => ShimResponse::error(StatusCode::NOT_FOUND, format!("no route for {}", path)),
    };

    debug!(
        "Responding {} with {} bytes [{}]",
        response.status,
        response.content_length(),
        request_id
    );

    let mut response = response.into_hyper();
    if headers_only {
        response.body_mut().headers_only();
    }
    Ok(response)
}

fn init_response() -> ShimResponse {
    ShimResponse::new(StatusCode::OK, Bytes::from_static(br#"{"ok":true}"#))
}

/// Read the envelope, call the action and encode its result.
///
/// The action runs in its own task so a panic inside it is answered with a
/// 500 instead of tearing down the connection.
async fn run<B>(body: B, state: &ShimState) -> ShimResult<ShimResponse>
where
    B: Body,
    B::Error: Display,
{
    let body = body
        .collect()
        .await
        .map_err(|e| ShimError::ReadBody(e.to_string()))?
        .to_bytes();

    let request = InvocationRequest::from_slice(&body)?;
    let action = state.action.as_ref().ok_or(ShimError::NotRegistered)?;
    let action = Arc::clone(action);
    let value = request.into_value();
    let result = tokio::spawn(async move { action.invoke(value).await })
        .await
        .unwrap_or_else(|err| Err(ActionError::from(err)))?;

    ShimResponse::json(&result).map_err(|e| ActionError::Encode(e).into())
}

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", timestamp, seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{action_fn, async_action_fn};
    use async_trait::async_trait;
    use http_body_util::Full;
    use hyper::body::Frame;
    use serde_json::{json, Value};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct BrokenBody;

    impl Body for BrokenBody {
        type Data = Bytes;
        type Error = io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
            Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "peer went away",
            ))))
        }
    }

    fn state(action: Option<Arc<dyn Action>>) -> Arc<ShimState> {
        Arc::new(ShimState { action })
    }

    fn echo_state() -> Arc<ShimState> {
        let action: Arc<dyn Action> =
            Arc::new(action_fn(|value: Value| -> Result<Value, String> { Ok(value) }));
        state(Some(action))
    }

    fn post(path: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::post(path)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn call<B>(req: Request<B>, state: Arc<ShimState>) -> (StatusCode, Value)
    where
        B: Body,
        B::Error: Display,
    {
        let response = handle_request(req, state).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_init_is_ok_without_action() {
        let req = Request::get(INIT_PATH).body(Full::new(Bytes::new())).unwrap();
        let (status, body) = call(req, state(None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_run_echoes_value() {
        let (status, body) = call(post(RUN_PATH, r#"{"value":{"a":1}}"#), echo_state()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_run_rejects_malformed_json() {
        let (status, body) = call(post(RUN_PATH, "not json"), echo_state()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Error unmarshaling request"));
    }

    #[tokio::test]
    async fn test_run_reports_unreadable_body() {
        let req = Request::post(RUN_PATH).body(BrokenBody).unwrap();
        let (status, body) = call(req, echo_state()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Error reading request body: peer went away"
        );
    }

    #[tokio::test]
    async fn test_run_without_action_is_server_error() {
        let (status, body) = call(post(RUN_PATH, r#"{"value":1}"#), state(None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "no action registered: adapter misconfigured");
    }

    #[tokio::test]
    async fn test_malformed_body_is_checked_before_registration() {
        let (status, _) = call(post(RUN_PATH, "{"), state(None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_action_failure_message_is_verbatim() {
        let action: Arc<dyn Action> =
            Arc::new(action_fn(|_: Value| -> Result<Value, String> { Err("boom".into()) }));
        let (status, body) = call(post(RUN_PATH, r#"{"value":null}"#), state(Some(action))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "boom"}));
    }

    struct Faulty;

    #[async_trait]
    impl Action for Faulty {
        async fn invoke(&self, _value: Value) -> Result<Value, ActionError> {
            panic!("trait boom")
        }
    }

    #[tokio::test]
    async fn test_panicking_trait_action_is_server_error() {
        let action: Arc<dyn Action> = Arc::new(Faulty);
        let (status, body) = call(post(RUN_PATH, r#"{"value":1}"#), state(Some(action))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "action panicked: trait boom"}));
    }

    #[tokio::test]
    async fn test_panicking_async_closure_is_server_error() {
        let action: Arc<dyn Action> = Arc::new(async_action_fn(|_: Value| async move {
            if true {
                panic!("async kaboom");
            }
            Ok::<Value, String>(Value::Null)
        }));
        let (status, body) = call(post(RUN_PATH, r#"{"value":1}"#), state(Some(action))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "action panicked: async kaboom");
    }

    #[tokio::test]
    async fn test_head_response_is_not_short() {
        let req = Request::head(INIT_PATH).body(Full::new(Bytes::new())).unwrap();
        let response = handle_request(req, state(None)).await.unwrap();
        assert_eq!(response.headers()[hyper::header::CONTENT_LENGTH], "11");
        assert!(!response.body().is_short());

        let req = Request::get(INIT_PATH).body(Full::new(Bytes::new())).unwrap();
        let response = handle_request(req, state(None)).await.unwrap();
        assert!(response.body().is_short());
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let (status, body) = call(post("/status", "{}"), echo_state()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no route for /status");
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let server = ActionServer::new(ShimConfig::new().host("127.0.0.1").port(0));
        assert!(!server.has_action());
        let bound = tokio_test::assert_ok!(server.bind().await);
        assert_ne!(bound.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let first = tokio_test::assert_ok!(
            ActionServer::new(ShimConfig::new().host("127.0.0.1").port(0))
                .bind()
                .await
        );
        let taken = first.local_addr().port();

        let err = ActionServer::new(ShimConfig::new().host("127.0.0.1").port(taken))
            .bind()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ShimError::Bind { .. }));
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
