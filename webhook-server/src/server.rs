//! HTTP server for receiving MDM webhook notifications.

use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use warp::http::StatusCode;
use warp::Filter;

use crate::error::ServerError;
use crate::router::{EventRouter, WebhookPayload};

/// Path segment the MDM server posts events to
pub const WEBHOOK_PATH: &str = "webhook";

/// Path segment answering liveness probes
pub const HEALTH_PATH: &str = "health";

/// HTTP server for receiving MDM webhook notifications.
///
/// The `WebhookServer` binds to a local address and exposes `POST /webhook`.
/// Every request to that endpoint is answered with `200 OK` straight away,
/// whatever its body contains; valid JSON bodies are forwarded through an
/// `EventRouter` to a channel, anything else is logged and dropped.
///
/// # Example
///
/// ```no_run
/// use tokio::sync::mpsc;
/// use webhook_server::{WebhookPayload, WebhookServer};
///
/// #[tokio::main]
/// async fn main() {
///     let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
///
///     let server = WebhookServer::bind(([0, 0, 0, 0], 8080).into(), tx)
///         .await
///         .expect("Failed to start webhook server");
///
///     println!("Point MicroMDM at: {}", server.webhook_url());
///
///     while let Some(payload) = rx.recv().await {
///         println!("Received event: {}", payload.event["topic"]);
///     }
/// }
/// ```
pub struct WebhookServer {
    /// The address the server is bound to
    local_addr: SocketAddr,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl WebhookServer {
    /// Bind to `addr` and start serving.
    ///
    /// Binding happens before this returns, so a port that is already taken
    /// is reported here. Port 0 binds an ephemeral port; use
    /// [`local_addr`](Self::local_addr) to find out which.
    pub async fn bind(
        addr: SocketAddr,
        event_sender: mpsc::UnboundedSender<WebhookPayload>,
    ) -> Result<Self, ServerError> {
        let router = EventRouter::new(event_sender);

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let (local_addr, server) = warp::serve(Self::routes(router))
            .try_bind_with_graceful_shutdown(addr, async move {
                shutdown_rx.recv().await;
            })
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!(%local_addr, "Webhook server listening");

        let server_handle = tokio::spawn(server);

        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// Get the address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the URL of the webhook endpoint on the bound address.
    pub fn webhook_url(&self) -> String {
        format!("http://{}/{}", self.local_addr, WEBHOOK_PATH)
    }

    /// Shutdown the server gracefully.
    ///
    /// Sends a shutdown signal and waits for in-flight requests to complete.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.server_handle.take() {
            handle.await?;
        }

        tracing::info!(local_addr = %self.local_addr, "Webhook server stopped");
        Ok(())
    }

    /// Build the full filter tree served by the webhook server.
    fn routes(
        router: EventRouter,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone + Send + Sync + 'static
    {
        let webhook_route = warp::path(WEBHOOK_PATH)
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::addr::remote())
            .and(warp::body::bytes())
            .map(move |remote_addr: Option<SocketAddr>, body: bytes::Bytes| {
                tracing::debug!(
                    remote_addr = ?remote_addr,
                    body_size = body.len(),
                    "Incoming webhook notification"
                );

                // The sender only needs to know we got it; outcome stays local
                if let Err(e) = router.route_event(&body, remote_addr) {
                    tracing::warn!(remote_addr = ?remote_addr, "Dropping webhook notification: {}", e);
                }

                warp::reply::with_status(warp::reply(), StatusCode::OK)
            });

        let health_route = warp::path(HEALTH_PATH)
            .and(warp::path::end())
            .and(warp::get())
            .map(|| "OK");

        webhook_route.or(health_route).recover(handle_rejection)
    }
}

/// Handle rejections and convert them to HTTP responses.
async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not found";
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed";
    } else {
        tracing::warn!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error";
    }

    Ok(warp::reply::with_status(message, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_routes() -> (
        impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone,
        mpsc::UnboundedReceiver<WebhookPayload>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WebhookServer::routes(EventRouter::new(tx)), rx)
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_and_forwards() {
        let (routes, mut rx) = test_routes();

        let response = warp::test::request()
            .method("POST")
            .path("/webhook")
            .body(r#"{"topic":"mdm.TokenUpdate","checkin_event":{"udid":"A1"}}"#)
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());

        let payload = rx.try_recv().expect("Payload should be forwarded");
        assert_eq!(payload.event["topic"], "mdm.TokenUpdate");
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_invalid_json() {
        let (routes, mut rx) = test_routes();

        let response = warp::test::request()
            .method("POST")
            .path("/webhook")
            .body("definitely not json")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_when_receiver_gone() {
        let (routes, rx) = test_routes();
        drop(rx);

        let response = warp::test::request()
            .method("POST")
            .path("/webhook")
            .body(r#"{"topic":"mdm.CheckOut"}"#)
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (routes, _rx) = test_routes();

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "OK");
    }

    #[tokio::test]
    async fn test_wrong_method_on_webhook() {
        let (routes, _rx) = test_routes();

        let response = warp::test::request()
            .method("GET")
            .path("/webhook")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (routes, _rx) = test_routes();

        let response = warp::test::request()
            .method("POST")
            .path("/v1/commands")
            .body("{}")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
