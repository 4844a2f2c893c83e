use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as seen by the endpoint.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

struct EndpointState {
    script: Mutex<VecDeque<u16>>,
    fallback: u16,
    response_delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A local HTTP server answering with a scripted sequence of statuses.
///
/// Each request pops the next status from the script; once it is empty,
/// `fallback` is returned. Every request is recorded.
pub struct ScriptedEndpoint {
    url: String,
    state: Arc<EndpointState>,
    server: JoinHandle<()>,
}

impl ScriptedEndpoint {
    pub async fn start(script: &[u16], fallback: u16) -> anyhow::Result<Self> {
        Self::start_with_delay(script, fallback, None).await
    }

    /// Always answer with `status`.
    pub async fn always(status: u16) -> anyhow::Result<Self> {
        Self::start(&[], status).await
    }

    /// Like [`start`](Self::start), but every response is held back for `delay`.
    pub async fn start_with_delay(
        script: &[u16],
        fallback: u16,
        delay: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(EndpointState {
            script: Mutex::new(script.iter().copied().collect()),
            fallback,
            response_delay: delay,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(respond).with_state(Arc::clone(&state));
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "scripted endpoint stopped");
            }
        });

        Ok(Self {
            url: format!("http://{addr}/hook"),
            state,
            server,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for ScriptedEndpoint {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn respond(
    State(state): State<Arc<EndpointState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        headers,
        body,
    });

    if let Some(delay) = state.response_delay {
        tokio::time::sleep(delay).await;
    }

    let code = state
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(state.fallback);
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// An address nothing is listening on.
pub async fn unused_url() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/hook"))
}
