//! Bridge server: `POST /radare2` → external tool → JSON.
//!
//! Each request is independent. The handler decodes the body, resolves the
//! target path against the server's working directory, runs the tool on its
//! own task and answers with the combined capture. Tool failures are not
//! HTTP errors; they travel in the `error` field of a 200 response.

pub mod cors;
pub mod error;
pub mod observer;
pub mod path;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::BridgeConfig;
use crate::runner::{ProcessRunner, ToolError, ToolRun, ToolRunner};
use crate::utils::output_text;

pub use error::{BridgeError, PathError};
pub use observer::{BridgeObserver, TracingObserver};

/// 유일한 엔드포인트
pub const ENDPOINT: &str = "/radare2";

/// Analysis request as sent by the front-end.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisRequest {
    /// Binary to analyze, relative to the bridge's working directory or absolute.
    pub filepath: String,
    /// Tool arguments, passed through in order before the resolved path.
    pub params: Vec<String>,
}

impl AnalysisRequest {
    /// Decode the first JSON object in `body`.
    ///
    /// Keys match case-insensitively, so `filePath` and `FILEPATH` both work.
    /// Unknown keys and anything after the first value are ignored; `null`
    /// counts as absent.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        let object = match serde_json::Deserializer::from_slice(body)
            .into_iter::<Map<String, Value>>()
            .next()
        {
            Some(object) => object?,
            None => return Err(serde::de::Error::custom("empty request body")),
        };

        let mut request = Self::default();
        for (key, value) in object {
            if key.eq_ignore_ascii_case("filepath") {
                request.filepath = Option::<String>::deserialize(value)?.unwrap_or_default();
            } else if key.eq_ignore_ascii_case("params") {
                request.params = Option::<Vec<String>>::deserialize(value)?.unwrap_or_default();
            }
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bridge Server State
#[derive(Clone)]
pub struct BridgeServer {
    runner: Arc<dyn ToolRunner>,
    observer: Arc<dyn BridgeObserver>,
    working_dir: PathBuf,
    tool_label: String,
}

impl BridgeServer {
    pub fn new(runner: Arc<dyn ToolRunner>, working_dir: PathBuf, tool_label: &str) -> Self {
        Self {
            runner,
            observer: Arc::new(TracingObserver::new(tool_label)),
            working_dir,
            tool_label: tool_label.to_string(),
        }
    }

    /// Real process runner rooted at the current working directory.
    pub fn from_config(cfg: &BridgeConfig) -> std::io::Result<Self> {
        let working_dir = std::env::current_dir()?;
        let runner = ProcessRunner::new(&cfg.tool_path).with_timeout(cfg.tool_timeout());
        tracing::info!(
            "Bridge tool: {} (timeout: {:?}), base dir: {}",
            runner.program().display(),
            cfg.tool_timeout(),
            working_dir.display()
        );
        Ok(Self::new(Arc::new(runner), working_dir, &cfg.tool_label))
    }

    pub fn with_observer(mut self, observer: Arc<dyn BridgeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(ENDPOINT, post(analyze_handler).options(preflight_handler))
            .fallback(not_found_handler)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(cors::cors_middleware)),
            )
            .with_state(self.clone())
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!("Server started on {}", addr);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("Server on {} stopped", addr);
        Ok(())
    }

    /// Decode → resolve → run. Only request-level problems become `Err`.
    pub async fn handle(&self, body: &[u8]) -> Result<AnalysisResponse, BridgeError> {
        let request = AnalysisRequest::decode(body).map_err(BridgeError::InvalidRequest)?;
        let target = path::resolve_target(&self.working_dir, &request.filepath)?;

        let mut args = request.params;
        args.push(target.to_string_lossy().into_owned());

        self.observer.invoking(&args);
        let run = self.spawn_run(args.clone()).await;
        self.observer.completed(&args, &run);

        Ok(AnalysisResponse {
            output: output_text(&run.output),
            error: run
                .status
                .err()
                .map(|e| format!("{} error: {}", self.tool_label, e)),
        })
    }

    async fn spawn_run(&self, args: Vec<String>) -> ToolRun {
        let runner = self.runner.clone();
        // 별도 태스크: 클라이언트가 끊어져도 도구는 끝까지 실행
        match tokio::spawn(async move { runner.run(&args).await }).await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!("Tool task aborted: {}", e);
                ToolRun::failure(Vec::<u8>::new(), ToolError::Aborted(e.to_string()))
            }
        }
    }
}

/// POST /radare2 - 도구 실행
async fn analyze_handler(State(server): State<BridgeServer>, body: Bytes) -> Response {
    let result = server.handle(&body).await.and_then(|resp| {
        serde_json::to_vec(&resp).map_err(BridgeError::Encoding)
    });

    match result {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Err(e) => {
            server.observer.request_failed(&e);
            e.into_response()
        }
    }
}

/// OPTIONS /radare2 - CORS preflight, 본문 없음
async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found")
}
