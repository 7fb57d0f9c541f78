use axum::{
    body::to_bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State},
    http::{header, HeaderMap, Method},
    routing::any,
    Router,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::data::normalizer::{normalize, Encoding, InboundRequest};
use crate::data::upload::spool_multipart;
use crate::engine::traits::AnalysisInvoker;
use crate::error::NormalizeError;
use crate::response::{HttpResult, ResponseFormat, ToHttpResult};

pub struct AppState {
    pub invoker: Arc<dyn AnalysisInvoker>,
    pub config: AppConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", any(health))
        .route("/analyze", any(analyze))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>) -> Result<(), crate::error::GatewayError> {
    let addr = state.config.bind_addr();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API Server listening on {}", addr);
    info!("  GET  /health");
    info!("  POST /analyze");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("API Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn response_format(headers: &HeaderMap) -> ResponseFormat {
    ResponseFormat::from_accept(headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()))
}

async fn health(method: Method, headers: HeaderMap) -> HttpResult {
    let result = match method {
        Method::OPTIONS => return HttpResult::preflight(),
        Method::GET | Method::HEAD => HttpResult::health(
            env!("CARGO_PKG_VERSION"),
            &chrono::Utc::now().to_rfc3339(),
        ),
        _ => HttpResult::method_not_allowed(),
    };
    result.with_format(response_format(&headers))
}

async fn fallback(method: Method, headers: HeaderMap) -> HttpResult {
    if method == Method::OPTIONS {
        return HttpResult::preflight();
    }
    HttpResult::not_found().with_format(response_format(&headers))
}

async fn analyze(State(state): State<Arc<AppState>>, request: Request) -> HttpResult {
    if request.method() == Method::OPTIONS {
        return HttpResult::preflight();
    }
    let format = response_format(request.headers());
    if request.method() != Method::POST {
        return HttpResult::method_not_allowed().with_format(format);
    }

    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", %request_id);

    async move {
        let analysis = match read_inbound(&state, request).await.and_then(normalize) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("⚠️ [ANALYZE] Rejected input (HTTP {}): {}", e.kind().status_code(), e);
                return e.to_http_result().with_format(format);
            }
        };

        info!(
            "📊 [ANALYZE] {} bars ({} .. {}), type={}",
            analysis.series.len(),
            analysis.series.first().date,
            analysis.series.last().date,
            analysis.analysis_type
        );

        let outcome = state.invoker.invoke(&analysis).await;
        match outcome.error_kind() {
            None => info!("✅ [ANALYZE] Analysis complete via {}", state.invoker.name()),
            Some(kind) => warn!(
                "❌ [ANALYZE] Analysis failed: {} (HTTP {})",
                outcome.label(),
                kind.status_code()
            ),
        }

        outcome.to_http_result().with_format(format)
    }
    .instrument(span)
    .await
}

/// Split the request by declared content type and read its body.
async fn read_inbound(state: &AppState, request: Request) -> Result<InboundRequest, NormalizeError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let encoding = Encoding::from_content_type(content_type.as_deref())?;

    match encoding {
        Encoding::Multipart => {
            let multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| NormalizeError::Upload(e.body_text()))?;
            let form = spool_multipart(multipart, state.config.upload.max_upload_bytes).await?;
            Ok(InboundRequest::Upload(form))
        }
        Encoding::Json | Encoding::Text => {
            let params = Query::<BTreeMap<String, String>>::try_from_uri(request.uri())
                .map(|Query(params)| params)
                .unwrap_or_default();
            let body = to_bytes(request.into_body(), state.config.server.max_body_bytes)
                .await
                .map_err(|e| NormalizeError::Body(e.to_string()))?;
            InboundRequest::from_body(encoding, &body, params)
        }
    }
}
