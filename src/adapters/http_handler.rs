use std::{convert::Infallible, sync::Arc};

use arc_swap::ArcSwap;
use axum::{
    body::Body as AxumBody,
    extract::Request,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::Response,
    routing::any,
};
use eyre::{Result, WrapErr};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::Instrument;

use crate::{
    adapters::middleware::{
        RequestId, cors_middleware, request_id_middleware, request_timing_middleware,
    },
    config::models::HttpConfig,
    core::{
        exchange::ApiRequest,
        response::{ApiResponse, JSON_CONTENT_TYPE},
        router::Router,
    },
    metrics::{self, RequestTimer},
    tracing_setup,
};

pub const HEALTH_PATH: &str = "/health";

/// HTTP glue between axum and the route-tree [`Router`].
///
/// The router sits behind an [`ArcSwap`] so a reload can replace it while
/// requests are in flight; every request works on the snapshot it loaded.
#[derive(Clone)]
pub struct HttpHandler {
    router: Arc<ArcSwap<Router>>,
    max_body_bytes: usize,
}

impl HttpHandler {
    pub fn new(router: Arc<ArcSwap<Router>>, max_body_bytes: usize) -> Self {
        Self {
            router,
            max_body_bytes,
        }
    }

    /// A handler whose router is never replaced.
    pub fn from_router(router: Router, max_body_bytes: usize) -> Self {
        Self::new(Arc::new(ArcSwap::from_pointee(router)), max_body_bytes)
    }

    /// Shared slot holding the current router, for reloads.
    pub fn router_slot(&self) -> Arc<ArcSwap<Router>> {
        self.router.clone()
    }

    /// Main request handler
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Result<Response<AxumBody>> {
        let method = req.method().clone();
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        let span = tracing_setup::create_request_span(method.as_str(), req.uri().path(), &request_id);

        async move {
            if req.uri().path() == HEALTH_PATH
                && method == Method::GET
                && !self.tree_serves_health()
            {
                return self.handle_health_check();
            }

            let timer = RequestTimer::new(method.as_str());
            let response = match self.read_body(req).await {
                Ok(body) => {
                    let router = self.router.load_full();
                    router.handle(ApiRequest::new(method.clone(), target).with_body(body))
                }
                Err(response) => response,
            };

            let span = tracing::Span::current();
            span.record("http.status_code", response.status.as_u16());
            span.record("duration_ms", timer.elapsed().as_millis() as u64);
            metrics::increment_request_total(method.as_str(), response.status.as_u16());

            into_http_response(response)
        }
        .instrument(span)
        .await
    }

    /// Collect the body, refusing anything over the configured limit.
    async fn read_body(&self, req: Request<AxumBody>) -> Result<Vec<u8>, ApiResponse> {
        let too_large = || {
            let limit = self.max_body_bytes;
            tracing::info!(limit, "Request body too large");
            ApiResponse {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                body: serde_json::json!({ "msg": format!("Request body exceeds {limit} bytes") })
                    .to_string(),
            }
        };

        let declared = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.max_body_bytes) {
            return Err(too_large());
        }

        match axum::body::to_bytes(req.into_body(), self.max_body_bytes).await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read request body");
                Err(too_large())
            }
        }
    }

    /// A top-level `health` node in the route tree takes precedence over the
    /// built-in liveness endpoint.
    fn tree_serves_health(&self) -> bool {
        let segment = HEALTH_PATH.trim_start_matches('/');
        self.router.load().tree().root().child(segment).is_some()
    }

    /// Handle health check endpoint
    fn handle_health_check(&self) -> Result<Response<AxumBody>> {
        let router = self.router.load();
        let health_data = serde_json::json!({
            "status": "healthy",
            "routes": router.tree().len(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(AxumBody::from(health_data.to_string()))
            .wrap_err("Failed to build health check response")
    }
}

fn into_http_response(response: ApiResponse) -> Result<Response<AxumBody>> {
    Response::builder()
        .status(response.status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
        .body(AxumBody::from(response.body))
        .wrap_err("Failed to build API response")
}

/// Build the axum application serving every path through `handler`.
pub fn build_app(handler: HttpHandler, http: &HttpConfig) -> axum::Router {
    let make_request_route = |handler: HttpHandler| {
        any(move |req: Request| {
            let handler = handler.clone();
            async move {
                match handler.handle_request(req).await {
                    Ok(response) => Ok::<Response<AxumBody>, Infallible>(response),
                    Err(e) => {
                        tracing::error!("Request handling error: {:?}", e);
                        let error_response = Response::builder()
                            .status(StatusCode::INTERNAL_SERVER_ERROR)
                            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                            .body(AxumBody::from(r#"{"msg":"Internal Server Error"}"#))
                            .unwrap_or_else(|_| {
                                Response::new(AxumBody::from("Internal Server Error"))
                            });
                        Ok(error_response)
                    }
                }
            }
        })
    };

    let mut app = axum::Router::new()
        .route("/{*path}", make_request_route(handler.clone()))
        .route("/", make_request_route(handler));

    if http.compression {
        app = app.layer(CompressionLayer::new());
    }
    if http.cors {
        app = app.layer(middleware::from_fn(cors_middleware));
    }

    app.layer(middleware::from_fn(request_timing_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
