//! HTTP gateway.
//!
//! Exposes the validators to browser clients:
//!
//! | Route | Body | Result |
//! |---|---|---|
//! | `POST /validate` | `{"nic": ...}` or `{"code": ...}` | NIC or postal result |
//! | `POST /validate/nic` | `{"nic": ...}` | NIC result |
//! | `POST /validate/postal` | `{"code": ...}` | postal result |
//! | `GET /districts` | | district listing |
//! | `GET /health` | | `{"status": "ok"}` |
//! | `GET /metrics` | | Prometheus text, when enabled |
//!
//! Every response carries `Access-Control-Allow-Origin`, and `OPTIONS` on any
//! path answers the CORS preflight.

use crate::config::{ConfigError, HttpConfig};
use crate::error::ServerError;
use crate::handler::CommandHandler;
use crate::metrics::METRICS_CONTENT_TYPE;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use pdaval_protocol::{ErrorCode, Operation};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

const JSON_CONTENT_TYPE: &str = "application/json";
const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ROUTES: &[&str] = &[
    "/validate",
    "/validate/nic",
    "/validate/postal",
    "/districts",
    "/health",
    "/metrics",
];

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared state of the gateway.
pub struct GatewayState {
    handler: Arc<CommandHandler>,
    allow_origin: HeaderValue,
    max_body_bytes: usize,
}

impl GatewayState {
    pub fn new(handler: Arc<CommandHandler>, config: &HttpConfig) -> Result<Self, ServerError> {
        let allow_origin = HeaderValue::from_str(&config.allow_origin).map_err(|_| {
            ConfigError::Validation(format!(
                "http.allow_origin is not a valid header value: {:?}",
                config.allow_origin
            ))
        })?;
        Ok(Self {
            handler,
            allow_origin,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

/// Binds the configured address and serves the gateway until shutdown.
pub async fn run_gateway(
    config: &HttpConfig,
    state: Arc<GatewayState>,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    serve_gateway(listener, state, shutdown).await
}

/// Serves the gateway on an already bound listener.
pub async fn serve_gateway(
    listener: TcpListener,
    state: Arc<GatewayState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    tracing::info!("HTTP gateway listening on http://{}", listener.local_addr()?);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { Ok::<_, Infallible>(route(req, &state).await) }
                            });
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                tracing::debug!("HTTP connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("HTTP gateway accept error: {}", e);
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("HTTP gateway shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Answers one gateway request.
pub async fn route<B>(req: Request<B>, state: &GatewayState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => preflight(state),
        (&Method::POST, "/validate") => match read_json(req, state).await {
            Ok(body) => validate_either(&body, state),
            Err(response) => response,
        },
        (&Method::POST, "/validate/nic") => match read_json(req, state).await {
            Ok(body) => execute(Operation::ValidateNic, &body, state),
            Err(response) => response,
        },
        (&Method::POST, "/validate/postal") => match read_json(req, state).await {
            Ok(body) => execute(Operation::ValidatePostal, &body, state),
            Err(response) => response,
        },
        (&Method::GET, "/districts") => execute(Operation::ListDistricts, &Value::Null, state),
        (&Method::GET, "/health") => json_response(StatusCode::OK, &json!({"status": "ok"}), state),
        (&Method::GET, "/metrics") => metrics(state),
        (_, path) if ROUTES.contains(&path) => {
            let mut response = error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("method {} not allowed", method),
                state,
            );
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
            response
        }
        _ => error_response(StatusCode::NOT_FOUND, "not found", state),
    };

    tracing::debug!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        "HTTP request"
    );
    response
}

/// Dispatches on which key the body carries.
fn validate_either(body: &Value, state: &GatewayState) -> Response<Full<Bytes>> {
    let (op, input) = if let Some(nic) = body.get("nic") {
        (Operation::ValidateNic, nic)
    } else if let Some(code) = body.get("code") {
        (Operation::ValidatePostal, code)
    } else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "request body must contain \"nic\" or \"code\"",
            state,
        );
    };
    execute(op, &json!({ "input": input }), state)
}

fn execute(op: Operation, params: &Value, state: &GatewayState) -> Response<Full<Bytes>> {
    match state.handler.execute(op, params) {
        Ok(result) => json_response(StatusCode::OK, &result, state),
        Err(e) => {
            let status = match e.error_code() {
                ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            error_response(status, e.to_string(), state)
        }
    }
}

fn metrics(state: &GatewayState) -> Response<Full<Bytes>> {
    let Some(metrics) = state.handler.metrics() else {
        return error_response(StatusCode::NOT_FOUND, "metrics are disabled", state);
    };
    match metrics.encode() {
        Ok(body) => respond(StatusCode::OK, METRICS_CONTENT_TYPE, body, state),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {}", e),
            state,
        ),
    }
}

fn preflight(state: &GatewayState) -> Response<Full<Bytes>> {
    let mut response = respond(StatusCode::NO_CONTENT, JSON_CONTENT_TYPE, Bytes::new(), state);
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Reads a size-limited JSON body.
async fn read_json<B>(req: Request<B>, state: &GatewayState) -> Result<Value, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let bytes = match Limited::new(req.into_body(), state.max_body_bytes)
        .collect()
        .await
    {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body exceeds {} bytes", state.max_body_bytes),
                state,
            ));
        }
        Err(e) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("failed to read request body: {}", e),
                state,
            ));
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("invalid JSON body: {}", e),
            state,
        )
    })
}

fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    state: &GatewayState,
) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "error": message.into() }), state)
}

fn json_response(status: StatusCode, value: &Value, state: &GatewayState) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => respond(status, JSON_CONTENT_TYPE, body, state),
        Err(e) => respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain; charset=utf-8",
            format!("failed to encode response: {}", e),
            state,
        ),
    }
}

fn respond(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
    state: &GatewayState,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, state.allow_origin.clone());
    response
}
