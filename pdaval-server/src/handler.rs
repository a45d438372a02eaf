//! Command handlers.

use crate::error::ServerError;
use crate::metrics::Metrics;
use crate::session::{Session, SessionState};
use pdaval_core::{NicValidation, PostalValidation, Validator};
use pdaval_protocol::message::*;
use pdaval_protocol::{ProtocolError, PROTOCOL_VERSION};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Server identity reported by INFO.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub automata: Vec<String>,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "pdaval".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            automata: vec!["nic".to_string(), "postal".to_string()],
        }
    }
}

/// Command handler shared by the line protocol and the HTTP gateway.
#[derive(Clone)]
pub struct CommandHandler {
    validator: Validator,
    info: ServerInfo,
    /// Metrics for request tracking.
    metrics: Option<Arc<Metrics>>,
}

impl CommandHandler {
    /// Creates a new command handler.
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            info: ServerInfo::default(),
            metrics: None,
        }
    }

    /// Sets the metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns a reference to the metrics, if set.
    pub fn metrics(&self) -> Option<&Arc<Metrics>> {
        self.metrics.as_ref()
    }

    /// Handles a request and returns a response.
    pub fn handle(&self, session: &mut Session, request: &Request) -> Response {
        session.record_request();
        let started = Instant::now();

        if request.op == Operation::Bye {
            session.set_state(SessionState::Closing);
        }

        tracing::debug!(
            session_id = %session.id,
            request_id = %request.id,
            op = %request.op,
            "handling request"
        );

        let response = match self.execute(request.op, &request.params) {
            Ok(value) => Response::ok(&request.id, value),
            Err(e) => Response::error(
                &request.id,
                ResponseError::new(e.error_code(), e.to_string()),
            ),
        };

        let mut meta = ResponseMeta::now();
        meta.elapsed_us = Some(started.elapsed().as_micros() as u64);
        response.with_meta(meta)
    }

    /// Runs one operation. Shared with the HTTP gateway, which has no session.
    pub fn execute(&self, op: Operation, params: &Value) -> Result<Value, ServerError> {
        let op_name = op.as_str();

        // Start timing for metrics
        let timer = self.metrics.as_ref().map(|m| {
            m.request_duration
                .with_label_values(&[op_name])
                .start_timer()
        });

        let result = self.dispatch(op, params);

        // Record metrics
        if let Some(ref metrics) = self.metrics {
            metrics.requests_total.with_label_values(&[op_name]).inc();
            if let Err(ref e) = result {
                metrics
                    .errors_total
                    .with_label_values(&[e.error_code().as_str()])
                    .inc();
            }
        }
        drop(timer); // Observation happens on drop

        result
    }

    fn dispatch(&self, op: Operation, params: &Value) -> Result<Value, ServerError> {
        match op {
            Operation::Ping => Ok(json!({"pong": true})),
            Operation::Bye => Ok(json!({"goodbye": true})),
            Operation::Info => self.handle_info(),
            Operation::ValidateNic => {
                let input = Self::input(params)?;
                Ok(serde_json::to_value(self.validate_nic(&input))?)
            }
            Operation::ValidatePostal => {
                let input = Self::input(params)?;
                Ok(serde_json::to_value(self.validate_postal(&input))?)
            }
            Operation::ListDistricts => {
                Ok(serde_json::to_value(self.validator.list_districts().as_ref())?)
            }
        }
    }

    /// Builds the reply for a line that could not be decoded into a request.
    pub fn protocol_error(&self, id: Option<String>, err: &ProtocolError) -> Response {
        if let Some(ref metrics) = self.metrics {
            metrics
                .errors_total
                .with_label_values(&[err.error_code().as_str()])
                .inc();
        }
        Response::error(id.unwrap_or_default(), ResponseError::from(err))
            .with_meta(ResponseMeta::now())
    }

    /// Validates a NIC number and records the outcome.
    pub fn validate_nic(&self, input: &str) -> NicValidation {
        let result = self.validator.validate_nic(input);
        if let Some(ref metrics) = self.metrics {
            metrics.record_validation("nic", &result);
        }
        result
    }

    /// Validates a postal code and records the outcome.
    pub fn validate_postal(&self, input: &str) -> PostalValidation {
        let result = self.validator.validate_postal_code(input);
        if let Some(ref metrics) = self.metrics {
            metrics.record_validation("postal", &result);
        }
        result
    }

    fn handle_info(&self) -> Result<Value, ServerError> {
        let info = InfoResult {
            server_name: self.info.name.clone(),
            server_version: self.info.version.clone(),
            protocol_version: PROTOCOL_VERSION,
            operations: Operation::ALL.to_vec(),
            automata: self.info.automata.clone(),
            districts: self.validator.list_districts().len(),
        };
        Ok(serde_json::to_value(info)?)
    }

    fn input(params: &Value) -> Result<String, ServerError> {
        let params: ValidateParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(format!("invalid params: {}", e)))?;
        Ok(params.input)
    }
}
