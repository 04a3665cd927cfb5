//! Request descriptions handed to the executor.

use http::{HeaderValue, Method};
use serde_json::Value;

/// How a successful response body should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Raw bytes, returned unchanged (e.g. a PNG).
    Binary,
    /// A JSON document decoded into the operation's result type.
    Json,
}

impl ResponseShape {
    /// The `Accept` header sent for this shape.
    pub fn accept(self) -> HeaderValue {
        match self {
            ResponseShape::Binary => HeaderValue::from_static("*/*"),
            ResponseShape::Json => HeaderValue::from_static("application/json"),
        }
    }
}

/// Everything the executor needs to run one logical operation.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET or POST).
    pub method: Method,

    /// The request path, starting with `/`, relative to the base URL.
    pub path: String,

    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<Value>,

    /// Expected shape of a successful response.
    pub shape: ResponseShape,
}

impl RequestMetadata {
    /// Creates a body-less request expecting a JSON response.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            shape: ResponseShape::Json,
        }
    }

    /// Attaches a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the expected response shape.
    pub fn with_shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }
}
