//! Request and result envelopes exchanged with the picturas tool workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Range;
use uuid::Uuid;

pub const CHANGE_BRIGHTNESS_PROCEDURE: &str = "change_brightness";

/// Brightness factors are drawn from this half-open range.
pub const BRIGHTNESS_FACTOR_RANGE: Range<f64> = 0.5..2.0;

/// Generic request envelope; `parameters` must serialize to a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage<P> {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub procedure: String,
    pub parameters: P,
}

impl<P> RequestMessage<P> {
    pub fn new(message_id: impl Into<String>, procedure: impl Into<String>, parameters: P) -> Self {
        Self {
            message_id: message_id.into(),
            timestamp: Utc::now(),
            procedure: procedure.into(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeBrightnessParameters {
    #[serde(rename = "inputImageURI")]
    pub input_image_uri: String,
    #[serde(rename = "outputImageURI")]
    pub output_image_uri: String,
    #[serde(rename = "brightnessFactor")]
    pub brightness_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultError {
    /// Machine readable code, e.g. `INVALID_INPUT`
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// Image produced by a tool, as carried in a result's `output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOutput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "imageURI")]
    pub image_uri: String,
}

impl ImageOutput {
    pub fn new(image_uri: impl Into<String>) -> Self {
        Self {
            kind: "image".to_string(),
            image_uri: image_uri.into(),
        }
    }
}

/// Envelope a worker publishes on the `results` queue.
///
/// `correlation_id` carries the `messageId` of the request it answers.
/// Exactly one of `output` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMessage<O> {
    pub message_id: String,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: ResultStatus,
    pub error: Option<ResultError>,
    pub output: Option<O>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl<O> ResultMessage<O> {
    pub fn success<P>(request: &RequestMessage<P>, output: O) -> Self {
        Self::from_outcome(request, Ok(output))
    }

    pub fn failure<P>(request: &RequestMessage<P>, error: ResultError) -> Self {
        Self::from_outcome(request, Err(error))
    }

    pub fn from_outcome<P>(request: &RequestMessage<P>, outcome: std::result::Result<O, ResultError>) -> Self {
        let (status, output, error) = match outcome {
            Ok(output) => (ResultStatus::Success, Some(output), None),
            Err(error) => (ResultStatus::Error, None, Some(error)),
        };

        Self {
            message_id: new_request_id(),
            correlation_id: request.message_id.clone(),
            timestamp: Utc::now(),
            status,
            error,
            output,
            metadata: Map::new(),
        }
    }

    /// Tag the result with the name of the microservice that produced it.
    pub fn with_microservice(mut self, name: impl Into<String>) -> Self {
        self.metadata.insert("microservice".to_string(), Value::String(name.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Fresh request id (UUID v4, hyphenated).
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}
