//! Decoding of ingestion messages delivered through SNS and SQS.
//!
//! Every queue record body is an SNS notification envelope. Its `Message`
//! carries either a STAC document published directly to the topic or an S3
//! object-created notification that points at the document.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Marker present in every S3 event notification payload.
const S3_EVENT_MARKER: &str = "aws:s3";
const STAC_OBJECT_SUFFIXES: [&str; 2] = [".json", ".geojson"];

/// Failures raised while decoding a single message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageDecodeError {
    /// The queue record body is not a valid SNS envelope.
    #[error("invalid SNS envelope: {message}")]
    Envelope {
        /// Parser diagnostics.
        message: String,
    },
    /// The SNS message is not valid JSON.
    #[error("invalid message JSON: {message}")]
    Json {
        /// Parser diagnostics.
        message: String,
    },
    /// The S3 event notification is malformed.
    #[error("invalid S3 event structure: {message}")]
    S3Event {
        /// Description of the structural problem.
        message: String,
    },
    /// The referenced object does not look like a STAC document.
    #[error("S3 object key does not appear to be a STAC document: {key}")]
    NotStacObject {
        /// Decoded object key.
        key: String,
    },
}

/// SNS notification envelope carried in an SQS record body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnsEnvelope {
    /// Published message text.
    #[serde(rename = "Message")]
    pub message: String,
    /// Publish time assigned by SNS.
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl SnsEnvelope {
    /// Parse an SQS record body as an SNS envelope.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::SnsEnvelope;
    ///
    /// let body = r#"{"Type":"Notification","Message":"{}","Timestamp":"2024-05-01T12:00:00.000Z"}"#;
    /// let envelope = SnsEnvelope::from_body(body).expect("valid envelope");
    /// assert_eq!(envelope.message, "{}");
    /// ```
    pub fn from_body(body: &str) -> Result<Self, MessageDecodeError> {
        serde_json::from_str(body).map_err(|err| MessageDecodeError::Envelope {
            message: err.to_string(),
        })
    }
}

/// Location of an object in S3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    /// Bucket name.
    pub bucket: String,
    /// Decoded object key.
    pub key: String,
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Decoded SNS message payload.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionPayload {
    /// A STAC document published directly.
    Record(Value),
    /// A pointer to a STAC document stored in S3.
    ObjectReference(ObjectLocation),
}

impl IngestionPayload {
    /// Classify a message as an S3 reference or a direct document.
    ///
    /// Any message containing the `aws:s3` marker is treated as an S3 event,
    /// matching how S3 notifications are recognised upstream.
    pub fn classify(message: &str) -> Result<Self, MessageDecodeError> {
        let value: Value =
            serde_json::from_str(message).map_err(|err| MessageDecodeError::Json {
                message: err.to_string(),
            })?;

        if message.contains(S3_EVENT_MARKER) {
            return parse_s3_event(&value).map(Self::ObjectReference);
        }
        Ok(Self::Record(value))
    }
}

#[derive(Debug, Deserialize)]
struct S3Notification {
    #[serde(rename = "Records", default)]
    records: Vec<S3NotificationRecord>,
}

#[derive(Debug, Deserialize)]
struct S3NotificationRecord {
    s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: Option<S3Bucket>,
    object: Option<S3Object>,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: Option<String>,
}

fn parse_s3_event(value: &Value) -> Result<ObjectLocation, MessageDecodeError> {
    let notification = S3Notification::deserialize(value).map_err(|err| {
        MessageDecodeError::S3Event {
            message: err.to_string(),
        }
    })?;

    let record = match notification.records.as_slice() {
        [] => return Err(s3_event_error("no S3 event records")),
        [record] => record,
        _ => return Err(s3_event_error("more than one S3 event record")),
    };

    let entity = record
        .s3
        .as_ref()
        .ok_or_else(|| s3_event_error("missing 's3'"))?;
    let bucket = entity
        .bucket
        .as_ref()
        .and_then(|bucket| bucket.name.clone())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| s3_event_error("missing 'bucket.name'"))?;
    let raw_key = entity
        .object
        .as_ref()
        .and_then(|object| object.key.as_deref())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| s3_event_error("missing 'object.key'"))?;

    let key = decode_object_key(raw_key);
    if !STAC_OBJECT_SUFFIXES
        .iter()
        .any(|suffix| key.ends_with(suffix))
    {
        return Err(MessageDecodeError::NotStacObject { key });
    }

    Ok(ObjectLocation { bucket, key })
}

fn s3_event_error(message: &str) -> MessageDecodeError {
    MessageDecodeError::S3Event {
        message: message.to_owned(),
    }
}

/// S3 notifications form-encode keys (`+` for spaces, `%XX` escapes).
/// Literal `&` and `=` are part of the key, so they are escaped before the
/// form parser sees them and the whole key decodes as a single name.
fn decode_object_key(raw: &str) -> String {
    let escaped = raw.replace('&', "%26").replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .map(|(key, _)| key.into_owned())
        .next()
        .unwrap_or_default()
}
