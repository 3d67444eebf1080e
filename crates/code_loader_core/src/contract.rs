use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::LoaderError;

pub const CODE_LOCATION_FIELD: &str = "external_code_location";
pub const BUCKET_FIELD: &str = "s3_code_bucket";
pub const KEY_FIELD: &str = "s3_code_key";

/// Name the loaded source must bind its entry point to.
pub const HANDLER_BINDING: &str = "handler";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    pub bucket: String,
    pub key: String,
}

/// Serializable projection of the runtime invocation context, handed to the
/// loaded handler as its second argument.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InvocationContext {
    pub aws_request_id: String,
    pub function_name: String,
    pub function_version: String,
    pub memory_limit_in_mb: i32,
    pub invoked_function_arn: String,
    pub log_group_name: String,
    pub log_stream_name: String,
    pub deadline_ms: u64,
    pub remaining_time_in_millis: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xray_trace_id: Option<String>,
}

pub fn locate_reference(event: &Value) -> Result<CodeLocation, LoaderError> {
    let location = event
        .get(CODE_LOCATION_FIELD)
        .and_then(Value::as_object)
        .ok_or_else(LoaderError::malformed_event)?;

    let bucket = location
        .get(BUCKET_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(LoaderError::malformed_event)?;
    let key = location
        .get(KEY_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(LoaderError::malformed_event)?;

    Ok(CodeLocation {
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

pub fn source_fingerprint(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::{LoaderErrorKind, INVALID_EVENT_MESSAGE};

    #[test]
    fn locates_bucket_and_key() {
        let event = json!({
            "external_code_location": {
                "s3_code_bucket": "code-bucket",
                "s3_code_key": "handlers/echo.js"
            },
            "payload": {"name": "world"}
        });

        let location = locate_reference(&event).expect("event should parse");
        assert_eq!(
            location,
            CodeLocation {
                bucket: "code-bucket".to_string(),
                key: "handlers/echo.js".to_string(),
            }
        );
    }

    #[test]
    fn rejects_every_malformed_shape() {
        let events = [
            json!({}),
            json!({"external_code_location": {"s3_code_bucket": "b"}}),
            json!({"external_code_location": {"s3_code_key": "k"}}),
            json!({"external_code_location": "b/k"}),
            json!({"external_code_location": ["b", "k"]}),
            json!({"external_code_location": null}),
            json!({"external_code_location": {"s3_code_bucket": 7, "s3_code_key": "k"}}),
            json!("not an object"),
            Value::Null,
        ];

        for event in events {
            let error = locate_reference(&event).expect_err("event should be rejected");
            assert_eq!(error.kind(), LoaderErrorKind::MalformedEvent, "{event}");
            assert_eq!(error.message(), INVALID_EVENT_MESSAGE);
        }
    }

    #[test]
    fn fingerprint_is_stable_hex_sha256() {
        let fingerprint = source_fingerprint("function handler() {}");
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, source_fingerprint("function handler() {}"));
        assert_ne!(fingerprint, source_fingerprint("function handler() { }"));
    }

    #[test]
    fn context_omits_missing_trace_id() {
        let context = InvocationContext {
            aws_request_id: "req-1".to_string(),
            ..InvocationContext::default()
        };

        let value = serde_json::to_value(&context).expect("context should serialize");
        assert_eq!(value["aws_request_id"], "req-1");
        assert!(value.get("xray_trace_id").is_none());
    }
}
