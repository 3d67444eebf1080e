use serde_json::{json, Value};

pub const INVALID_EVENT_MESSAGE: &str =
    "Invalid event format, missing external_code_location.s3_code_bucket or s3_code_key";
pub const MISSING_HANDLER_MESSAGE: &str = "No handler() found in the downloaded file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderErrorKind {
    MalformedEvent,
    RetrievalFailure,
    LoadFailure,
    MissingEntryPoint,
    HandlerFailure,
}

impl LoaderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedEvent => "malformed_event",
            Self::RetrievalFailure => "retrieval_failure",
            Self::LoadFailure => "load_failure",
            Self::MissingEntryPoint => "missing_entry_point",
            Self::HandlerFailure => "handler_failure",
        }
    }
}

/// A failed invocation. Every kind renders to the same `{"error": message}`
/// shape at the function boundary; the kind only exists for internal
/// branching and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderError {
    kind: LoaderErrorKind,
    message: String,
}

impl LoaderError {
    pub fn new(kind: LoaderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed_event() -> Self {
        Self::new(LoaderErrorKind::MalformedEvent, INVALID_EVENT_MESSAGE)
    }

    pub fn missing_entry_point() -> Self {
        Self::new(LoaderErrorKind::MissingEntryPoint, MISSING_HANDLER_MESSAGE)
    }

    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::new(LoaderErrorKind::RetrievalFailure, message)
    }

    pub fn load(message: impl Into<String>) -> Self {
        Self::new(LoaderErrorKind::LoadFailure, message)
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(LoaderErrorKind::HandlerFailure, message)
    }

    pub fn kind(&self) -> LoaderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn to_response(&self) -> Value {
        error_response(&self.message)
    }
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LoaderError {}

pub fn error_response(message: &str) -> Value {
    json!({ "error": message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_messages_render_verbatim() {
        assert_eq!(
            LoaderError::malformed_event().to_response(),
            json!({"error": "Invalid event format, missing external_code_location.s3_code_bucket or s3_code_key"})
        );
        assert_eq!(
            LoaderError::missing_entry_point().to_response(),
            json!({"error": "No handler() found in the downloaded file"})
        );
    }

    #[test]
    fn response_holds_only_the_error_key() {
        let response = LoaderError::retrieval("NoSuchKey: missing.js").to_response();
        let object = response.as_object().expect("response should be an object");

        assert_eq!(object.len(), 1);
        assert_eq!(object["error"], "NoSuchKey: missing.js");
    }

    #[test]
    fn kind_survives_construction() {
        let error = LoaderError::load("SyntaxError: unexpected token");
        assert_eq!(error.kind(), LoaderErrorKind::LoadFailure);
        assert_eq!(error.kind().as_str(), "load_failure");
        assert_eq!(error.to_string(), "SyntaxError: unexpected token");
    }
}
