use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body of the analytics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_omits_error() {
        let env = ResponseEnvelope::success(json!({"rows": []}));
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"success":true,"data":{"rows":[]}}"#);
    }

    #[test]
    fn test_failure_omits_data() {
        let env = ResponseEnvelope::failure("boom");
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"boom"}"#);
    }

    #[test]
    fn test_deserialize_minimal() {
        let env: ResponseEnvelope = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(env.data.is_none());
        assert!(env.error.is_none());
    }
}
