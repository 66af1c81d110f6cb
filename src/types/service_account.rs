use serde::{Deserialize, Serialize};

/// The fields of a service-account JSON key file that the proxy reads.
///
/// Key files carry more (project id, client id, cert URLs); those are ignored.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("account_type", &self.account_type)
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .finish()
    }
}
