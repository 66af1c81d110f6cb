use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Key import error: {0}")]
    KeyImport(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Token exchange failed: {0}")]
    AuthExchange(String),

    #[error("Report query failed: {0}")]
    ReportQuery(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify the error for logging and structured responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::KeyImport(_) => ErrorKind::KeyImport,
            Error::Encoding(_) | Error::Json(_) => ErrorKind::Encoding,
            Error::AuthExchange(_) => ErrorKind::AuthExchange,
            Error::ReportQuery(_) => ErrorKind::ReportQuery,
            Error::Network(_) => ErrorKind::Network,
            Error::Config(_) | Error::Io(_) => ErrorKind::Config,
        }
    }
}

impl From<rsa::pkcs8::Error> for Error {
    fn from(err: rsa::pkcs8::Error) -> Self {
        Error::KeyImport(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::KeyImport(format!("private key is not valid base64: {}", err))
    }
}

#[cfg(feature = "fetch")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("request timed out: {}", err))
        } else {
            Error::Network(err.to_string())
        }
    }
}

/// Error classes surfaced by the analytics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "KEY_IMPORT")]
    KeyImport,
    #[serde(rename = "ENCODING")]
    Encoding,
    #[serde(rename = "AUTH_EXCHANGE")]
    AuthExchange,
    #[serde(rename = "REPORT_QUERY")]
    ReportQuery,
    #[serde(rename = "NETWORK")]
    Network,
    #[serde(rename = "CONFIG")]
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::KeyImport => "KEY_IMPORT",
            ErrorKind::Encoding => "ENCODING",
            ErrorKind::AuthExchange => "AUTH_EXCHANGE",
            ErrorKind::ReportQuery => "REPORT_QUERY",
            ErrorKind::Network => "NETWORK",
            ErrorKind::Config => "CONFIG",
        };
        write!(f, "{}", s)
    }
}
