//! Credential sources.
//!
//! The handler asks a [`CredentialSource`] for the service credential on every
//! invocation, so rotated keys are picked up without a restart and nothing is
//! held between requests.

use std::path::{Path, PathBuf};

use crate::credential::ServiceCredential;
use crate::error::Error;
use crate::types::service_account::ServiceAccountKey;

pub const ENV_CLIENT_EMAIL: &str = "GA_CLIENT_EMAIL";
pub const ENV_PRIVATE_KEY: &str = "GA_PRIVATE_KEY";

/// Produce the service credential used to sign assertions.
pub trait CredentialSource: Send + Sync {
    /// Load the credential. Called once per handled request.
    fn load(&self) -> Result<ServiceCredential, Error>;

    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Whether anything is set up for this source to read. A chain only moves
    /// past sources that report `false`.
    fn is_configured(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// EnvCredentialSource
// ---------------------------------------------------------------------------

/// Reads the issuer and PEM key from environment variables.
///
/// The key is expected with escaped newlines, as deployment dashboards store
/// it; real newlines work too.
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    email_var: String,
    key_var: String,
}

impl EnvCredentialSource {
    pub fn new() -> Self {
        Self::with_vars(ENV_CLIENT_EMAIL, ENV_PRIVATE_KEY)
    }

    pub fn with_vars(email_var: &str, key_var: &str) -> Self {
        Self {
            email_var: email_var.to_string(),
            key_var: key_var.to_string(),
        }
    }

    fn required(name: &str) -> Result<String, Error> {
        let value =
            std::env::var(name).map_err(|_| Error::Config(format!("{} is required", name)))?;
        if value.trim().is_empty() {
            return Err(Error::Config(format!("{} is empty", name)));
        }
        Ok(value)
    }
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for EnvCredentialSource {
    fn load(&self) -> Result<ServiceCredential, Error> {
        let issuer = Self::required(&self.email_var)?;
        let key = Self::required(&self.key_var)?;
        Ok(ServiceCredential::new(issuer.trim(), key))
    }

    fn name(&self) -> &'static str {
        "env"
    }

    fn is_configured(&self) -> bool {
        std::env::var_os(&self.email_var).is_some() || std::env::var_os(&self.key_var).is_some()
    }
}

// ---------------------------------------------------------------------------
// ServiceAccountFileSource
// ---------------------------------------------------------------------------

/// Reads a service-account JSON key file from disk.
#[derive(Debug, Clone)]
pub struct ServiceAccountFileSource {
    path: PathBuf,
}

impl ServiceAccountFileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the whole key document.
    pub fn load_key(&self) -> Result<ServiceAccountKey, Error> {
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", self.path.display(), e))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&data)?;
        if let Some(kind) = key.account_type.as_deref() {
            if kind != "service_account" {
                return Err(Error::Config(format!(
                    "{} holds a '{}' credential, expected service_account",
                    self.path.display(),
                    kind
                )));
            }
        }
        Ok(key)
    }
}

impl CredentialSource for ServiceAccountFileSource {
    fn load(&self) -> Result<ServiceCredential, Error> {
        let key = self.load_key()?;
        Ok(ServiceCredential::new(key.client_email, key.private_key))
    }

    fn name(&self) -> &'static str {
        "service-account-file"
    }

    fn is_configured(&self) -> bool {
        self.path.exists()
    }
}

// ---------------------------------------------------------------------------
// StaticCredentialSource
// ---------------------------------------------------------------------------

/// Hands out a credential supplied at construction time.
#[derive(Debug, Clone)]
pub struct StaticCredentialSource {
    credential: ServiceCredential,
}

impl StaticCredentialSource {
    pub fn new(credential: ServiceCredential) -> Self {
        Self { credential }
    }
}

impl CredentialSource for StaticCredentialSource {
    fn load(&self) -> Result<ServiceCredential, Error> {
        Ok(self.credential.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

// ---------------------------------------------------------------------------
// ChainCredentialSource
// ---------------------------------------------------------------------------

/// Loads from the first configured source in order.
///
/// A configured source that fails to load ends the chain with its error, so a
/// broken key file is reported rather than masked by a later source. When no
/// source is configured, the last one explains what is missing.
pub struct ChainCredentialSource {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl ChainCredentialSource {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }
}

impl CredentialSource for ChainCredentialSource {
    fn load(&self) -> Result<ServiceCredential, Error> {
        for source in &self.sources {
            if source.is_configured() {
                return source.load();
            }
            tracing::debug!(source = source.name(), "credential source not configured, skipped");
        }
        match self.sources.last() {
            Some(source) => source.load(),
            None => Err(Error::Config("No credential sources configured".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "chain"
    }

    fn is_configured(&self) -> bool {
        self.sources.iter().any(|s| s.is_configured())
    }
}
