//! Shared fixtures for unit tests.

use std::sync::OnceLock;

use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;

use crate::credential::ServiceCredential;

pub const TEST_ISSUER: &str = "newsroom-reader@newsroom-cms.iam.gserviceaccount.com";

static TEST_KEY: OnceLock<(RsaPrivateKey, String)> = OnceLock::new();

/// One RSA key per test binary; generation is slow in debug builds.
pub fn test_key() -> &'static (RsaPrivateKey, String) {
    TEST_KEY.get_or_init(|| {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate RSA key");
        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("encode PKCS#8 PEM")
            .to_string();
        (key, pem)
    })
}

/// PEM with its line breaks written as literal `\n`, as env vars carry it.
pub fn escaped_pem(pem: &str) -> String {
    pem.replace('\n', "\\n")
}

pub fn test_credential() -> ServiceCredential {
    let (_, pem) = test_key();
    ServiceCredential::new(TEST_ISSUER, escaped_pem(pem))
}
