use serde::Deserialize;
use std::time::Duration;

/// Header carrying the certificate chain URL on every signed request.
pub const CHAIN_URL_HEADER: &str = "SignatureCertChainUrl";
/// Only host allowed to serve certificate chains.
pub const CHAIN_URL_HOST: &str = "s3.amazonaws.com";
/// Required path prefix of the chain URL after normalisation.
pub const CHAIN_URL_PATH_PREFIX: &str = "/echo.api/";
/// DNS name the signing leaf certificate must be bound to.
pub const SIGNER_HOSTNAME: &str = "echo-api.amazon.com";
/// Maximum age of a request timestamp before it is treated as a replay.
pub const STALENESS_WINDOW_SECS: i64 = 150;

pub const DEFAULT_CERT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Immutable per-application settings handed to the engine at construction.
///
/// `ignore_cert_verify` turns off transport authenticity entirely and must
/// only ever be set for local testing: with it on, anyone who can reach the
/// endpoint can forge requests.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    pub application_id: String,
    pub ignore_timestamp: bool,
    pub ignore_cert_verify: bool,
    pub cert_fetch_timeout_secs: u64,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            ignore_timestamp: false,
            ignore_cert_verify: false,
            cert_fetch_timeout_secs: DEFAULT_CERT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl SkillConfig {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self { application_id: application_id.into(), ..Self::default() }
    }

    pub fn with_ignore_timestamp(mut self, ignore: bool) -> Self {
        self.ignore_timestamp = ignore;
        self
    }

    pub fn with_ignore_cert_verify(mut self, ignore: bool) -> Self {
        self.ignore_cert_verify = ignore;
        self
    }

    pub fn with_cert_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.cert_fetch_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn cert_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.cert_fetch_timeout_secs.max(1))
    }
}
