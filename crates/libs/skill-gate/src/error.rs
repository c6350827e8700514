use thiserror::Error;

/// Boxed error returned by integrator hooks. Opaque to the engine.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type SkillResult<T> = Result<T, SkillError>;

/// Every way a webhook request can be rejected.
///
/// Checks are fail-fast: the first variant produced aborts the request and
/// its `Display` text becomes the plain-text HTTP body.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SkillError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("unable to find certificate chain header")]
    ChainUrlMissing,

    #[error("certificate chain url is not valid: {reason}")]
    BadChainUrl { reason: String },

    #[error("certificate could not be downloaded: {reason}")]
    CertDownload { reason: String },

    #[error("could not read certificate content: {reason}")]
    CertRead { reason: String },

    #[error("failed to parse certificate pem")]
    PemParse,

    #[error("failed to parse certificate: {reason}")]
    CertParse { reason: String },

    #[error("certificate is not valid at the current time")]
    CertDate,

    #[error("certificate verification failed: {reason}")]
    CertVerify { reason: String },

    #[error("certificate http client could not be built")]
    HttpClient(#[source] reqwest::Error),

    #[error("{0}")]
    PayloadDecode(#[source] serde_json::Error),

    #[error("application id should not be empty")]
    EmptyApplicationId,

    #[error("request application id should not be empty")]
    EmptyRequestApplicationId,

    #[error("application id and request application id are not the same")]
    MismatchedApplicationId,

    #[error("invalid request timestamp: {0}")]
    TimestampParse(#[source] time::error::Parse),

    #[error("request timestamp is outside the accepted window")]
    StaleTimestamp,

    #[error("no slot found: {name}")]
    SlotNotFound { name: String },

    #[error("{0}")]
    Handler(#[source] HookError),
}

impl SkillError {
    pub fn bad_chain_url(reason: impl Into<String>) -> Self {
        Self::BadChainUrl { reason: reason.into() }
    }

    /// HTTP status the transport should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MethodNotAllowed => 405,
            _ => 400,
        }
    }

    /// Returns `true` for errors raised while authenticating the request,
    /// as opposed to decoding it or running hooks.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::ChainUrlMissing
                | Self::BadChainUrl { .. }
                | Self::CertDownload { .. }
                | Self::CertRead { .. }
                | Self::PemParse
                | Self::CertParse { .. }
                | Self::CertDate
                | Self::CertVerify { .. }
                | Self::EmptyApplicationId
                | Self::EmptyRequestApplicationId
                | Self::MismatchedApplicationId
                | Self::TimestampParse(_)
                | Self::StaleTimestamp
        )
    }
}
