use crate::cert::{CertificateFetcher, HttpCertificateFetcher};
use crate::config::SkillConfig;
use crate::dispatch::{dispatch, HookRegistry};
use crate::error::{SkillError, SkillResult};
use crate::request::Request;
use crate::response::Response;
use crate::verify::RequestAuthenticator;
use std::sync::Arc;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Transport-neutral reply produced by [`SkillEngine::handle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl HttpReply {
    fn json(body: Vec<u8>) -> Self {
        Self { status: 200, content_type: JSON_CONTENT_TYPE, body }
    }

    fn error(status: u16, message: &str) -> Self {
        Self { status, content_type: TEXT_CONTENT_TYPE, body: message.as_bytes().to_vec() }
    }

    fn from_error(err: &SkillError) -> Self {
        Self::error(err.http_status(), &err.to_string())
    }
}

/// Single entry point for the transport: authentication, decoding and
/// dispatch for one application.
///
/// Holds no per-request state, so one instance is shared across all
/// connections behind an `Arc`.
pub struct SkillEngine {
    authenticator: RequestAuthenticator,
    registry: HookRegistry,
}

impl SkillEngine {
    /// Engine that downloads signing chains over HTTPS.
    pub fn new(config: SkillConfig, registry: HookRegistry) -> SkillResult<Self> {
        let fetcher = HttpCertificateFetcher::new(config.cert_fetch_timeout())?;
        Ok(Self::with_fetcher(config, registry, Arc::new(fetcher)))
    }

    pub fn with_fetcher(
        config: SkillConfig,
        registry: HookRegistry,
        fetcher: Arc<dyn CertificateFetcher>,
    ) -> Self {
        if config.ignore_cert_verify {
            log::warn!(
                "engine: certificate verification is DISABLED for application {}; \
                 any caller can forge requests",
                config.application_id
            );
        }
        if config.ignore_timestamp {
            log::warn!(
                "engine: timestamp checks are disabled for application {}; replays are accepted",
                config.application_id
            );
        }
        log::info!(
            "engine: ready application={} hooks={:?}",
            config.application_id,
            registry.registered_points()
        );
        Self { authenticator: RequestAuthenticator::new(config, fetcher), registry }
    }

    pub fn config(&self) -> &SkillConfig {
        self.authenticator.config()
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    pub fn authenticator(&self) -> &RequestAuthenticator {
        &self.authenticator
    }

    /// Payload-level checks followed by dispatch on a decoded request.
    pub fn process(&self, request: &Request) -> SkillResult<Response> {
        self.authenticator.verify_payload(request)?;
        let mut response = Response::new();
        let ran = dispatch(&self.registry, request, &mut response)?;
        log::debug!(
            "engine: processed request_id={} type={} hooks={:?}",
            request.request.request_id,
            request.request.request_type,
            ran
        );
        Ok(response)
    }

    /// Full inbound flow for one HTTP request.
    pub async fn handle(&self, method: &str, headers: &[(String, String)], body: &[u8]) -> HttpReply {
        match self.handle_request(method, headers, body).await {
            Ok(response) => match response.to_json_vec() {
                Ok(body) => HttpReply::json(body),
                Err(err) => {
                    log::error!("engine: response encoding failed err={}", err);
                    HttpReply::error(500, "response encoding failed")
                }
            },
            Err(err) => {
                if err.is_authentication_failure() {
                    log::warn!("engine: rejected request err={}", err);
                } else {
                    log::debug!("engine: request failed err={}", err);
                }
                HttpReply::from_error(&err)
            }
        }
    }

    async fn handle_request(
        &self,
        method: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> SkillResult<Response> {
        if !method.eq_ignore_ascii_case("POST") {
            return Err(SkillError::MethodNotAllowed);
        }
        self.authenticator.verify_transport(headers).await?;
        let request = Request::from_json(body)?;
        self.process(&request)
    }
}
