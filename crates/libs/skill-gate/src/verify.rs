//! Request authentication: transport-level certificate checks and
//! payload-level identity and freshness checks.
//!
//! The two halves are independent so either can be switched off for local
//! testing without disabling the other.

use crate::cert::{CertificateFetcher, CertificateValidator, ValidatedCertificate};
use crate::config::{
    SkillConfig, CHAIN_URL_HEADER, CHAIN_URL_HOST, CHAIN_URL_PATH_PREFIX, STALENESS_WINDOW_SECS,
};
use crate::error::{SkillError, SkillResult};
use crate::request::Request;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use url::Url;

pub struct RequestAuthenticator {
    config: SkillConfig,
    fetcher: Arc<dyn CertificateFetcher>,
    validator: CertificateValidator,
}

impl RequestAuthenticator {
    pub fn new(config: SkillConfig, fetcher: Arc<dyn CertificateFetcher>) -> Self {
        Self { config, fetcher, validator: CertificateValidator::default() }
    }

    pub fn with_validator(mut self, validator: CertificateValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &SkillConfig {
        &self.config
    }

    /// Proves the request was signed by the platform.
    ///
    /// Returns `Ok(None)` without looking at the headers when certificate
    /// verification is disabled.
    pub async fn verify_transport(
        &self,
        headers: &[(String, String)],
    ) -> SkillResult<Option<ValidatedCertificate>> {
        if self.config.ignore_cert_verify {
            return Ok(None);
        }

        let raw_url = header_value(headers, CHAIN_URL_HEADER)
            .filter(|value| !value.is_empty())
            .ok_or(SkillError::ChainUrlMissing)?;
        let chain_url = check_chain_url(raw_url)?;
        let pem = self.fetcher.fetch(&chain_url).await?;
        let validated = self.validator.validate(&pem)?;
        log::debug!("verify: signer certificate accepted subject={}", validated.subject);
        Ok(Some(validated))
    }

    pub fn verify_payload(&self, request: &Request) -> SkillResult<()> {
        self.verify_application_id(request)?;
        self.verify_timestamp(request)
    }

    pub fn verify_application_id(&self, request: &Request) -> SkillResult<()> {
        if self.config.application_id.is_empty() {
            return Err(SkillError::EmptyApplicationId);
        }
        let request_application_id = request.application_id();
        if request_application_id.is_empty() {
            return Err(SkillError::EmptyRequestApplicationId);
        }
        if self.config.application_id != request_application_id {
            log::warn!(
                "verify: application id mismatch expected={} got={}",
                self.config.application_id,
                request_application_id
            );
            return Err(SkillError::MismatchedApplicationId);
        }
        Ok(())
    }

    pub fn verify_timestamp(&self, request: &Request) -> SkillResult<()> {
        self.verify_timestamp_at(request, OffsetDateTime::now_utc())
    }

    /// Freshness check against a fixed clock. Requests younger than the
    /// staleness window pass; timestamps ahead of `now` count as fresh.
    pub fn verify_timestamp_at(&self, request: &Request, now: OffsetDateTime) -> SkillResult<()> {
        if self.config.ignore_timestamp {
            return Ok(());
        }
        let issued =
            OffsetDateTime::parse(request.timestamp(), &Rfc3339).map_err(SkillError::TimestampParse)?;
        let elapsed = now - issued;
        if elapsed < time::Duration::seconds(STALENESS_WINDOW_SECS) {
            return Ok(());
        }
        log::warn!(
            "verify: stale request timestamp={} age_secs={}",
            request.timestamp(),
            elapsed.whole_seconds()
        );
        Err(SkillError::StaleTimestamp)
    }
}

/// Checks the shape of a chain URL before anything is fetched from it.
///
/// Judged on the parsed URL, not the raw string: scheme and host compare
/// case-insensitively, an explicit `:443` is the default port and passes,
/// and dot segments are resolved, so `/echo.api/../evil` is judged by its
/// normalised path. A byte-exact comparison of the raw host would reject
/// `S3.AMAZONAWS.COM` and `s3.amazonaws.com:443`; both name the same
/// bucket endpoint, so they are accepted here.
pub fn check_chain_url(raw: &str) -> SkillResult<Url> {
    let url = Url::parse(raw).map_err(|err| SkillError::bad_chain_url(err.to_string()))?;
    if url.scheme() != "https" {
        return Err(SkillError::bad_chain_url(format!("scheme {} is not https", url.scheme())));
    }
    if url.host_str() != Some(CHAIN_URL_HOST) {
        return Err(SkillError::bad_chain_url(format!(
            "host {} is not {}",
            url.host_str().unwrap_or_default(),
            CHAIN_URL_HOST
        )));
    }
    if url.port().is_some() {
        return Err(SkillError::bad_chain_url("explicit non-default port"));
    }
    if !url.path().starts_with(CHAIN_URL_PATH_PREFIX) {
        return Err(SkillError::bad_chain_url(format!(
            "path does not start with {}",
            CHAIN_URL_PATH_PREFIX
        )));
    }
    Ok(url)
}

/// Case-insensitive header lookup.
pub fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(header, _)| header.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::datetime;

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CertificateFetcher for CountingFetcher {
        async fn fetch(&self, _url: &Url) -> SkillResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SkillError::CertRead { reason: "offline".into() })
        }
    }

    fn authenticator(config: SkillConfig) -> (RequestAuthenticator, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::default());
        (RequestAuthenticator::new(config, fetcher.clone()), fetcher)
    }

    fn request_with(application_id: &str, timestamp: &str) -> Request {
        let mut request = Request::default();
        request.session.application.application_id = application_id.to_string();
        request.request.timestamp = timestamp.to_string();
        request
    }

    fn chain_header(url: &str) -> Vec<(String, String)> {
        vec![(CHAIN_URL_HEADER.to_string(), url.to_string())]
    }

    #[test]
    fn accepts_well_formed_chain_urls() {
        for raw in [
            "https://s3.amazonaws.com/echo.api/echo-api-cert.pem",
            "https://s3.amazonaws.com/echo.api/echo-api-cert-4.pem",
        ] {
            check_chain_url(raw).unwrap_or_else(|err| panic!("{raw}: {err}"));
        }
    }

    // Looser than a raw-string host comparison: these spellings normalise
    // to the canonical endpoint and are accepted on purpose.
    #[test]
    fn normalised_spellings_of_the_endpoint_are_accepted() {
        for (raw, normalised) in [
            (
                "HTTPS://s3.amazonaws.com/echo.api/echo-api-cert.pem",
                "https://s3.amazonaws.com/echo.api/echo-api-cert.pem",
            ),
            (
                "https://S3.AMAZONAWS.COM/echo.api/echo-api-cert.pem",
                "https://s3.amazonaws.com/echo.api/echo-api-cert.pem",
            ),
            (
                "https://s3.amazonaws.com:443/echo.api/echo-api-cert.pem",
                "https://s3.amazonaws.com/echo.api/echo-api-cert.pem",
            ),
            (
                "https://s3.amazonaws.com/echo.api/../echo.api/echo-api-cert.pem",
                "https://s3.amazonaws.com/echo.api/echo-api-cert.pem",
            ),
        ] {
            let url = check_chain_url(raw).unwrap_or_else(|err| panic!("{raw}: {err}"));
            assert_eq!(url.as_str(), normalised);
        }
    }

    #[test]
    fn rejects_malformed_chain_urls() {
        for raw in [
            "http://s3.amazonaws.com/echo.api/echo-api-cert.pem",
            "https://notamazon.com/echo.api/echo-api-cert.pem",
            "https://s3.amazonaws.com.evil.example/echo.api/echo-api-cert.pem",
            "https://s3.amazonaws.com/EcHo.aPi/echo-api-cert.pem",
            "https://s3.amazonaws.com/invalid.path/echo-api-cert.pem",
            "https://s3.amazonaws.com/echo.api/../invalid.path/echo-api-cert.pem",
            "https://s3.amazonaws.com:563/echo.api/echo-api-cert.pem",
            "not a url",
        ] {
            assert!(
                matches!(check_chain_url(raw), Err(SkillError::BadChainUrl { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn ignore_cert_verify_skips_transport_checks() {
        let (auth, fetcher) =
            authenticator(SkillConfig::new("app").with_ignore_cert_verify(true));
        assert_eq!(auth.verify_transport(&[]).await.expect("skipped"), None);
        let bad = chain_header("http://example.com/cert.pem");
        assert_eq!(auth.verify_transport(&bad).await.expect("skipped"), None);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_or_empty_chain_header_is_rejected() {
        let (auth, fetcher) = authenticator(SkillConfig::new("app"));
        assert!(matches!(auth.verify_transport(&[]).await, Err(SkillError::ChainUrlMissing)));
        let empty = chain_header("");
        assert!(matches!(auth.verify_transport(&empty).await, Err(SkillError::ChainUrlMissing)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_chain_url_never_reaches_the_fetcher() {
        let (auth, fetcher) = authenticator(SkillConfig::new("app"));
        let headers = chain_header("https://evil.example.com/echo.api/cert.pem");
        assert!(matches!(
            auth.verify_transport(&headers).await,
            Err(SkillError::BadChainUrl { .. })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_errors_propagate_unchanged() {
        let (auth, fetcher) = authenticator(SkillConfig::new("app"));
        let headers = vec![(
            "signaturecertchainurl".to_string(),
            "https://s3.amazonaws.com/echo.api/echo-api-cert.pem".to_string(),
        )];
        assert!(matches!(auth.verify_transport(&headers).await, Err(SkillError::CertRead { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn application_id_failures_are_distinct() {
        let (auth, _) = authenticator(SkillConfig::new("").with_ignore_timestamp(true));
        assert!(matches!(
            auth.verify_application_id(&request_with("app", "")),
            Err(SkillError::EmptyApplicationId)
        ));

        let (auth, _) = authenticator(SkillConfig::new("app").with_ignore_timestamp(true));
        assert!(matches!(
            auth.verify_application_id(&request_with("", "")),
            Err(SkillError::EmptyRequestApplicationId)
        ));
        assert!(matches!(
            auth.verify_application_id(&request_with("other", "")),
            Err(SkillError::MismatchedApplicationId)
        ));
        auth.verify_application_id(&request_with("app", "")).expect("same id");
    }

    #[test]
    fn context_application_id_does_not_stand_in_for_session_copy() {
        let (auth, _) = authenticator(SkillConfig::new("app").with_ignore_timestamp(true));
        let mut request = request_with("", "");
        request.context.system.application.application_id = "app".to_string();
        assert!(matches!(
            auth.verify_application_id(&request),
            Err(SkillError::EmptyRequestApplicationId)
        ));
    }

    #[test]
    fn matching_identity_with_ignored_timestamp_always_passes() {
        let (auth, _) = authenticator(SkillConfig::new("app").with_ignore_timestamp(true));
        for timestamp in ["", "garbage", "1999-01-01T00:00:00Z", "2016-10-27T21:06:28Z"] {
            auth.verify_payload(&request_with("app", timestamp)).expect(timestamp);
        }
    }

    #[test]
    fn timestamp_window_is_150_seconds() {
        let (auth, _) = authenticator(SkillConfig::new("app"));
        let now = datetime!(2026-10-16 12:00:00 UTC);

        auth.verify_timestamp_at(&request_with("app", "2026-10-16T11:57:31Z"), now)
            .expect("149s old");
        assert!(matches!(
            auth.verify_timestamp_at(&request_with("app", "2026-10-16T11:57:30Z"), now),
            Err(SkillError::StaleTimestamp)
        ));
        assert!(matches!(
            auth.verify_timestamp_at(&request_with("app", "2026-10-16T11:50:00Z"), now),
            Err(SkillError::StaleTimestamp)
        ));
        auth.verify_timestamp_at(&request_with("app", "2026-10-16T12:01:00Z"), now)
            .expect("future timestamps are fresh");
    }

    #[test]
    fn timestamp_offsets_are_honoured() {
        let (auth, _) = authenticator(SkillConfig::new("app"));
        let now = datetime!(2026-10-16 12:00:00 UTC);
        auth.verify_timestamp_at(&request_with("app", "2026-10-16T14:59:00+03:00"), now)
            .expect("same instant in another offset");
    }

    #[test]
    fn unparsable_timestamp_is_a_parse_error() {
        let (auth, _) = authenticator(SkillConfig::new("app"));
        for timestamp in ["", "yesterday", "2026-10-16T12:00:00"] {
            assert!(matches!(
                auth.verify_timestamp(&request_with("app", timestamp)),
                Err(SkillError::TimestampParse(_))
            ));
        }
    }

    #[test]
    fn header_lookup_ignores_case_and_whitespace() {
        let headers = vec![("Content-Type".to_string(), " application/json ".to_string())];
        assert_eq!(header_value(&headers, "content-type"), Some("application/json"));
        assert_eq!(header_value(&headers, "accept"), None);
    }
}
