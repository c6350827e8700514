use crate::config::SIGNER_HOSTNAME;
use crate::error::{SkillError, SkillResult};
use rustls::client::danger::ServerCertVerifier;
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::RootCertStore;
use rustls_pemfile::Item;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

/// Leaf certificate that passed every validation step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedCertificate {
    pub leaf_der: Vec<u8>,
    pub subject: String,
    pub dns_names: Vec<String>,
    pub not_before: i64,
    pub not_after: i64,
}

/// Validates a downloaded signing chain.
///
/// The certificates following the leaf in the PEM document are accepted as
/// trust anchors as presented. No fixed root store is consulted.
#[derive(Clone, Debug)]
pub struct CertificateValidator {
    hostname: String,
}

impl Default for CertificateValidator {
    fn default() -> Self {
        Self::new(SIGNER_HOSTNAME)
    }
}

impl CertificateValidator {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self { hostname: hostname.into() }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn validate(&self, pem: &[u8]) -> SkillResult<ValidatedCertificate> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        self.validate_at(pem, now)
    }

    /// Same as [`validate`](Self::validate) against a fixed clock, in unix
    /// seconds.
    pub fn validate_at(&self, pem: &[u8], now_secs: u64) -> SkillResult<ValidatedCertificate> {
        let (leaf, remaining) = decode_first_block(pem)?;

        let (_rest, cert) = X509Certificate::from_der(leaf.as_ref())
            .map_err(|err| SkillError::CertParse { reason: err.to_string() })?;

        let validity = cert.validity();
        let not_before = validity.not_before.timestamp();
        let not_after = validity.not_after.timestamp();
        let now = i64::try_from(now_secs).unwrap_or(i64::MAX);
        if now < not_before || now > not_after {
            log::warn!(
                "cert: outside validity window now={} not_before={} not_after={}",
                now,
                not_before,
                not_after
            );
            return Err(SkillError::CertDate);
        }

        let roots = intermediate_pool(remaining);
        self.verify_leaf(&leaf, roots, now_secs)?;

        Ok(ValidatedCertificate {
            leaf_der: leaf.as_ref().to_vec(),
            subject: cert.subject().to_string(),
            dns_names: subject_dns_names(&cert),
            not_before,
            not_after,
        })
    }

    fn verify_leaf(
        &self,
        leaf: &CertificateDer<'_>,
        roots: RootCertStore,
        now_secs: u64,
    ) -> SkillResult<()> {
        let server_name = ServerName::try_from(self.hostname.as_str())
            .map_err(|err| SkillError::CertVerify { reason: err.to_string() })?;
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let verifier = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|err| SkillError::CertVerify { reason: err.to_string() })?;
        let now = UnixTime::since_unix_epoch(Duration::from_secs(now_secs));
        verifier.verify_server_cert(leaf, &[], &server_name, &[], now).map_err(|err| {
            log::warn!("cert: chain verification failed host={} err={}", self.hostname, err);
            SkillError::CertVerify { reason: err.to_string() }
        })?;
        Ok(())
    }
}

fn decode_first_block(pem: &[u8]) -> SkillResult<(CertificateDer<'static>, &[u8])> {
    let (item, remaining) = match rustls_pemfile::read_one_from_slice(pem) {
        Ok(Some(block)) => block,
        Ok(None) => return Err(SkillError::PemParse),
        Err(err) => {
            log::debug!("cert: pem decode failed err={:?}", err);
            return Err(SkillError::PemParse);
        }
    };
    match item {
        Item::X509Certificate(der) => Ok((der, remaining)),
        _ => Err(SkillError::CertParse {
            reason: "first pem block is not a certificate".to_string(),
        }),
    }
}

// Unparsable entries are skipped, mirroring a lenient pool append.
fn intermediate_pool(mut remaining: &[u8]) -> RootCertStore {
    let certificates = rustls_pemfile::certs(&mut remaining).filter_map(Result::ok);
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certificates);
    log::debug!("cert: intermediate pool added={} ignored={}", added, ignored);
    roots
}

fn subject_dns_names(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut names = Vec::new();
    for extension in cert.extensions() {
        if let ParsedExtension::SubjectAlternativeName(subject_alt_name) =
            extension.parsed_extension()
        {
            for name in &subject_alt_name.general_names {
                if let GeneralName::DNSName(value) = name {
                    let value = value.trim();
                    if !value.is_empty() {
                        names.push(value.to_string());
                    }
                }
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER_CHAIN: &[u8] = include_bytes!("../../tests/fixtures/signer_chain.pem");
    const WRONG_HOST_CHAIN: &[u8] = include_bytes!("../../tests/fixtures/wrong_host_chain.pem");
    const UNTRUSTED_CHAIN: &[u8] = include_bytes!("../../tests/fixtures/untrusted_chain.pem");
    const LEAF_ONLY: &[u8] = include_bytes!("../../tests/fixtures/leaf_only.pem");

    // 2026-06-01T00:00:00Z, inside every fixture's validity window.
    const NOW: u64 = 1_780_272_000;
    // 2025-01-01T00:00:00Z and 2125-01-01T00:00:00Z.
    const LEAF_NOT_BEFORE: u64 = 1_735_689_600;
    const LEAF_NOT_AFTER: u64 = 4_891_363_200;

    #[test]
    fn accepts_chain_bound_to_signer_hostname() {
        let validated =
            CertificateValidator::default().validate_at(SIGNER_CHAIN, NOW).expect("valid chain");
        assert_eq!(validated.dns_names, vec!["echo-api.amazon.com".to_string()]);
        assert_eq!(validated.not_before, LEAF_NOT_BEFORE as i64);
        assert_eq!(validated.not_after, LEAF_NOT_AFTER as i64);
        assert!(validated.subject.contains("echo-api.amazon.com"));
        assert!(!validated.leaf_der.is_empty());
    }

    #[test]
    fn validity_bounds_are_inclusive_at_second_granularity() {
        let validator = CertificateValidator::default();
        validator.validate_at(SIGNER_CHAIN, LEAF_NOT_BEFORE).expect("not_before is inside");
        assert!(matches!(
            validator.validate_at(SIGNER_CHAIN, LEAF_NOT_BEFORE - 1),
            Err(SkillError::CertDate)
        ));
        assert!(matches!(
            validator.validate_at(SIGNER_CHAIN, LEAF_NOT_AFTER + 1),
            Err(SkillError::CertDate)
        ));
    }

    #[test]
    fn rejects_leaf_for_another_hostname() {
        let err = CertificateValidator::default()
            .validate_at(WRONG_HOST_CHAIN, NOW)
            .expect_err("hostname mismatch");
        assert!(matches!(err, SkillError::CertVerify { .. }), "{err}");
    }

    #[test]
    fn rejects_leaf_not_issued_by_presented_certificates() {
        let err = CertificateValidator::default()
            .validate_at(UNTRUSTED_CHAIN, NOW)
            .expect_err("unrelated issuer");
        assert!(matches!(err, SkillError::CertVerify { .. }), "{err}");
    }

    #[test]
    fn rejects_leaf_without_any_presented_issuer() {
        let err =
            CertificateValidator::default().validate_at(LEAF_ONLY, NOW).expect_err("no anchors");
        assert!(matches!(err, SkillError::CertVerify { .. }), "{err}");
    }

    #[test]
    fn presented_issuer_is_trusted_without_a_fixed_root_store() {
        // The signing CA in the fixture is self-issued and unknown to any
        // public root program, yet the chain validates because presented
        // certificates act as anchors.
        assert!(CertificateValidator::default().validate_at(SIGNER_CHAIN, NOW).is_ok());
    }

    #[test]
    fn rejects_input_without_pem_blocks() {
        let err = CertificateValidator::default()
            .validate_at(b"not a certificate", NOW)
            .expect_err("no pem");
        assert!(matches!(err, SkillError::PemParse));
        assert!(matches!(
            CertificateValidator::default().validate_at(b"", NOW),
            Err(SkillError::PemParse)
        ));
    }

    #[test]
    fn rejects_garbage_inside_certificate_block() {
        let pem = b"-----BEGIN CERTIFICATE-----\nAAECAwQFBgcICQ==\n-----END CERTIFICATE-----\n";
        let err = CertificateValidator::default().validate_at(pem, NOW).expect_err("bad der");
        assert!(matches!(err, SkillError::CertParse { .. }), "{err}");
    }

    #[test]
    fn custom_hostname_changes_binding() {
        let validator = CertificateValidator::new("not-the-signer.example.com");
        assert_eq!(validator.hostname(), "not-the-signer.example.com");
        validator.validate_at(WRONG_HOST_CHAIN, NOW).expect("bound to custom host");
        assert!(validator.validate_at(SIGNER_CHAIN, NOW).is_err());
    }
}
