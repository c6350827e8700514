//! Signing certificate retrieval and validation.

mod fetch;
mod validate;

pub use fetch::{CertificateFetcher, HttpCertificateFetcher};
pub use validate::{CertificateValidator, ValidatedCertificate};
