//! Request verification and lifecycle dispatch for voice skill webhooks.
//!
//! The platform posts signed JSON to an HTTPS endpoint. Before any
//! integrator code runs, a request must:
//!
//! - point at a certificate chain hosted on the platform's bucket
//!   ([`verify::check_chain_url`]),
//! - carry a signing certificate that is currently valid and bound to the
//!   signer hostname ([`cert::CertificateValidator`]),
//! - name the configured application,
//! - be younger than the staleness window.
//!
//! Accepted requests are routed by [`dispatch::dispatch`] to at most two
//! hooks: the session-started hook for new sessions, then one hook chosen
//! by request type.
//!
//! ```no_run
//! use skill_gate::{HookRegistry, SkillConfig, SkillEngine};
//!
//! let registry = HookRegistry::new().on_intent(|response, request| {
//!     let color = request.slot("Color")?;
//!     response.output_speech(format!("Your favorite color is {}", color.value));
//!     Ok(())
//! });
//! let _engine = SkillEngine::new(SkillConfig::new("amzn1.ask.skill.aaa"), registry)?;
//! # Ok::<(), skill_gate::SkillError>(())
//! ```

pub mod cert;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod verify;

pub use cert::{CertificateFetcher, CertificateValidator, HttpCertificateFetcher, ValidatedCertificate};
pub use config::SkillConfig;
pub use dispatch::{dispatch, HookRegistry, HookResult, LifecycleHook, LifecyclePoint};
pub use engine::{HttpReply, SkillEngine};
pub use error::{HookError, SkillError, SkillResult};
pub use request::{Intent, Request, RequestType, Slot};
pub use response::Response;
pub use verify::RequestAuthenticator;
