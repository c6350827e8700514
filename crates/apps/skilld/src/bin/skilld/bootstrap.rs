use super::Args;
use skill_daemon::config::{ConfigError, DaemonConfig, TlsConfig};
use skill_daemon::greeter;
use skill_gate::{SkillEngine, SkillError};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub(super) enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build skill engine: {0}")]
    Engine(#[from] SkillError),
}

pub(super) struct BootstrapContext {
    pub(super) listen: SocketAddr,
    pub(super) engine: Arc<SkillEngine>,
    pub(super) tls: Option<TlsConfig>,
}

pub(super) fn bootstrap(args: Args) -> Result<BootstrapContext, BootstrapError> {
    let config = resolve_config(&args)?;
    let listen = config.validate()?;

    log::info!(
        "skilld: starting listen={} tls={} config={}",
        listen,
        config.tls.is_some(),
        args.config.as_ref().map(|path| path.display().to_string()).unwrap_or_else(|| "-".into())
    );

    let engine = SkillEngine::new(config.skill, greeter::registry())?;
    Ok(BootstrapContext { listen, engine: Arc::new(engine), tls: config.tls })
}

/// Loads the config file when one is given, then lets command-line flags
/// override it.
pub(super) fn resolve_config(args: &Args) -> Result<DaemonConfig, ConfigError> {
    let mut config = match args.config.as_ref() {
        Some(path) => DaemonConfig::from_path(path)?,
        None => DaemonConfig::default(),
    };

    if let Some(listen) = args.listen.as_ref() {
        config.listen = listen.clone();
    }
    if let Some(application_id) = args.application_id.as_ref() {
        config.skill.application_id = application_id.clone();
    }
    if args.ignore_timestamp {
        config.skill.ignore_timestamp = true;
    }
    if args.ignore_cert_verify {
        config.skill.ignore_cert_verify = true;
    }
    if let (Some(cert_chain_path), Some(private_key_path)) =
        (args.tls_cert.as_ref(), args.tls_key.as_ref())
    {
        config.tls = Some(TlsConfig {
            cert_chain_path: cert_chain_path.clone(),
            private_key_path: private_key_path.clone(),
        });
    }
    Ok(config)
}
