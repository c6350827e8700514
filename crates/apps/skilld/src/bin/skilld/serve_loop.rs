use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use rustls_pemfile::Item;
use skill_daemon::config::TlsConfig;
use skill_gate::http::{self, Completeness};
use skill_gate::SkillEngine;
use std::fs::File;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

pub(super) const MAX_REQUEST_BYTES: usize = 1024 * 1024;
pub(super) const READ_TIMEOUT: Duration = Duration::from_secs(30);

pub(super) async fn run_serve_loop(
    addr: SocketAddr,
    engine: Arc<SkillEngine>,
    tls: Option<TlsConfig>,
) -> io::Result<()> {
    match tls {
        Some(config) => run_tls_serve_loop(addr, engine, config).await,
        None => run_plain_serve_loop(addr, engine).await,
    }
}

async fn run_plain_serve_loop(addr: SocketAddr, engine: Arc<SkillEngine>) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("skilld: listening on http://{}", addr);

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                log::warn!("skilld: accept failed err={}", err);
                continue;
            }
        };
        let engine = engine.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer_addr, engine.as_ref()).await;
        });
    }
}

async fn run_tls_serve_loop(
    addr: SocketAddr,
    engine: Arc<SkillEngine>,
    config: TlsConfig,
) -> io::Result<()> {
    let acceptor = TlsAcceptor::from(build_tls_server_config(&config)?);
    let listener = TcpListener::bind(addr).await?;
    log::info!("skilld: listening on https://{}", addr);

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                log::warn!("skilld: accept failed err={}", err);
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let engine = engine.clone();
        tokio::spawn(async move {
            match acceptor.accept(stream).await {
                Ok(tls_stream) => handle_connection(tls_stream, peer_addr, engine.as_ref()).await,
                Err(err) => {
                    log::warn!("skilld: tls handshake failed peer={} err={}", peer_addr, err);
                }
            }
        });
    }
}

/// Serves exactly one request on `stream`, then closes it.
pub(super) async fn handle_connection<S>(mut stream: S, peer_addr: SocketAddr, engine: &SkillEngine)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();
    loop {
        let mut chunk = [0_u8; 4096];
        let read = match tokio::time::timeout(READ_TIMEOUT, stream.read(&mut chunk)).await {
            Ok(Ok(read)) => read,
            Ok(Err(err)) => {
                log::warn!("skilld: read error peer={} err={}", peer_addr, err);
                return;
            }
            Err(_) => {
                log::warn!("skilld: read timed out peer={}", peer_addr);
                return;
            }
        };
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if buffer.len() > MAX_REQUEST_BYTES {
            log::warn!("skilld: request too large peer={} bytes={}", peer_addr, buffer.len());
            let response = http::build_error_response(400, "request too large");
            let _ = stream.write_all(&response).await;
            let _ = stream.shutdown().await;
            return;
        }
        if http::request_completeness(&buffer) == Completeness::Complete {
            break;
        }
    }

    if buffer.is_empty() {
        return;
    }

    let response = http::handle_http_request(engine, &buffer).await;
    let _ = stream.write_all(&response).await;
    let _ = stream.shutdown().await;
}

pub(super) fn build_tls_server_config(config: &TlsConfig) -> io::Result<Arc<ServerConfig>> {
    let (server_chain, private_key) = load_server_identity(config)?;

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let server_config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?
        .with_no_client_auth()
        .with_single_cert(server_chain, private_key)
        .map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid tls server certificate/key configuration: {}", err),
            )
        })?;

    Ok(Arc::new(server_config))
}

/// Certificate chain and private key named by the `[tls]` table. Each file
/// may hold other PEM sections; only the relevant ones are picked out.
fn load_server_identity(
    config: &TlsConfig,
) -> io::Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let chain: Vec<_> = read_pem_items(&config.cert_chain_path)?
        .into_iter()
        .filter_map(|item| match item {
            Item::X509Certificate(der) => Some(der),
            _ => None,
        })
        .collect();
    if chain.is_empty() {
        return Err(invalid_data(format!(
            "no certificates found in {}",
            config.cert_chain_path.display()
        )));
    }

    let key = read_pem_items(&config.private_key_path)?
        .into_iter()
        .find_map(|item| match item {
            Item::Pkcs8Key(key) => Some(PrivateKeyDer::Pkcs8(key)),
            Item::Pkcs1Key(key) => Some(PrivateKeyDer::Pkcs1(key)),
            Item::Sec1Key(key) => Some(PrivateKeyDer::Sec1(key)),
            _ => None,
        })
        .ok_or_else(|| {
            invalid_data(format!("no private key found in {}", config.private_key_path.display()))
        })?;

    Ok((chain, key))
}

fn read_pem_items(path: &Path) -> io::Result<Vec<Item>> {
    let file = File::open(path).map_err(|err| {
        io::Error::new(err.kind(), format!("failed to open {}: {}", path.display(), err))
    })?;
    rustls_pemfile::read_all(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| invalid_data(format!("failed to parse PEM {}: {}", path.display(), err)))
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
