#[path = "skilld/bootstrap.rs"]
mod bootstrap;
#[path = "skilld/serve_loop.rs"]
mod serve_loop;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "skilld", about = "Serve a voice skill webhook")]
struct Args {
    /// Address to listen on; overrides `listen` from the config file.
    #[arg(long)]
    listen: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Application id requests must carry; overrides `skill.application_id`.
    #[arg(long)]
    application_id: Option<String>,
    #[arg(long)]
    ignore_timestamp: bool,
    #[arg(long)]
    ignore_cert_verify: bool,
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<PathBuf>,
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let context = match bootstrap::bootstrap(args) {
        Ok(context) => context,
        Err(err) => {
            log::error!("skilld: startup failed: {}", err);
            std::process::exit(2);
        }
    };
    if let Err(err) = serve_loop::run_serve_loop(context.listen, context.engine, context.tls).await
    {
        log::error!("skilld: listener failed addr={} err={}", context.listen, err);
        std::process::exit(1);
    }
}
