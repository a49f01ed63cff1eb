use clap::Parser;
use node_cli::{build, run, run_once, wait_for_shutdown_signal, Cli};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() {
    // Load `.env`/`env.json` overlays before anything reads process env (tokens,
    // TLS paths).
    let _ = node_config::load_and_apply("fleet-node", None);
    init_tracing();

    let cli = Cli::parse();

    let node = match build(&cli.app_name, cli.config_dir.as_deref(), None).await {
        Ok(node) => node,
        Err(e) => {
            tracing::error!(error = %e, "fatal startup error");
            std::process::exit(1);
        }
    };

    if cli.once {
        run_once(&node).await;
        return;
    }

    if let Err(e) = run(node, wait_for_shutdown_signal()).await {
        tracing::error!(error = %e, "node exited with error");
        std::process::exit(1);
    }
}
