use chatwire_runtime::SessionController;
use chatwire_server::demo::{CounterHandler, EchoResponder, COUNTER_INCREMENT};
use chatwire_server::{http, AppState, Config};
use chatwire_store_adapters::{MemoryAttachmentStore, MemoryStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "chatwire-server")]
struct Args {
    #[arg(long, env = "CHATWIRE_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    http_addr: String,

    #[arg(long, env = "CHATWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Tracing filter directives. Falls back to `RUST_LOG`, then `info`.
    #[arg(long)]
    log_filter: Option<String>,
}

fn init_tracing(directives: Option<&str>) {
    let filter = match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());

    let cfg = match args.config.as_ref() {
        Some(path) => match Config::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(2);
            }
        },
        None => Config::default(),
    };

    let controller = SessionController::new(Arc::new(MemoryStore::new()), Arc::new(EchoResponder))
        .with_attachment_store(Arc::new(MemoryAttachmentStore::new()))
        .with_action_handler(COUNTER_INCREMENT, Arc::new(CounterHandler))
        .with_config(cfg.runtime);

    let app = axum::Router::new()
        .merge(http::routes())
        .with_state(AppState::new(controller));

    let listener = tokio::net::TcpListener::bind(&args.http_addr)
        .await
        .expect("failed to bind http listener");
    tracing::info!(addr = %args.http_addr, "chatwire server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("http server crashed");
}
