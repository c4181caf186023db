use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr: SocketAddr = std::env::var("UIREGRESS_WEB_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
        .parse()?;

    let static_dir = PathBuf::from(
        std::env::var("UIREGRESS_WEB_STATIC_DIR")
            .unwrap_or_else(|_| "crates/web/static".to_string()),
    );
    anyhow::ensure!(
        static_dir.is_dir(),
        "static dir {} does not exist",
        static_dir.display()
    );

    info!(
        "serving {} on http://{}",
        static_dir.display(),
        addr
    );

    let app = uiregress_web::router(static_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
