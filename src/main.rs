use tracing::info;
use tracing_subscriber::EnvFilter;

use schoold::config::Config;
use schoold::db;
use schoold::http::{self, AppState};
use schoold::store::users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schoold=info")),
        )
        .init();

    let cfg = Config::from_env();
    let conn = db::open_db(&cfg.workspace)?;
    users::ensure_default_admin(&conn, &cfg)?;

    let state = AppState::new(conn, &cfg.secret);
    let app = http::app(state);

    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    info!(addr = %cfg.addr, workspace = %cfg.workspace.display(), "schoold listening");
    axum::serve(listener, app).await?;

    Ok(())
}
