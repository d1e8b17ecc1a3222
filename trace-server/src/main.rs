use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trace_server::api::{self, ApiState};
use trace_server::config::Config;
use trace_server::reader::DirReader;

fn load_env_file() {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "Could not determine current directory for .env lookup");
            return;
        }
    };

    for dir in cwd.ancestors() {
        let candidate = dir.join(".env");
        if !candidate.exists() {
            continue;
        }
        match dotenvy::from_path(&candidate) {
            Ok(_) => info!(path = %candidate.display(), "Loaded environment from .env"),
            Err(e) => tracing::warn!(
                path = %candidate.display(),
                error = %e,
                "Failed to load .env file"
            ),
        }
        return;
    }

    info!(
        cwd = %cwd.display(),
        "No .env file found in current directory or ancestors; using process environment only"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trace_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    load_env_file();
    let config = Config::from_env(std::env::args().skip(1))?;
    let reader = DirReader::new(&config.trace_dir)?;
    info!(
        dir = %reader.dir().display(),
        budget = config.render.complexity_budget,
        "trace-server starting"
    );

    let state = ApiState::new(Arc::new(reader), config.render);
    let app = api::router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.bind_addr();
    info!("listening on http://{addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
