mod console;
mod db;
mod error;
mod http;
mod models;
mod validate;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::db::Database;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications over HTTP or from the terminal")]
struct Cli {
    /// Path to the SQLite database file (defaults to the platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8000")]
        addr: SocketAddr,
    },

    /// Interactive console menu
    Console,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr } => {
            tracing_subscriber::registry()
                .with(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(concat!(env!("CARGO_PKG_NAME"), "=info"))),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            info!("Starting jobtrack v{}", env!("CARGO_PKG_VERSION"));

            // A store that cannot be opened is fatal: refuse to serve
            // rather than run with no backing collection.
            let db = open_database(cli.db)?;
            if let Some(path) = db.path() {
                info!("Database ready at {}", path.display());
            }

            let app = http::router(Arc::new(db))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Listening on {addr}");
            axum::serve(listener, app).await?;
        }

        Commands::Console => {
            let db = open_database(cli.db)?;
            console::run(&db)?;
        }
    }

    // Connection is dropped (and released) here, at process shutdown.
    Ok(())
}

fn open_database(path: Option<PathBuf>) -> Result<Database> {
    let db = match path {
        Some(p) => Database::open(&p)?,
        None => Database::open_default()?,
    };
    db.init()?;
    Ok(db)
}
