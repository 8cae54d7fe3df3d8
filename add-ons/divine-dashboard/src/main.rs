//! **Divine OS**: dashboard server and terminal views.
//!
//! ## Usage
//!
//! ```text
//! divine serve            HTTP dashboard on 127.0.0.1:{port} (default)
//! divine panel <slug>     render one panel to the terminal
//! divine views            list every view and its slug
//! divine help             print usage
//! ```
//!
//! Configuration comes from `config/divine.toml` (or `DIVINE_CONFIG`) and
//! `DIVINE__*` environment variables; `.env` is loaded first.

use std::net::SocketAddr;
use std::sync::Arc;

use divine_core::{Dashboard, DivineConfig, ViewId};
use divine_dashboard::{router, terminal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let sub = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    let result = match sub {
        "serve" => serve().await,
        "panel" => match args.get(2) {
            Some(slug) => print_panel(slug),
            None => Err("usage: divine panel <slug>".to_string()),
        },
        "views" => {
            println!("{}", terminal::view_list(ViewId::default()));
            Ok(())
        }
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        other => Err(format!(
            "Unknown subcommand '{}'. Use: divine serve | divine panel <slug> | divine views | divine help",
            other
        )),
    };

    if let Err(e) = result {
        eprintln!("divine {}: {}", sub, e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!("Divine OS v{}", VERSION);
    println!();
    println!("Usage: divine [COMMAND]");
    println!();
    println!("Commands:");
    println!("  serve          Start the HTTP dashboard (default)");
    println!("  panel <slug>   Render one panel in the terminal");
    println!("  views          List views and their slugs");
    println!("  help           Print this help message");
    println!();
    println!("Set GEMINI_API_KEY for live AI calls, or DIVINE__LLM_MODE=mock for canned responses.");
}

fn load_dashboard() -> Result<(DivineConfig, Dashboard), String> {
    let config = DivineConfig::load().map_err(|e| format!("config: {e}"))?;
    let dashboard = Dashboard::from_config(&config).map_err(|e| format!("gateway: {e}"))?;
    Ok((config, dashboard))
}

fn print_panel(slug: &str) -> Result<(), String> {
    let (_, dashboard) = load_dashboard()?;
    let panel = dashboard.open_slug(slug);
    if panel.is_pending() {
        tracing::warn!(target: "divine::dashboard", slug = %slug, "unknown view");
    }
    println!("{}", terminal::panel(&panel));
    Ok(())
}

async fn serve() -> Result<(), String> {
    let (config, dashboard) = load_dashboard()?;
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!(
        target: "divine::dashboard",
        app = %config.app_name,
        mode = ?config.llm_mode,
        "listening on http://{}",
        addr
    );

    let app = router(Arc::new(dashboard));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind {addr}: {e}"))?;
    axum::serve(listener, app).await.map_err(|e| e.to_string())
}
