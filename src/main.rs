mod app;
mod backend;
mod bridge;
mod chat;
mod config;
mod error;
mod geometry;
mod idle;
mod ipc;
mod lifecycle;
mod reaction;
mod renderer;
mod spinner;
mod surface;
mod theme;
mod util;
mod views;
mod window;

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::backend::{BackendClient, StatusReport};
use crate::geometry::WorkArea;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let config = config::load();

    let area = match config.work_area {
        Some(area) => area,
        None => surface::query_work_area(config.screen.as_deref()).unwrap_or_else(|| {
            tracing::warn!("could not query outputs (is wlr-randr or cosmic-randr installed?), assuming 1920x1080");
            WorkArea::FALLBACK
        }),
    };
    tracing::info!(
        x = area.x,
        y = area.y,
        width = area.width,
        height = area.height,
        screen = ?config.screen,
        "work area"
    );

    let client = match BackendClient::new(&config.backend) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!(error = %e, "cannot build backend client");
            return ExitCode::FAILURE;
        }
    };
    let startup_health: StatusReport = client.health();

    match app::run(config, area, client, startup_health) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "event loop failed");
            ExitCode::FAILURE
        }
    }
}
