use anyhow::Context;
use gtk::prelude::*;
use gtk::{glib, Application};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use eventmap::data::APP_ID;
use eventmap::Settings;

mod ui;

fn main() -> glib::ExitCode {
    let settings = Settings::load();

    // RUST_LOG wins over the configured filter
    let filter = settings
        .as_ref()
        .map(|s| s.log_filter.as_str())
        .unwrap_or("eventmap=info");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match settings.context("failed to load settings").and_then(run) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            glib::ExitCode::FAILURE
        }
    }
}

fn run(settings: Settings) -> anyhow::Result<glib::ExitCode> {
    match &settings.origin {
        Some(path) => info!("Loaded settings from {}", path.display()),
        None => debug!("No settings file, using defaults"),
    }

    // Initialize Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    let _guard = rt.enter();

    let app = Application::builder()
        .application_id(APP_ID)
        .build();

    app.connect_activate(move |app| ui::build_ui(app, &settings));

    let exit_code = app.run();

    // Keep runtime alive until app exits
    drop(_guard);
    drop(rt);

    Ok(exit_code)
}
