#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use clap::Parser;
use latency_monitor::app::App;
use latency_monitor::settings::Settings;
use tracing_subscriber::EnvFilter;

fn main() -> iced::Result {
    let settings = Settings::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("latency_monitor=info")),
        )
        .init();
    tracing::info!(?settings, "starting");

    iced::application(App::title, App::update, App::view)
        .subscription(App::subscription)
        .theme(App::theme)
        .window_size((520.0, 560.0))
        .run_with(move || App::new(settings))
}
