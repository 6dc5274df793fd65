mod app;
mod ui;

use std::sync::Arc;

use clap::Parser;
use gtk::prelude::*;
use relm4::prelude::*;
use tracing_subscriber::EnvFilter;

use app::{App, AppInit};
use docs_chat::api::DocsApiClient;
use docs_chat::config::{Cli, Config, APP_ID, RESOURCE_PREFIX};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docs_chat=info")),
        )
        .init();

    let config = Config::from_cli(Cli::parse())?;
    tracing::info!("Using server {}", config.server_url);
    let api = Arc::new(DocsApiClient::new(config.server_url.clone())?);

    let app = adw::Application::builder().application_id(APP_ID).build();

    app.connect_startup(|_| {
        let resource_bytes = glib::Bytes::from_static(include_bytes!(concat!(
            env!("OUT_DIR"),
            "/docs-chat.gresource"
        )));
        match gio::Resource::from_data(&resource_bytes) {
            Ok(resource) => gio::resources_register(&resource),
            Err(e) => tracing::error!("Failed to load bundled resources: {}", e),
        }

        let Some(display) = gtk::gdk::Display::default() else {
            tracing::error!("No display available, skipping stylesheet");
            return;
        };

        gtk::Window::set_default_icon_name(APP_ID);

        let provider = gtk::CssProvider::new();
        provider.load_from_resource(&format!("{}/style.css", RESOURCE_PREFIX));
        gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    });

    // Arguments were consumed by clap; GTK must not see them.
    RelmApp::from_app(app)
        .with_args(Vec::new())
        .run_async::<App>(AppInit { config, api });

    Ok(())
}
