use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{error, info};

use sara_monitor::advice::{AdvicePoller, ContextualAdvisor};
use sara_monitor::api::ApiClient;
use sara_monitor::config::ConfigStore;
use sara_monitor::events::EventBus;
use sara_monitor::monitor::MonitorController;

const LOGIN_RETRY: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("SARA monitor agent starting up...");

    let data_dir = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sara-monitor");
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

    let config = Arc::new(ConfigStore::load(data_dir.join("config.json")));
    let api_url = std::env::var("API_URL").unwrap_or_else(|_| config.get().api_url);
    let api = ApiClient::new(&api_url)?;
    let events = EventBus::new();

    let mut controller = MonitorController::new(api.clone(), Arc::clone(&config), events.clone(), &data_dir);
    let mut advice = AdvicePoller::new(
        api,
        Arc::clone(&config),
        events.clone(),
        controller.session_handle(),
    );
    let mut contextual = ContextualAdvisor::new(events.clone());

    // Headless auto-login, retrying until the backend accepts us.
    let username = std::env::var("SARA_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("SARA_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    loop {
        match controller.login(&username, &password).await {
            Ok(session) => {
                info!("logged in as {} ({})", session.username, session.role);
                break;
            }
            Err(err) => {
                error!("auto-login failed: {err}");
                info!("retrying in {}s...", LOGIN_RETRY.as_secs());
                tokio::time::sleep(LOGIN_RETRY).await;
            }
        }
    }

    controller.start_monitoring().await?;
    advice.start();
    contextual.start();
    info!("monitoring running against {api_url}; press ctrl-c to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down...");
    contextual.stop().await;
    advice.stop().await;
    controller.stop_monitoring().await;

    Ok(())
}
