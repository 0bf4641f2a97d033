use std::sync::Arc;

use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::config::ConfigStore;
use crate::events::{EventBus, MonitorEvent};
use crate::session::{self, SessionHandle};

const NOTIFICATION_PREVIEW_CHARS: usize = 100;
const BROWSER_TAB_WARNING_THRESHOLD: usize = 10;

/// Periodically asks the backend for a proactive-advice string and publishes
/// any non-empty result. Runs independently of the monitoring loop; rounds
/// where no session exists or the feature is disabled are skipped silently.
pub struct AdvicePoller {
    api: ApiClient,
    config: Arc<ConfigStore>,
    events: EventBus,
    session: SessionHandle,
    worker: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl AdvicePoller {
    pub fn new(
        api: ApiClient,
        config: Arc<ConfigStore>,
        events: EventBus,
        session: SessionHandle,
    ) -> Self {
        Self {
            api,
            config,
            events,
            session,
            worker: None,
            cancel_token: None,
        }
    }

    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(advice_loop(
            self.api.clone(),
            Arc::clone(&self.config),
            self.events.clone(),
            Arc::clone(&self.session),
            cancel_token.clone(),
        ));

        self.worker = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.worker.take() {
            if let Err(err) = handle.await {
                warn!("advice poller task failed to join: {err}");
            }
        }
    }
}

async fn advice_loop(
    api: ApiClient,
    config: Arc<ConfigStore>,
    events: EventBus,
    session: SessionHandle,
    cancel_token: CancellationToken,
) {
    let interval = Duration::from_millis(config.get().advice_interval_ms);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The immediate first tick would fire before any login can complete.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_once(&api, &config, &events, &session).await;
            }
            _ = cancel_token.cancelled() => {
                info!("advice poller shutting down");
                break;
            }
        }
    }
}

async fn poll_once(
    api: &ApiClient,
    config: &ConfigStore,
    events: &EventBus,
    session: &SessionHandle,
) {
    let Some(token) = session::current_token(session) else {
        return;
    };
    if !config.get().proactive_advice {
        return;
    }

    match api.proactive_advice(&token).await {
        Ok(Some(advice)) => {
            events.notify("SARA has advice", &preview(&advice));
            events.emit(MonitorEvent::ProactiveAdvice(advice));
        }
        Ok(None) => {}
        Err(err) => warn!("advice poll failed: {err}"),
    }
}

fn preview(advice: &str) -> String {
    if advice.chars().count() <= NOTIFICATION_PREVIEW_CHARS {
        advice.to_string()
    } else {
        let truncated: String = advice.chars().take(NOTIFICATION_PREVIEW_CHARS).collect();
        format!("{truncated}...")
    }
}

/// Watches activity updates and produces local tips when the foreground app
/// changes. Purely local, no backend round-trip.
pub struct ContextualAdvisor {
    events: EventBus,
    worker: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ContextualAdvisor {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            worker: None,
            cancel_token: None,
        }
    }

    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(contextual_loop(self.events.clone(), cancel_token.clone()));

        self.worker = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.worker.take() {
            if let Err(err) = handle.await {
                warn!("contextual advisor task failed to join: {err}");
            }
        }
    }
}

async fn contextual_loop(events: EventBus, cancel_token: CancellationToken) {
    let mut rx = events.subscribe();
    let mut current_app: Option<String> = None;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(MonitorEvent::ActivityUpdate(sample)) => {
                    if current_app.as_deref() == Some(sample.active_window.as_str()) {
                        continue;
                    }
                    current_app = Some(sample.active_window.clone());

                    if let Some(tip) = contextual_advice(&sample.active_window) {
                        events.notify("Contextual tip", &tip);
                        events.emit(MonitorEvent::ContextualAdvice(tip));
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("contextual advisor lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            },
            _ = cancel_token.cancelled() => {
                info!("contextual advisor shutting down");
                break;
            }
        }
    }
}

/// Derive a tip from the active window name. Coarse substring heuristics,
/// mirroring the classifier's approach.
pub fn contextual_advice(window_name: &str) -> Option<String> {
    let window = window_name.to_lowercase();

    if window.contains("excel") {
        return Some("Tip: press Ctrl+S often to save your work in Excel".to_string());
    }
    if window.contains("word") {
        return Some("Tip: Ctrl+B for bold and Ctrl+I for italics in Word".to_string());
    }
    if window.contains("vscode") || window.contains("visual studio") {
        return Some("Tip: Ctrl+Shift+P opens the command palette in VS Code".to_string());
    }
    if window.contains("chrome") || window.contains("firefox") || window.contains("edge") {
        if estimate_browser_tabs(&window) > BROWSER_TAB_WARNING_THRESHOLD {
            return Some(
                "You have a lot of tabs open. Consider organizing or closing the ones you no longer need".to_string(),
            );
        }
    }

    None
}

/// Rough open-tab estimate from the separators browsers put in their window
/// titles. Only an upper-bound guess.
fn estimate_browser_tabs(window_title: &str) -> usize {
    let separators = [" - ", " | ", " \u{2013} "];
    let mut count = 1;

    for separator in separators {
        let parts = window_title.split(separator).count();
        if parts > count {
            count = parts;
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::types::{ActivitySample, Productivity, SystemLoad};
    use chrono::Utc;

    #[test]
    fn tips_for_known_apps() {
        assert!(contextual_advice("Microsoft Excel").unwrap().contains("Ctrl+S"));
        assert!(contextual_advice("WINWORD").unwrap().contains("Ctrl+B"));
        assert!(contextual_advice("Visual Studio Code")
            .unwrap()
            .contains("command palette"));
    }

    #[test]
    fn no_tip_for_unknown_apps() {
        assert!(contextual_advice("htop").is_none());
        assert!(contextual_advice("").is_none());
    }

    #[test]
    fn browser_with_few_tabs_gets_no_tip() {
        assert!(contextual_advice("Rust docs - Google Chrome").is_none());
    }

    #[test]
    fn browser_with_many_tabs_gets_a_warning() {
        let title = format!("chrome{}", " - tab".repeat(12));
        assert!(contextual_advice(&title).unwrap().contains("tabs"));
    }

    #[test]
    fn tab_estimate_counts_separators() {
        assert_eq!(estimate_browser_tabs("single window"), 1);
        assert_eq!(estimate_browser_tabs("a - b - c"), 3);
        assert_eq!(estimate_browser_tabs("a | b | c | d"), 4);
    }

    #[test]
    fn preview_truncates_long_advice() {
        let advice = "a".repeat(150);
        let shown = preview(&advice);
        assert_eq!(shown.chars().count(), NOTIFICATION_PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));

        assert_eq!(preview("short"), "short");
    }

    fn sample(window: &str) -> ActivitySample {
        ActivitySample {
            timestamp: Utc::now(),
            machine_id: "machine".into(),
            active_window: window.into(),
            top_processes: Vec::new(),
            system_load: SystemLoad {
                cpu_percent: 0.0,
                cpu_core_count: 1,
            },
            productivity: Productivity::Neutral,
        }
    }

    #[tokio::test]
    async fn advisor_emits_tip_on_app_change() {
        let events = EventBus::new();
        let mut advisor = ContextualAdvisor::new(events.clone());
        advisor.start();

        let mut rx = events.subscribe();
        // Give the advisor task a chance to subscribe before emitting.
        tokio::task::yield_now().await;
        events.emit(MonitorEvent::ActivityUpdate(sample("Microsoft Excel")));

        let tip = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let MonitorEvent::ContextualAdvice(tip) = rx.recv().await.unwrap() {
                    break tip;
                }
            }
        })
        .await
        .expect("no contextual advice before timeout");
        assert!(tip.contains("Ctrl+S"));

        advisor.stop().await;
    }

    #[tokio::test]
    async fn advisor_ignores_repeated_app() {
        let events = EventBus::new();
        let mut advisor = ContextualAdvisor::new(events.clone());
        advisor.start();

        let mut rx = events.subscribe();
        tokio::task::yield_now().await;
        events.emit(MonitorEvent::ActivityUpdate(sample("Microsoft Excel")));
        events.emit(MonitorEvent::ActivityUpdate(sample("Microsoft Excel")));

        let mut tips = 0;
        let _ = tokio::time::timeout(Duration::from_millis(300), async {
            loop {
                if let Ok(MonitorEvent::ContextualAdvice(_)) = rx.recv().await {
                    tips += 1;
                }
            }
        })
        .await;
        assert_eq!(tips, 1);

        advisor.stop().await;
    }
}
