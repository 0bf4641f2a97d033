use std::{path::Path, sync::Arc};

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, ApiError};
use crate::config::ConfigStore;
use crate::events::EventBus;
use crate::session::{self, new_session_handle, Session, SessionHandle};

use super::batcher::Batcher;
use super::loop_worker::monitor_loop;
use super::sampler::Sampler;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Owns the session, the batcher, and the monitoring loop lifecycle.
///
/// `start_monitoring` requires a session and is a no-op while already
/// running; `stop_monitoring` is idempotent and guarantees that no further
/// activity events fire once it returns.
pub struct MonitorController {
    api: ApiClient,
    config: Arc<ConfigStore>,
    batcher: Arc<Batcher>,
    events: EventBus,
    session: SessionHandle,
    worker: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl MonitorController {
    pub fn new(
        api: ApiClient,
        config: Arc<ConfigStore>,
        events: EventBus,
        data_dir: &Path,
    ) -> Self {
        let batcher = Arc::new(Batcher::new(
            api.clone(),
            config.machine_id(),
            data_dir.to_path_buf(),
        ));

        Self {
            api,
            config,
            batcher,
            events,
            session: new_session_handle(),
            worker: None,
            cancel_token: None,
        }
    }

    /// Shared read-only view of the session for the advice poller.
    pub fn session_handle(&self) -> SessionHandle {
        Arc::clone(&self.session)
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session
            .read()
            .ok()
            .and_then(|guard| guard.clone())
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Authenticate against the backend and install the session. The token
    /// and user id are persisted so the config record mirrors the last login.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, MonitorError> {
        let user = self.api.login(username, password).await?;
        info!("authenticated as {} ({})", user.username, user.rol);

        let session = Session::from_user(&user);
        *self.session.write().expect("session lock poisoned") = Some(session.clone());

        if let Err(err) = self.config.update(|config| {
            config.auth_token = Some(session.auth_token.clone());
            config.user_id = Some(session.user_id);
        }) {
            warn!("failed to persist credentials: {err:#}");
        }

        self.events
            .notify("SARA Monitor", "Welcome! Monitoring is ready to start.");

        Ok(session)
    }

    /// Drop the session, clear persisted credentials, and stop the loop.
    pub async fn logout(&mut self) {
        *self.session.write().expect("session lock poisoned") = None;

        if let Err(err) = self.config.update(|config| {
            config.auth_token = None;
            config.user_id = None;
        }) {
            warn!("failed to clear persisted credentials: {err:#}");
        }

        self.stop_monitoring().await;
        self.events
            .notify("SARA Monitor", "Session closed. Monitoring stopped.");
    }

    pub async fn start_monitoring(&mut self) -> Result<(), MonitorError> {
        if self.worker.is_some() {
            return Ok(());
        }
        if session::current_user_id(&self.session).is_none() {
            return Err(MonitorError::Unauthenticated);
        }

        let config = self.config.get();
        let sampler = Sampler::new(config.machine_id.clone());
        let cancel_token = CancellationToken::new();

        info!(
            "starting activity monitoring (interval {}ms, batch threshold {})",
            config.monitor_interval_ms, config.batch_threshold
        );

        let handle = tokio::spawn(monitor_loop(
            sampler,
            Arc::clone(&self.batcher),
            self.events.clone(),
            Arc::clone(&self.session),
            Duration::from_millis(config.monitor_interval_ms),
            config.batch_threshold,
            cancel_token.clone(),
        ));

        self.worker = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the pending tick and wait for the worker to wind down. An
    /// in-flight flush may still complete, but its result is discarded.
    pub async fn stop_monitoring(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.worker.take() {
            if let Err(err) = handle.await {
                warn!("monitor loop task failed to join: {err}");
            }
            info!("monitoring stopped");
        }
    }

    /// Relay one chat message to the assistant endpoint.
    pub async fn send_chat_message(&self, message: &str) -> Result<String, MonitorError> {
        let token =
            session::current_token(&self.session).ok_or(MonitorError::Unauthenticated)?;
        Ok(self.api.chat(&token, message).await?)
    }
}
