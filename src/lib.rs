pub mod advice;
pub mod api;
pub mod config;
pub mod events;
pub mod monitor;
pub mod session;

pub use advice::{AdvicePoller, ContextualAdvisor};
pub use api::{ApiClient, ApiError, AuthenticatedUser};
pub use config::{AgentConfig, ConfigStore};
pub use events::{EventBus, MonitorEvent};
pub use monitor::{ActivitySample, MonitorController, MonitorError, Productivity};
pub use session::{Session, SessionHandle};
