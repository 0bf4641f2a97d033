use std::sync::{Arc, RwLock};

use crate::api::AuthenticatedUser;

/// Authenticated user identity plus the token sent on monitored requests.
/// Created on login, dropped on logout.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub auth_token: String,
}

impl Session {
    pub fn from_user(user: &AuthenticatedUser) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.rol.clone(),
            // The backend keys authorization off the user id.
            auth_token: format!("Bearer {}", user.id),
        }
    }
}

/// Shared read-mostly view of the current session. The controller writes it on
/// login/logout; the pollers only ever read.
pub type SessionHandle = Arc<RwLock<Option<Session>>>;

pub fn new_session_handle() -> SessionHandle {
    Arc::new(RwLock::new(None))
}

/// Snapshot the auth token without holding the lock across an await point.
pub(crate) fn current_token(handle: &SessionHandle) -> Option<String> {
    handle
        .read()
        .ok()
        .and_then(|guard| guard.as_ref().map(|session| session.auth_token.clone()))
}

/// Snapshot the user id without holding the lock across an await point.
pub(crate) fn current_user_id(handle: &SessionHandle) -> Option<i64> {
    handle
        .read()
        .ok()
        .and_then(|guard| guard.as_ref().map(|session| session.user_id))
}
