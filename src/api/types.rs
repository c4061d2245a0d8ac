//! Shared types for the API layer.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use serde::Serialize;

use crate::api::error::{ApiError, MSG_INTERNAL};
use crate::config::AppConfig;
use crate::db::DatabaseError;
use crate::notify::WebhookClient;

/// Shared context for all routes and middleware: the process-wide SQLite
/// connection, the startup configuration, and the outbound webhook client.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Mutex<Connection>>,
    pub config: Arc<AppConfig>,
    pub webhook: WebhookClient,
}

impl ApiContext {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let webhook = WebhookClient::new(config.webhook_url.clone());
        Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
            webhook,
        }
    }

    /// Lock the shared connection for one operation. Guards must be
    /// dropped before any `.await`.
    pub fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }

    pub fn secret(&self) -> &[u8] {
        self.config.signing_secret.as_bytes()
    }
}

/// Uniform mutation-action envelope. Actions always answer HTTP 200;
/// this shape carries the domain outcome.
#[derive(Debug, Serialize)]
pub struct ActionResult<T = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl ActionResult<()> {
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

/// User-presentable message for a repository failure. Store faults are
/// logged here and replaced by a generic message.
pub(crate) fn domain_message(err: &DatabaseError) -> String {
    match err {
        DatabaseError::NotFound { .. } => crate::api::error::MSG_NOT_FOUND.into(),
        DatabaseError::ConstraintViolation(msg) => msg.clone(),
        DatabaseError::InvalidCursor(_) => crate::api::error::MSG_BAD_CURSOR.into(),
        other => {
            tracing::error!(error = %other, "store failure in action");
            MSG_INTERNAL.into()
        }
    }
}

/// Run one repository operation under the connection lock and fold the
/// outcome into the action envelope.
pub(crate) fn run_action<T, F>(ctx: &ApiContext, op: F) -> ActionResult<T>
where
    F: FnOnce(&Connection) -> Result<T, DatabaseError>,
{
    let conn = match ctx.lock_db() {
        Ok(conn) => conn,
        Err(_) => {
            tracing::error!("database lock poisoned");
            return ActionResult::fail(MSG_INTERNAL);
        }
    };
    match op(&conn) {
        Ok(data) => ActionResult::ok(data),
        Err(err) => ActionResult::fail(domain_message(&err)),
    }
}

/// Like [`run_action`] for operations with no payload to return.
pub(crate) fn run_action_empty<F>(ctx: &ApiContext, op: F) -> ActionResult<()>
where
    F: FnOnce(&Connection) -> Result<(), DatabaseError>,
{
    let conn = match ctx.lock_db() {
        Ok(conn) => conn,
        Err(_) => {
            tracing::error!("database lock poisoned");
            return ActionResult::fail(MSG_INTERNAL);
        }
    };
    match op(&conn) {
        Ok(()) => ActionResult::ok_empty(),
        Err(err) => ActionResult::fail(domain_message(&err)),
    }
}
