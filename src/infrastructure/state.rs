//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{ClientRepository, MessageRepository};
use crate::infrastructure::config::Config;
use crate::infrastructure::{SeaOrmClientRepository, SeaOrmMessageRepository};
use crate::mail::{Mailer, Templates};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Outgoing mail transport (SMTP, console or in-memory)
    pub mailer: Arc<dyn Mailer>,
    /// Email body templates
    pub templates: Arc<Templates>,
    pub client_repo: Arc<dyn ClientRepository>,
    pub message_repo: Arc<dyn MessageRepository>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(
        db: DatabaseConnection,
        config: Config,
        mailer: Arc<dyn Mailer>,
        templates: Templates,
    ) -> Self {
        let client_repo = Arc::new(SeaOrmClientRepository::new(db.clone()));
        let message_repo = Arc::new(SeaOrmMessageRepository::new(db.clone()));

        Self {
            db,
            config: Arc::new(config),
            mailer,
            templates: Arc::new(templates),
            client_repo,
            message_repo,
        }
    }

    /// Get the database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
