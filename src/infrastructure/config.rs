use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use crate::mail::{ConsoleMailer, MailError, Mailer, SmtpMailer, SmtpSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailBackend {
    Console,
    Smtp,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Public base URL used in links inside outgoing emails
    pub base_url: Url,
    pub cors_allowed_origins: Vec<String>,
    pub media_root: PathBuf,
    pub email_backend: EmailBackend,
    pub email_from: String,
    pub smtp: SmtpSettings,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let default_base = format!("http://localhost:{}", port);
        let base_url = lookup("BASE_URL")
            .and_then(|u| match Url::parse(&u) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::error!("Ignoring invalid BASE_URL '{}': {}", u, e);
                    None
                }
            })
            .or_else(|| Url::parse(&default_base).ok())
            .unwrap_or_else(|| Url::parse("http://localhost").expect("static url"));

        let email_backend = match lookup("EMAIL_BACKEND").as_deref() {
            Some("smtp") => EmailBackend::Smtp,
            _ => EmailBackend::Console,
        };

        let smtp = SmtpSettings {
            host: lookup("SMTP_HOST").unwrap_or_default(),
            port: lookup("SMTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: lookup("SMTP_USER"),
            password: lookup("SMTP_PASSWORD"),
            tls: lookup("SMTP_TLS").unwrap_or_else(|| "starttls".to_string()),
            timeout_secs: lookup("SMTP_TIMEOUT")
                .and_then(|t| t.parse().ok())
                .unwrap_or(10),
        };

        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://mailings.db?mode=rwc".to_string()),
            port,
            base_url,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            email_backend,
            email_from: lookup("SMTP_FROM").unwrap_or_else(|| "noreply@localhost".to_string()),
            smtp,
        }
    }

    /// Absolute link to an API path, e.g. `link("/api/users/activate/abc")`.
    /// The path is appended to `base_url`, keeping any path prefix it has.
    pub fn link(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Pick the transport named by `EMAIL_BACKEND`. An SMTP setup that cannot be
/// built is an error, never a silent switch to the console.
pub fn build_mailer(config: &Config) -> Result<Arc<dyn Mailer>, MailError> {
    match config.email_backend {
        EmailBackend::Smtp => {
            let mailer = SmtpMailer::new(&config.smtp, &config.email_from)?;
            tracing::info!("Sending mail through {}:{}", config.smtp.host, config.smtp.port);
            Ok(Arc::new(mailer))
        }
        EmailBackend::Console => Ok(Arc::new(ConsoleMailer::new(config.email_from.clone()))),
    }
}
