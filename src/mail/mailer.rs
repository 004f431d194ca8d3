//! Mailer trait and its implementations.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::Mutex;

use super::{Email, MailError};

/// Async email sending trait.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Send an email.
    async fn send(&self, email: &Email) -> Result<(), MailError>;

    /// The sender address used when an email does not set one.
    fn default_from(&self) -> &str;
}

/// SMTP connection settings, read from the environment by `Config`.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// TLS mode: "starttls" (default), "tls", or "none".
    pub tls: String,
    pub timeout_secs: u64,
}

/// SMTP-based mailer using lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    from_raw: String,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, from: &str) -> Result<Self, MailError> {
        if settings.host.is_empty() {
            return Err(MailError::MissingConfig("SMTP_HOST".into()));
        }

        let from_mailbox: Mailbox = from
            .parse()
            .map_err(|_| MailError::InvalidAddress(from.to_string()))?;

        let mut builder = match settings.tls.as_str() {
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host),
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            other => {
                return Err(MailError::InvalidConfig(format!(
                    "SMTP_TLS must be 'starttls', 'tls' or 'none', got '{}'",
                    other
                )));
            }
        };

        builder = builder
            .port(settings.port)
            .timeout(Some(Duration::from_secs(settings.timeout_secs)));

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: Arc::new(builder.build()),
            from: from_mailbox,
            from_raw: from.to_string(),
        })
    }

    /// Build a lettre Message from our Email type.
    fn build_message(&self, email: &Email) -> Result<Message, MailError> {
        let from_mailbox = match &email.from {
            Some(from) => from
                .parse()
                .map_err(|_| MailError::InvalidAddress(from.clone()))?,
            None => self.from.clone(),
        };

        let mut builder = Message::builder().from(from_mailbox);

        for to in &email.to {
            let mailbox: Mailbox = to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.clone()))?;
            builder = builder.to(mailbox);
        }

        builder = builder.subject(&email.subject);

        let text = email.body.text().to_string();
        let message = match email.body.html() {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(text, html.to_string())),
            None => builder.body(text),
        };

        message.map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        tracing::debug!(
            "SMTP accepted mail to {:?}: {}",
            email.to,
            response.code()
        );
        Ok(())
    }

    fn default_from(&self) -> &str {
        &self.from_raw
    }
}

/// Logs emails instead of sending them. Development default.
#[derive(Clone)]
pub struct ConsoleMailer {
    from: String,
}

impl ConsoleMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let from = email.from.as_deref().unwrap_or(&self.from);
        tracing::info!(
            from = %from,
            to = ?email.to,
            subject = %email.subject,
            "📧 console mail\n{}",
            email.body.text()
        );
        Ok(())
    }

    fn default_from(&self) -> &str {
        &self.from
    }
}

/// Keeps every sent email in memory. Recipients registered with
/// [`MemoryMailer::reject`] fail with [`MailError::Rejected`].
#[derive(Clone, Default)]
pub struct MemoryMailer {
    from: String,
    sent: Arc<Mutex<Vec<Email>>>,
    rejected: Arc<Mutex<HashSet<String>>>,
}

impl MemoryMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Default::default()
        }
    }

    pub async fn reject(&self, address: impl Into<String>) {
        self.rejected.lock().await.insert(address.into());
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        {
            let rejected = self.rejected.lock().await;
            if let Some(addr) = email.to.iter().find(|to| rejected.contains(*to)) {
                return Err(MailError::Rejected(addr.clone()));
            }
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }

    fn default_from(&self) -> &str {
        &self.from
    }
}
