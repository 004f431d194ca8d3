//! Outgoing email.
//!
//! Mailing dispatch and the account flows (verification, password reset)
//! build an [`Email`] and hand it to whichever [`Mailer`] the application
//! state holds. Which one is picked by `EMAIL_BACKEND`:
//!
//! | Backend   | Type              | Behaviour                          |
//! |-----------|-------------------|------------------------------------|
//! | `smtp`    | [`SmtpMailer`]    | lettre async SMTP transport        |
//! | `console` | [`ConsoleMailer`] | logs the email, sends nothing      |
//! | (tests)   | [`MemoryMailer`]  | keeps sent emails in memory        |

mod mailer;
mod message;
mod templates;

pub use mailer::{ConsoleMailer, Mailer, MemoryMailer, SmtpMailer, SmtpSettings};
pub use message::{Email, EmailBody};
pub use templates::Templates;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("missing required config: {0}")]
    MissingConfig(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("recipient rejected: {0}")]
    Rejected(String),
}
