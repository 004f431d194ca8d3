//! Outgoing mail as the services hand it to a [`Mailer`](super::Mailer).

use super::MailError;

/// Every mail carries a plain-text part; newsletters add an HTML alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailBody {
    text: String,
    html: Option<String>,
}

impl EmailBody {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    /// `None` sends as the mailer's configured address
    pub from: Option<String>,
    pub to: Vec<String>,
    pub subject: String,
    pub body: EmailBody,
}

impl Email {
    /// A single-recipient plain-text mail.
    pub fn plain(
        to: impl Into<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self, MailError> {
        let to = to.into();
        let subject = subject.into();
        if to.trim().is_empty() {
            return Err(MailError::Build("recipient is empty".into()));
        }
        if subject.trim().is_empty() {
            return Err(MailError::Build("subject is empty".into()));
        }

        Ok(Self {
            from: None,
            to: vec![to],
            subject,
            body: EmailBody {
                text: text.into(),
                html: None,
            },
        })
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.body.html = Some(html.into());
        self
    }

    pub fn sent_by(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}
