//! Email body templates.
//!
//! Templates are compiled into the binary and registered with tera under
//! their path relative to `templates/`.

use serde::Serialize;
use tera::{Context, Tera};

use super::MailError;

const TEMPLATES: &[(&str, &str)] = &[
    (
        "mailing/email.txt",
        include_str!("../../templates/mailing/email.txt"),
    ),
    (
        "mailing/email.html",
        include_str!("../../templates/mailing/email.html"),
    ),
    (
        "users/verify_email.txt",
        include_str!("../../templates/users/verify_email.txt"),
    ),
    (
        "users/password_reset.txt",
        include_str!("../../templates/users/password_reset.txt"),
    ),
];

#[derive(Debug)]
pub struct Templates {
    tera: Tera,
}

#[derive(Serialize)]
struct MessageContext<'a> {
    subject: &'a str,
    body: &'a str,
}

impl Templates {
    pub fn new() -> Result<Self, MailError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .map_err(|e| MailError::Template(e.to_string()))?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String, MailError> {
        self.tera
            .render(name, context)
            .map_err(|e| MailError::Template(format!("{}: {}", name, e)))
    }

    /// Render a newsletter message into its `(text, html)` bodies.
    pub fn render_message(&self, subject: &str, body: &str) -> Result<(String, String), MailError> {
        let mut context = Context::new();
        context.insert("message", &MessageContext { subject, body });
        let paragraphs: Vec<&str> = body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        context.insert("paragraphs", &paragraphs);

        let text = self.render("mailing/email.txt", &context)?;
        let html = self.render("mailing/email.html", &context)?;
        Ok((text, html))
    }

    pub fn render_verification(
        &self,
        full_name: &str,
        verify_url: &str,
        activate_url: &str,
    ) -> Result<String, MailError> {
        let mut context = Context::new();
        context.insert("full_name", full_name);
        context.insert("verify_url", verify_url);
        context.insert("activate_url", activate_url);
        self.render("users/verify_email.txt", &context)
    }

    pub fn render_password_reset(&self, email: &str, password: &str) -> Result<String, MailError> {
        let mut context = Context::new();
        context.insert("email", email);
        context.insert("password", password);
        self.render("users/password_reset.txt", &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_renders_both_bodies() {
        let templates = Templates::new().unwrap();
        let (text, html) = templates
            .render_message("October news", "First paragraph.\n\nSecond <b>one</b>.")
            .unwrap();

        assert!(text.starts_with("October news"));
        assert!(text.contains("Second <b>one</b>."));
        assert!(html.contains("<h1>October news</h1>"));
        assert!(html.contains("<p>First paragraph.</p>"));
        // html templates are autoescaped
        assert!(html.contains("Second &lt;b&gt;one&lt;&#x2F;b&gt;."));
    }

    #[test]
    fn verification_mail_contains_links() {
        let templates = Templates::new().unwrap();
        let body = templates
            .render_verification(
                "Ann",
                "http://localhost/api/users/verify_email/abc",
                "http://localhost/api/users/activate/abc",
            )
            .unwrap();
        assert!(body.contains("Hello Ann,"));
        assert!(body.contains("/verify_email/abc"));
        assert!(body.contains("/activate/abc"));
    }

    #[test]
    fn password_reset_mail_contains_password() {
        let templates = Templates::new().unwrap();
        let body = templates
            .render_password_reset("ann@example.com", "s3cretPass12")
            .unwrap();
        assert!(body.contains("ann@example.com"));
        assert!(body.contains("s3cretPass12"));
    }
}
