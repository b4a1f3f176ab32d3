//! Delivery of single-use token emails.
//!
//! [`SmtpMailer`] sends multipart (text + HTML) mail through lettre when SMTP
//! is enabled; otherwise [`LogMailer`] only records that a delivery happened.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use appointme_config::EmailConfig;
use async_trait::async_trait;
use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::instrument;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends an email-verification code. `link` already embeds `code`.
    async fn send_verification(
        &self,
        to: &str,
        name: &str,
        link: &str,
        code: &str,
    ) -> anyhow::Result<()>;

    /// Sends a password reset code. `link` already embeds `code`.
    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        link: &str,
        code: &str,
    ) -> anyhow::Result<()>;
}

/// Builds the mailer for `config`: SMTP when enabled, logging otherwise.
pub fn mailer_from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    if config.enabled {
        Arc::new(SmtpMailer::new(config.clone()))
    } else {
        tracing::warn!("SMTP disabled; token emails will only be logged");
        Arc::new(LogMailer)
    }
}

pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, text_body, html_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> anyhow::Result<()> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(from.parse().context("invalid from address")?)
            .to(to_email.parse().context("invalid recipient address")?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .context("failed to build email")?;

        let transport = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .context("failed to create SMTP relay")?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| anyhow!("mail task failed: {e}"))?
            .context("failed to send email")?;

        Ok(())
    }

    fn render(
        &self,
        name: &str,
        intro: &str,
        action: &str,
        link: &str,
        code: &str,
    ) -> (String, String) {
        let app = &self.config.app_name;

        let text = format!(
            "Hi {name},\n\n\
             {intro}\n\n\
             {action}:\n\
             {link}\n\n\
             Or enter this code: {code}\n\n\
             If you didn't request this, please ignore this email.\n\n\
             {app}"
        );

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{app}</title></head>
<body style="margin: 0; padding: 24px; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <div style="max-width: 560px; margin: 0 auto; background-color: #ffffff; border-radius: 8px; padding: 32px;">
        <h1 style="margin: 0 0 24px; color: #0F766E; font-size: 24px;">{app}</h1>
        <p style="color: #333333; font-size: 16px;">Hi {name},</p>
        <p style="color: #333333; font-size: 16px;">{intro}</p>
        <p style="text-align: center; margin: 32px 0;">
            <a href="{link}" style="background-color: #0F766E; color: #ffffff; padding: 12px 28px; text-decoration: none; border-radius: 6px;">{action}</a>
        </p>
        <p style="color: #666666; font-size: 14px;">Or enter this code: <code>{code}</code></p>
        <p style="color: #999999; font-size: 12px;">If you didn't request this, please ignore this email.</p>
    </div>
</body>
</html>"#
        );

        (text, html)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(
        &self,
        to: &str,
        name: &str,
        link: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        let (text, html) = self.render(
            name,
            "Thanks for signing up. Please confirm your email address.",
            "Activate your account",
            link,
            code,
        );
        let subject = format!("{} - Email Verification", self.config.app_name);

        self.send_email(to, &subject, text, html).await
    }

    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        link: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        let (text, html) = self.render(
            name,
            "You requested to reset your password.",
            "Reset your password",
            link,
            code,
        );
        let subject = format!("{} - Password Reset", self.config.app_name);

        self.send_email(to, &subject, text, html).await
    }
}

/// Records deliveries in the log without sending anything. Codes are not
/// logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &str, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
        tracing::info!(to, kind = "verification", "Email delivery skipped (SMTP disabled)");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
        tracing::info!(to, kind = "password_reset", "Email delivery skipped (SMTP disabled)");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::{RecordingMailer, SentEmail, SentEmailKind};

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SentEmailKind {
        Verification,
        PasswordReset,
    }

    #[derive(Debug, Clone)]
    pub struct SentEmail {
        pub kind: SentEmailKind,
        pub to: String,
        pub name: String,
        pub link: String,
        pub code: String,
    }

    /// Captures every delivery, codes included.
    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<SentEmail>>,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<SentEmail> {
            self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        /// Most recent delivery of `kind` to `to`.
        pub fn last_to(&self, to: &str, kind: SentEmailKind) -> Option<SentEmail> {
            self.sent()
                .into_iter()
                .rev()
                .find(|m| m.kind == kind && m.to.eq_ignore_ascii_case(to))
        }

        fn record(&self, kind: SentEmailKind, to: &str, name: &str, link: &str, code: &str) {
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(SentEmail {
                    kind,
                    to: to.to_string(),
                    name: name.to_string(),
                    link: link.to_string(),
                    code: code.to_string(),
                });
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_verification(
            &self,
            to: &str,
            name: &str,
            link: &str,
            code: &str,
        ) -> anyhow::Result<()> {
            self.record(SentEmailKind::Verification, to, name, link, code);
            Ok(())
        }

        async fn send_password_reset(
            &self,
            to: &str,
            name: &str,
            link: &str,
            code: &str,
        ) -> anyhow::Result<()> {
            self.record(SentEmailKind::PasswordReset, to, name, link, code);
            Ok(())
        }
    }
}
