/// Email delivery for verification and password reset tokens
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EmailSettings;
use crate::error::{AuthError, Result};

/// Async email transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
    verification_base_url: Option<String>,
    password_reset_base_url: Option<String>,
}

impl EmailService {
    /// Build email service from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    /// Useful for development and testing without email infrastructure.
    pub fn new(config: &EmailSettings) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AuthError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| {
                AuthError::Internal(format!("Failed to configure SMTP transport: {}", e))
            })?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self {
            transport,
            from,
            verification_base_url: config.verification_base_url.clone(),
            password_reset_base_url: config.password_reset_base_url.clone(),
        })
    }

    /// Check if SMTP transport is enabled
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send verification email with activation link
    pub async fn send_verification_email(&self, recipient: &str, token: &str) -> Result<()> {
        let link = self.build_verification_link(token);
        let subject = "Verify your Aegis account";
        let body = format!(
            "Welcome to Aegis!\n\nPlease click the following link to complete your email verification:\n{}\n\nIf you did not request this, please ignore this email.",
            link
        );
        self.send_mail(recipient, subject, &body).await
    }

    /// Send password reset email with reset link
    pub async fn send_password_reset_email(&self, recipient: &str, token: &str) -> Result<()> {
        let link = self.build_password_reset_link(token);
        let subject = "Aegis password reset";
        let body = format!(
            "We received your password reset request.\n\n\
            Please click the following link to reset your password:\n{}\n\n\
            This link will expire in 30 minutes.\n\
            If you did not request this, please ignore this email or contact support immediately.",
            link
        );
        self.send_mail(recipient, subject, &body).await
    }

    fn build_verification_link(&self, token: &str) -> String {
        match &self.verification_base_url {
            Some(base) if !base.is_empty() => format!("{base}?token={token}"),
            _ => format!("https://app.aegis.dev/verify-email?token={token}"),
        }
    }

    fn build_password_reset_link(&self, token: &str) -> String {
        match &self.password_reset_base_url {
            Some(base) if !base.is_empty() => format!("{base}?token={token}"),
            _ => format!("https://app.aegis.dev/reset-password?token={token}"),
        }
    }

    async fn send_mail(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if let Some(transport) = &self.transport {
            let to = recipient.parse::<Mailbox>().map_err(|e| {
                AuthError::Internal(format!("Invalid recipient email address: {}", e))
            })?;

            let email = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(subject)
                .header(header::ContentType::TEXT_PLAIN)
                .body(body.to_string())
                .map_err(|e| {
                    AuthError::Internal(format!("Failed to build email message: {}", e))
                })?;

            transport
                .send(email)
                .await
                .map_err(|e| AuthError::Internal(format!("Failed to send email: {}", e)))?;
            info!(subject, "email sent successfully");
        } else {
            info!(
                subject,
                recipient, "Email service running in no-op mode; skipping actual send"
            );
        }
        Ok(())
    }
}
