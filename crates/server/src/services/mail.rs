//! Transactional email over SMTP via lettre.
//!
//! Plain-text messages only: verification codes and password-reset links.
//! Delivery failures are surfaced to the caller, which logs and continues -
//! a lost email must never roll back the signup that triggered it.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Mailer for transactional email.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    /// Create a mailer from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay configuration is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a signup verification code.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or delivered.
    pub async fn send_otp_code(&self, to: &str, name: &str, code: &str) -> Result<(), MailError> {
        let body = format!(
            "Hi {name},\n\n\
             Your Loomkart verification code is {code}.\n\
             It expires in 10 minutes.\n\n\
             If you did not create a Loomkart account, ignore this email.\n"
        );
        self.send_plain(to, "Your Loomkart verification code", body)
            .await
    }

    /// Send a password-reset token.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or delivered.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), MailError> {
        let body = format!(
            "Hi {name},\n\n\
             We received a request to reset your Loomkart password.\n\
             Your reset code is {token} and it expires in 1 hour.\n\n\
             If you did not request this, your account is safe to ignore it.\n"
        );
        self.send_plain(to, "Reset your Loomkart password", body).await
    }

    /// Send a plain-text email.
    async fn send_plain(&self, to: &str, subject: &str, body: String) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .body(body)?;

        self.transport.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}
