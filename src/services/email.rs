//! Outgoing mail for verification codes

use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::EmailConfig;

/// Sends mail through the SMTP relay named in `config.yml`.
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send a verification code.
    ///
    /// Returns `Ok(false)` without contacting anyone when SMTP is not set up.
    pub async fn send_verification_code(
        &self,
        to_email: &str,
        code: &str,
        board_name: &str,
    ) -> Result<bool> {
        let (Some(host), Some(from)) = (self.config.smtp_host.as_deref(), self.config.from.as_deref())
        else {
            tracing::warn!("SMTP is not configured; verification code for {} not sent", to_email);
            return Ok(false);
        };
        if host.trim().is_empty() {
            tracing::warn!("SMTP host is empty; verification code for {} not sent", to_email);
            return Ok(false);
        }

        let email = Message::builder()
            .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to_email.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(format!("[{}] Email verification code", board_name))
            .header(ContentType::TEXT_PLAIN)
            .body(verification_body(code, board_name))
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.config.smtp_port);
        if let (Some(user), Some(pass)) = (&self.config.smtp_username, &self.config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let mailer: AsyncSmtpTransport<Tokio1Executor> = builder.build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        tracing::info!("Sent verification code to {}", to_email);
        Ok(true)
    }
}

fn verification_body(code: &str, board_name: &str) -> String {
    format!(
        "Hello,\n\nYour verification code is: {}\n\nThe code expires in 10 minutes.\n\nIf you did not sign up for {}, ignore this message.\n",
        code, board_name
    )
}

/// Random 6-digit verification code
pub fn generate_verification_code() -> String {
    format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000)
}
