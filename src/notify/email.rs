use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Notifier, NotifyError, Topic};
use crate::config::SmtpConfig;

/// Sends plain-text mail to the comma-separated recipients of a `mailto:` topic.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(std::time::Duration::from_secs(30)))
            .build();

        let from = config
            .from
            .parse()
            .map_err(|e| format!("Invalid from address: {e}"))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn schemes(&self) -> &[&'static str] {
        &["mailto"]
    }

    fn name(&self) -> &str {
        "Email"
    }

    async fn publish(
        &self,
        topic: &Topic,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let recipients = recipients(topic.target())?;

        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for to in recipients {
            builder = builder.to(to);
        }

        let email = builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .map_err(|e| NotifyError::from(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::from(format!("Failed to send email: {e}")))?;

        Ok(())
    }
}

fn recipients(target: &str) -> Result<Vec<Mailbox>, NotifyError> {
    // mailto: may carry ?subject=... style headers; only the address list matters here
    let addresses = target.split('?').next().unwrap_or_default();

    let parsed = addresses
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Mailbox>()
                .map_err(|e| NotifyError::from(format!("Invalid recipient '{s}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if parsed.is_empty() {
        return Err(NotifyError::from("mailto topic has no recipients"));
    }
    Ok(parsed)
}
