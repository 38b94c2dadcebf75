use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("mail task failed: {0}")]
    Task(String),
}

/// An email carrying a PDF document.
#[derive(Debug, Clone)]
pub struct ReceiptEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub filename: String,
    pub pdf: Vec<u8>,
}

/// A plain-text account or organization email.
#[derive(Debug, Clone)]
pub struct NoticeEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_receipt(&self, email: ReceiptEmail) -> Result<(), MailError>;
    async fn send_notice(&self, email: NoticeEmail) -> Result<(), MailError>;
}

/// Sends mail through an authenticated SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = SmtpTransport::relay(&config.host)?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.parse()?,
        })
    }

    fn build_message(&self, email: ReceiptEmail) -> Result<Message, MailError> {
        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| MailError::Task(e.to_string()))?;
        let attachment = Attachment::new(email.filename).body(email.pdf, pdf_type);

        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(email.body))
                    .singlepart(attachment),
            )?;
        Ok(message)
    }

    async fn deliver(&self, message: Message) -> Result<(), MailError> {
        let transport = self.transport.clone();

        // lettre's SmtpTransport is blocking.
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Task(e.to_string()))??;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_receipt(&self, email: ReceiptEmail) -> Result<(), MailError> {
        let to = email.to.clone();
        let message = self.build_message(email)?;
        self.deliver(message).await?;

        tracing::info!(to = %to, "receipt email sent");
        Ok(())
    }

    async fn send_notice(&self, email: NoticeEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject)
            .singlepart(SinglePart::plain(email.body))?;
        self.deliver(message).await?;

        tracing::info!(to = %email.to, "notice email sent");
        Ok(())
    }
}
