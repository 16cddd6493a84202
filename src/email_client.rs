use async_trait::async_trait;
use lettre::address::Address;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::config::{SmtpSettings, SmtpTls};
use crate::domain::attachment::Attachment;
use crate::domain::recipient::Recipient;
use crate::domain::recipient_email::RecipientEmail;
use crate::domain::template::RenderedMessage;

// Reply codes a relay uses to refuse the session credentials.
const AUTH_REPLY_CODES: [&str; 3] = ["530", "534", "535"];

#[derive(Debug, Clone, thiserror::Error)]
pub enum MailError {
    #[error("SMTP server rejected the credentials: {0}")]
    Auth(String),
    #[error("Could not open an SMTP session: {0}")]
    Connection(String),
    #[error("SMTP server did not accept the message: {0}")]
    Send(String),
    #[error("Failed to build the message: {0}")]
    Build(String),
}

impl MailError {
    pub fn is_auth(&self) -> bool {
        matches!(self, MailError::Auth(_))
    }
}

/// A fully rendered message for one recipient.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    pub body: String,
    pub attachment: Attachment,
}

impl OutgoingEmail {
    pub fn new(
        from: Mailbox,
        recipient: &Recipient,
        message: RenderedMessage,
        attachment: Attachment,
    ) -> Result<OutgoingEmail, MailError> {
        let to = mailbox(
            &recipient.email,
            recipient.name.as_ref().map(|name| name.as_ref()),
        )?;

        Ok(OutgoingEmail {
            from,
            to,
            subject: message.subject,
            body: message.body,
            attachment,
        })
    }

    /// `multipart/mixed` with a UTF-8 plain text body and the attachment.
    pub fn build(&self) -> Result<Message, MailError> {
        let content_type = ContentType::parse(self.attachment.content_type())
            .map_err(|err| MailError::Build(err.to_string()))?;
        let attachment = MimeAttachment::new(self.attachment.filename().to_string())
            .body(self.attachment.content().to_vec(), content_type);

        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(self.body.clone()))
                    .singlepart(attachment),
            )
            .map_err(|err| MailError::Build(err.to_string()))
    }
}

pub fn mailbox(email: &RecipientEmail, name: Option<&str>) -> Result<Mailbox, MailError> {
    let address: Address = email
        .as_ref()
        .parse()
        .map_err(|err: lettre::address::AddressError| MailError::Build(err.to_string()))?;

    Ok(Mailbox::new(name.map(String::from), address))
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Opens a session with the relay and authenticates.
    async fn verify(&self) -> Result<(), MailError>;

    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct EmailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl EmailClient {
    pub fn new(settings: &SmtpSettings) -> Result<EmailClient, MailError> {
        let credentials = Credentials::new(
            settings.username.clone(),
            settings.app_password.expose_secret().clone(),
        );
        let builder = match settings.tls {
            SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|err| MailError::Connection(err.to_string()))?,
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|err| MailError::Connection(err.to_string()))?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host),
        };

        let transport = builder
            .port(settings.port)
            .credentials(credentials)
            .timeout(Some(settings.get_timeout()))
            .build();

        Ok(EmailClient {
            transport,
            host: settings.host.clone(),
        })
    }
}

#[async_trait]
impl Mailer for EmailClient {
    #[tracing::instrument(name = "Verifying the SMTP session", skip(self), fields(host = %self.host))]
    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Connection(format!(
                "{} did not answer the connection check",
                self.host
            ))),
            Err(err) if is_auth_failure(&err) => Err(MailError::Auth(err.to_string())),
            Err(err) => Err(MailError::Connection(err.to_string())),
        }
    }

    #[tracing::instrument(
        name = "Sending an email",
        skip(self, email),
        fields(recipient = %email.to, attachment_bytes = email.attachment.len())
    )]
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = email.build()?;

        self.transport.send(message).await.map_err(|err| {
            if is_auth_failure(&err) {
                MailError::Auth(err.to_string())
            } else {
                MailError::Send(err.to_string())
            }
        })?;

        Ok(())
    }
}

fn is_auth_failure(err: &lettre::transport::smtp::Error) -> bool {
    err.status()
        .map(|code| AUTH_REPLY_CODES.contains(&code.to_string().as_str()))
        .unwrap_or(false)
}
