use std::sync::Arc;
use std::time;

use crate::campaign::event::{ProgressEvent, ProgressSnapshot};
use crate::campaign::run::CampaignRun;
use crate::domain::delivery_status::{
    DeliveryStatus, FailureKind, FailureReason, StatusTransitionError,
};
use crate::domain::recipient::Recipient;
use crate::domain::recipient_list::RecipientEntry;
use crate::domain::template::TemplateError;
use crate::email_client::{MailError, Mailer, OutgoingEmail};

const APP_PASSWORD_HINT: &str =
    "Most providers (Gmail included) require an app password instead of the account password.";

#[derive(thiserror::Error)]
pub enum DispatchError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("SMTP error: {0}")]
    Connection(String),
    #[error("Recipient status changed twice.")]
    Status(#[from] StatusTransitionError),
}

impl std::fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl From<MailError> for DispatchError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Auth(reason) => DispatchError::Auth(reason),
            other => DispatchError::Connection(other.to_string()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum DeliveryError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Sends a campaign run recipient after recipient over one shared mail
/// transport.
#[derive(Clone)]
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    send_interval: time::Duration,
}

impl Dispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, send_interval: time::Duration) -> Dispatcher {
        Dispatcher {
            mailer,
            send_interval,
        }
    }

    /// Runs a started campaign to completion. Per-recipient failures are
    /// recorded and the run goes on; a session or credential failure aborts
    /// it, leaving the remaining recipients pending.
    #[tracing::instrument(
        name = "Dispatching a campaign",
        skip(self, run),
        fields(campaign_id = %run.id(), recipients = run.entries().len())
    )]
    pub async fn run(&self, run: Arc<CampaignRun>) -> Result<ProgressSnapshot, DispatchError> {
        run.emit(ProgressEvent::info("Starting email campaign..."));
        run.emit(ProgressEvent::info("Connecting to SMTP server..."));

        if let Err(err) = self.mailer.verify().await {
            return Err(abort(&run, err.into()));
        }

        run.emit(ProgressEvent::success("Successfully authenticated"));
        run.emit(ProgressEvent::info(format!(
            "Starting to send emails to {} recipients",
            run.entries().len()
        )));

        for (index, entry) in run.entries().iter().enumerate() {
            if index > 0 && !self.send_interval.is_zero() {
                tokio::time::sleep(self.send_interval).await;
            }

            let outcome = match entry {
                RecipientEntry::Invalid { input, error } => {
                    run.emit(ProgressEvent::error(format!("Invalid email: {}", input)));
                    failed(FailureKind::Validation, error.to_string())
                }
                RecipientEntry::Valid(recipient) => match self.deliver(&run, recipient).await {
                    Ok(()) => {
                        run.emit(ProgressEvent::success(format!(
                            "Email sent to: {}",
                            recipient.email
                        )));
                        DeliveryStatus::Sent
                    }
                    Err(DeliveryError::Mail(err)) if err.is_auth() => {
                        return Err(abort(&run, err.into()));
                    }
                    Err(err) => {
                        tracing::warn!("Failed to send to {}: {}", recipient.email, err);
                        run.emit(ProgressEvent::error(format!(
                            "Failed to send to {}: {}",
                            recipient.email, err
                        )));
                        let kind = match err {
                            DeliveryError::Template(_) => FailureKind::Template,
                            DeliveryError::Mail(_) => FailureKind::Send,
                        };
                        failed(kind, err.to_string())
                    }
                },
            };

            if let Err(err) = run.record(index, outcome) {
                let err = DispatchError::from(err);
                run.abort(err.to_string());
                return Err(err);
            }
        }

        let snapshot = run.snapshot();
        run.emit(ProgressEvent::success(format!(
            "Campaign completed! Sent: {}, Failed: {}",
            snapshot.sent, snapshot.failed
        )));
        tracing::info!(
            processed = snapshot.processed(),
            sent = snapshot.sent,
            failed = snapshot.failed,
            "Campaign completed"
        );

        Ok(run.complete())
    }

    async fn deliver(&self, run: &CampaignRun, recipient: &Recipient) -> Result<(), DeliveryError> {
        let message = run.template().render(recipient)?;
        let attachment = run
            .attachment()
            .ok_or_else(|| MailError::Build(String::from("The attachment was released.")))?;
        let email = OutgoingEmail::new(run.sender().clone(), recipient, message, attachment)?;

        self.mailer.send(email).await?;

        Ok(())
    }
}

fn failed(kind: FailureKind, message: String) -> DeliveryStatus {
    DeliveryStatus::Failed(FailureReason::new(kind, message))
}

fn abort(run: &CampaignRun, err: DispatchError) -> DispatchError {
    tracing::error!("Campaign aborted: {:?}", err);

    let reason = match &err {
        DispatchError::Auth(_) => format!("{} {}", err, APP_PASSWORD_HINT),
        _ => err.to_string(),
    };
    run.abort(reason);

    err
}
