use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::campaign::event::{ProgressEvent, ProgressSnapshot};
use crate::domain::attachment::Attachment;
use crate::domain::delivery_status::{DeliveryStatus, StatusTransitionError};
use crate::domain::recipient_list::{RecipientEntry, RecipientList};
use crate::domain::template::MessageTemplate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Ready,
    Running,
    Completed,
    Aborted { reason: String },
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("Campaign {0} has already been started.")]
    AlreadyStarted(Uuid),
}

#[derive(Debug, Serialize)]
pub struct RecipientReport {
    pub address: String,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

#[derive(Debug, Serialize)]
pub struct CampaignReport {
    pub campaign_id: Uuid,
    #[serde(flatten)]
    pub state: RunState,
    #[serde(flatten)]
    pub counts: ProgressSnapshot,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub recipients: Vec<RecipientReport>,
}

struct RunProgress {
    state: RunState,
    attachment: Option<Attachment>,
    statuses: Vec<DeliveryStatus>,
    sent: usize,
    failed: usize,
    history: Vec<ProgressEvent>,
    subscribers: Vec<mpsc::UnboundedSender<ProgressEvent>>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl RunProgress {
    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.statuses.len(), self.sent, self.failed)
    }

    fn emit(&mut self, event: ProgressEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        self.history.push(event);
    }

    fn finish(&mut self, state: RunState, event: ProgressEvent) {
        self.state = state;
        self.finished_at = Some(Utc::now());
        // Nothing is sent after this point, release the document.
        self.attachment = None;
        self.emit(event);
        // Dropping the senders ends every open feed.
        self.subscribers.clear();
    }
}

/// One execution of "send to all recipients with this template and
/// attachment". Only the dispatcher mutates it; readers take snapshots.
pub struct CampaignRun {
    id: Uuid,
    created_at: DateTime<Utc>,
    entries: Vec<RecipientEntry>,
    template: MessageTemplate,
    sender: Mailbox,
    progress: Mutex<RunProgress>,
}

impl CampaignRun {
    pub fn new(
        recipients: RecipientList,
        template: MessageTemplate,
        attachment: Attachment,
        sender: Mailbox,
    ) -> CampaignRun {
        let entries = recipients.into_entries();
        let statuses = vec![DeliveryStatus::Pending; entries.len()];

        CampaignRun {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            entries,
            template,
            sender,
            progress: Mutex::new(RunProgress {
                state: RunState::Ready,
                attachment: Some(attachment),
                statuses,
                sent: 0,
                failed: 0,
                history: Vec::new(),
                subscribers: Vec::new(),
                started_at: None,
                finished_at: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entries(&self) -> &[RecipientEntry] {
        &self.entries
    }

    pub fn template(&self) -> &MessageTemplate {
        &self.template
    }

    pub fn sender(&self) -> &Mailbox {
        &self.sender
    }

    // Critical sections never panic, a poisoned lock still holds consistent data.
    fn progress(&self) -> MutexGuard<'_, RunProgress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RunState {
        self.progress().state.clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress().snapshot()
    }

    /// The uploaded document, until the run finishes.
    pub fn attachment(&self) -> Option<Attachment> {
        self.progress().attachment.clone()
    }

    /// Moves the run from `Ready` to `Running`. A run starts once.
    pub fn start(&self) -> Result<(), StartError> {
        let mut progress = self.progress();

        if progress.state != RunState::Ready {
            return Err(StartError::AlreadyStarted(self.id));
        }

        progress.state = RunState::Running;
        progress.started_at = Some(Utc::now());

        Ok(())
    }

    pub fn emit(&self, event: ProgressEvent) {
        self.progress().emit(event);
    }

    /// Stores the final status of the entry at `index` and publishes the new
    /// counts.
    pub fn record(
        &self,
        index: usize,
        outcome: DeliveryStatus,
    ) -> Result<ProgressSnapshot, StatusTransitionError> {
        let mut progress = self.progress();
        let is_sent = outcome.is_sent();

        progress.statuses[index].complete(outcome)?;
        if is_sent {
            progress.sent += 1;
        } else {
            progress.failed += 1;
        }

        let snapshot = progress.snapshot();
        progress.emit(ProgressEvent::Progress(snapshot));

        Ok(snapshot)
    }

    pub fn complete(&self) -> ProgressSnapshot {
        let mut progress = self.progress();
        let snapshot = progress.snapshot();

        progress.finish(
            RunState::Completed,
            ProgressEvent::Complete {
                sent: snapshot.sent,
                failed: snapshot.failed,
            },
        );

        snapshot
    }

    pub fn abort(&self, reason: String) {
        self.progress().finish(
            RunState::Aborted {
                reason: reason.clone(),
            },
            ProgressEvent::Aborted { reason },
        );
    }

    /// Feed of every event so far followed by live ones. Ends when the run
    /// finishes.
    pub fn subscribe(&self) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        let mut progress = self.progress();
        let history = progress.history.clone();
        let (sender, receiver) = mpsc::unbounded_channel();

        if !progress.state.is_finished() {
            progress.subscribers.push(sender);
        }

        tokio_stream::iter(history).chain(UnboundedReceiverStream::new(receiver))
    }

    pub fn report(&self) -> CampaignReport {
        let progress = self.progress();
        let recipients = self
            .entries
            .iter()
            .zip(progress.statuses.iter())
            .map(|(entry, status)| RecipientReport {
                address: entry.address().to_string(),
                status: status.clone(),
            })
            .collect();

        CampaignReport {
            campaign_id: self.id,
            state: progress.state.clone(),
            counts: progress.snapshot(),
            created_at: self.created_at,
            started_at: progress.started_at,
            finished_at: progress.finished_at,
            recipients,
        }
    }
}
