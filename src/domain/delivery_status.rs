#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Template,
    Send,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed(FailureReason),
}

#[derive(Debug, thiserror::Error)]
#[error("Delivery status is already {0} and cannot change.")]
pub struct StatusTransitionError(&'static str);

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> FailureReason {
        FailureReason {
            kind,
            message: message.into(),
        }
    }
}

impl DeliveryStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, DeliveryStatus::Pending)
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryStatus::Sent)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed(_) => "failed",
        }
    }

    /// Moves a pending status to its final value. A status leaves `Pending`
    /// exactly once.
    pub fn complete(&mut self, outcome: DeliveryStatus) -> Result<(), StatusTransitionError> {
        if !self.is_pending() {
            return Err(StatusTransitionError(self.label()));
        }
        if outcome.is_pending() {
            return Err(StatusTransitionError(self.label()));
        }

        *self = outcome;

        Ok(())
    }
}
