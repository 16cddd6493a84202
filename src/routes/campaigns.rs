use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;
use uuid::Uuid;

use crate::campaign::{CampaignRun, CampaignStore, Dispatcher, StartError};
use crate::config::CampaignSettings;
use crate::domain::attachment::{Attachment, AttachmentError, AttachmentUpload};
use crate::domain::recipient_list::{RecipientList, RecipientsInput, ValidationError};
use crate::domain::template::{MessageTemplate, TemplateError};
use crate::email_client::{mailbox, MailError};
use crate::startup::SenderIdentity;

#[derive(Deserialize, Debug)]
pub struct NewCampaignBody {
    pub recipients: RecipientsInput,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub attachment: AttachmentUpload,
}

#[derive(serde::Serialize)]
struct InvalidRecipient<'a> {
    input: &'a str,
    reason: &'a str,
}

#[tracing::instrument(
    name = "Creating a new campaign",
    skip(body, store, sender, campaign_settings),
    fields(
        subject = %body.subject,
        attachment = %body.attachment.filename
    )
)]
pub async fn handle_create_campaign(
    body: web::Json<NewCampaignBody>,
    store: web::Data<CampaignStore>,
    sender: web::Data<SenderIdentity>,
    campaign_settings: web::Data<CampaignSettings>,
) -> Result<HttpResponse, CreateCampaignError> {
    let body = body.into_inner();

    if body.subject.trim().is_empty() || body.body.trim().is_empty() {
        return Err(CreateCampaignError::MissingFields);
    }

    let recipients = RecipientList::load(body.recipients)?;
    let template = MessageTemplate::parse(&body.subject, &body.body)?;
    let attachment = Attachment::parse(body.attachment, campaign_settings.max_attachment_bytes)?;
    let sender_name = body
        .sender_name
        .filter(|name| !name.trim().is_empty())
        .or_else(|| sender.name.clone());
    let from = mailbox(&sender.email, sender_name.as_deref().map(str::trim))
        .map_err(CreateCampaignError::Sender)?;

    tracing::info!(
        "CV file loaded: {}, Size: {} bytes",
        attachment.filename(),
        attachment.len()
    );

    let total = recipients.len();
    let invalid = serde_json::to_value(
        recipients
            .invalid_entries()
            .map(|(input, error)| InvalidRecipient {
                input,
                reason: &error.message,
            })
            .collect::<Vec<_>>(),
    )
    .map_err(CreateCampaignError::Response)?;

    let run = store.insert(CampaignRun::new(recipients, template, attachment, from));
    let response = serde_json::json!({
        "campaign_id": run.id(),
        "total": total,
        "invalid": invalid,
    });

    Ok(HttpResponse::Created().json(response))
}

#[tracing::instrument(name = "Starting a campaign", skip(store, dispatcher))]
pub async fn handle_start_campaign(
    path: web::Path<Uuid>,
    store: web::Data<CampaignStore>,
    dispatcher: web::Data<Dispatcher>,
) -> Result<HttpResponse, CampaignError> {
    let campaign_id = path.into_inner();
    let run = store
        .get(&campaign_id)
        .ok_or(CampaignError::NotFound(campaign_id))?;

    run.start()?;

    let dispatcher = dispatcher.get_ref().clone();
    let task_run = run.clone();
    tokio::spawn(async move {
        if let Err(err) = dispatcher.run(task_run).await {
            tracing::error!("Campaign {} did not complete: {:?}", campaign_id, err);
        }
    });

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "campaign_id": campaign_id,
        "state": "running",
        "total": run.entries().len(),
    })))
}

#[tracing::instrument(name = "Reading campaign progress", skip(store))]
pub async fn handle_get_campaign(
    path: web::Path<Uuid>,
    store: web::Data<CampaignStore>,
) -> Result<HttpResponse, CampaignError> {
    let campaign_id = path.into_inner();
    let run = store
        .get(&campaign_id)
        .ok_or(CampaignError::NotFound(campaign_id))?;

    Ok(HttpResponse::Ok().json(run.report()))
}

#[derive(thiserror::Error)]
pub enum CreateCampaignError {
    #[error("Missing required fields.")]
    MissingFields,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Template(#[from] TemplateError),
    #[error("{0}")]
    Attachment(#[from] AttachmentError),
    #[error("Invalid sender: {0}")]
    Sender(#[source] MailError),
    #[error("Failed to build the response.")]
    Response(#[source] serde_json::Error),
}

impl std::fmt::Debug for CreateCampaignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl ResponseError for CreateCampaignError {
    fn status_code(&self) -> StatusCode {
        match self {
            CreateCampaignError::MissingFields => StatusCode::BAD_REQUEST,
            CreateCampaignError::Validation(_) => StatusCode::BAD_REQUEST,
            CreateCampaignError::Template(_) => StatusCode::BAD_REQUEST,
            CreateCampaignError::Attachment(_) => StatusCode::BAD_REQUEST,
            CreateCampaignError::Sender(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CreateCampaignError::Response(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[derive(thiserror::Error)]
pub enum CampaignError {
    #[error("Campaign {0} does not exist.")]
    NotFound(Uuid),
    #[error("{0}")]
    AlreadyStarted(#[from] StartError),
}

impl std::fmt::Debug for CampaignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl ResponseError for CampaignError {
    fn status_code(&self) -> StatusCode {
        match self {
            CampaignError::NotFound(_) => StatusCode::NOT_FOUND,
            CampaignError::AlreadyStarted(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}
