use actix_web::web::{self, Bytes};
use actix_web::HttpResponse;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::campaign::CampaignStore;
use crate::routes::CampaignError;

/// Streams the progress feed of a campaign as NDJSON: every event so far, then
/// live events until the run completes or aborts.
#[tracing::instrument(name = "Streaming campaign progress", skip(store))]
pub async fn handle_campaign_events(
    path: web::Path<Uuid>,
    store: web::Data<CampaignStore>,
) -> Result<HttpResponse, CampaignError> {
    let campaign_id = path.into_inner();
    let run = store
        .get(&campaign_id)
        .ok_or(CampaignError::NotFound(campaign_id))?;

    let events = run
        .subscribe()
        .map(|event| event.to_ndjson().map(Bytes::from));

    Ok(HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(events))
}
