use actix_web::{web, HttpResponse, Responder};

use crate::campaign::CampaignStore;

/// Endpoint used by clients and the hosting platform to know if the server is
/// working
#[tracing::instrument(name = "Health Check handler", skip(store))]
pub async fn health_check(store: web::Data<CampaignStore>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "campaigns": store.len(),
    }))
}
