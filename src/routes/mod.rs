mod campaign_events;
mod campaigns;
mod health_check;
mod smtp_verify;

pub use campaign_events::handle_campaign_events;
pub use campaigns::{
    handle_create_campaign, handle_get_campaign, handle_start_campaign, CampaignError,
    CreateCampaignError,
};
pub use health_check::health_check;
pub use smtp_verify::{handle_verify_smtp, VerifySmtpError};
