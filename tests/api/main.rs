mod campaign_events;
mod campaigns;
mod smtp_verify;
