use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::campaign::{CampaignStore, Dispatcher};
use crate::config::{CampaignSettings, Settings};
use crate::domain::recipient_email::RecipientEmail;
use crate::email_client::{EmailClient, Mailer};
use crate::routes::{
    handle_campaign_events, handle_create_campaign, handle_get_campaign, handle_start_campaign,
    handle_verify_smtp, health_check,
};

/// Address every campaign is sent from, with the configured display name.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub email: RecipientEmail,
    pub name: Option<String>,
}

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let email_client = EmailClient::new(&config.smtp)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;

        Self::build_with_mailer(config, Arc::new(email_client)).await
    }

    /// Same as `build` with a caller provided mail transport.
    pub async fn build_with_mailer(
        config: Settings,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, std::io::Error> {
        let sender = SenderIdentity {
            email: config
                .get_smtp_sender()
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?,
            name: config.smtp.sender_name.clone(),
        };

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, mailer, sender, config.campaign)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    mailer: Arc<dyn Mailer>,
    sender: SenderIdentity,
    campaign_settings: CampaignSettings,
) -> Result<Server, std::io::Error> {
    let upload_limit = campaign_settings.get_upload_limit();
    let dispatcher = web::Data::new(Dispatcher::new(
        mailer.clone(),
        campaign_settings.get_send_interval(),
    ));
    let mailer: web::Data<dyn Mailer> = web::Data::from(mailer);
    let store = web::Data::new(CampaignStore::new());
    let sender = web::Data::new(sender);
    let campaign_settings = web::Data::new(campaign_settings);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/campaigns", web::post().to(handle_create_campaign))
            .route("/campaigns/{id}", web::get().to(handle_get_campaign))
            .route("/campaigns/{id}/start", web::post().to(handle_start_campaign))
            .route("/campaigns/{id}/events", web::get().to(handle_campaign_events))
            .route("/smtp/verify", web::post().to(handle_verify_smtp))
            .app_data(web::JsonConfig::default().limit(upload_limit))
            .app_data(store.clone())
            .app_data(dispatcher.clone())
            .app_data(mailer.clone())
            .app_data(sender.clone())
            .app_data(campaign_settings.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
