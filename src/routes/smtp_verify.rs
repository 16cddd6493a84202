use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

use crate::email_client::{MailError, Mailer};

/// Checks that the configured relay accepts the configured credentials.
#[tracing::instrument(name = "Verifying SMTP credentials", skip(mailer))]
pub async fn handle_verify_smtp(
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, VerifySmtpError> {
    mailer.verify().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "message": "Authentication successful",
    })))
}

#[derive(thiserror::Error)]
pub enum VerifySmtpError {
    #[error("Authentication failed. Use an app password rather than the account password.")]
    Auth(#[source] MailError),
    #[error("{0}")]
    Unreachable(#[source] MailError),
}

impl From<MailError> for VerifySmtpError {
    fn from(err: MailError) -> Self {
        if err.is_auth() {
            VerifySmtpError::Auth(err)
        } else {
            VerifySmtpError::Unreachable(err)
        }
    }
}

impl std::fmt::Debug for VerifySmtpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl ResponseError for VerifySmtpError {
    fn status_code(&self) -> StatusCode {
        match self {
            VerifySmtpError::Auth(_) => StatusCode::UNAUTHORIZED,
            VerifySmtpError::Unreachable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        }))
    }
}
