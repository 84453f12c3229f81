use actix_web::{http::StatusCode, HttpResponse};
use common::req::ErrorBody;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("store error: {0}")]
    Store(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid update: {0}")]
    Validation(String),
}

impl From<diesel::result::Error> for MonitorError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl actix_web::ResponseError for MonitorError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
