use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Serialize;

use std::sync::PoisonError;

use crate::data::RowID;
use crate::ordering::OrderingError;

#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database lock poisoned: {0}")]
    Poisoned(String),

    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: RowID },

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("Generic internal error: {0}")]
    Generic(String),
}

impl InternalError {
    pub fn invalid(what: impl Into<String>) -> InternalError {
        InternalError::Invalid(what.into())
    }

    pub fn status(&self) -> Status {
        match self {
            InternalError::NotFound { .. } => Status::NotFound,
            InternalError::Invalid(_) => Status::BadRequest,
            _ => Status::InternalServerError,
        }
    }
}

impl<T> From<PoisonError<T>> for InternalError {
    fn from(e: PoisonError<T>) -> InternalError {
        InternalError::Poisoned(e.to_string())
    }
}

impl From<rocket::figment::Error> for InternalError {
    fn from(e: rocket::figment::Error) -> InternalError {
        InternalError::Config(e.to_string())
    }
}

impl From<OrderingError> for InternalError {
    fn from(e: OrderingError) -> InternalError {
        InternalError::Invalid(e.to_string())
    }
}

impl From<&str> for InternalError {
    fn from(s: &str) -> InternalError {
        InternalError::Generic(s.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl<'r> Responder<'r, 'static> for InternalError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status == Status::InternalServerError {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .respond_to(request)
    }
}

pub type InternalResult<T> = Result<T, InternalError>;
