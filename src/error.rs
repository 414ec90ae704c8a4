use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, serde::json::Json, Request};
use thiserror::Error;

use crate::logging::RequestId;
use crate::voting::{RejectionKind, VoteRejection};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Rejected(#[from] VoteRejection),
    #[error("{0}: {1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, what.into())
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, why.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let id = req.local_cache(RequestId::next);
        match self {
            Self::Rejected(rejection) => {
                warn!("  req{id} Rejected vote submission: {rejection}");
                let status = match rejection.kind {
                    RejectionKind::DuplicateVote => Status::Conflict,
                    _ => Status::BadRequest,
                };
                (status, Json(rejection)).respond_to(req)
            }
            Self::Db(err) => {
                error!("  req{id} Database error: {err}");
                Err(Status::ServiceUnavailable)
            }
            Self::Jwt(err) => {
                warn!("  req{id} Bad token: {err}");
                Err(match err.into_kind() {
                    JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                        Status::Unauthorized
                    }
                    _ => Status::BadRequest,
                })
            }
            Self::Status(status, msg) => {
                warn!("  req{id} {status}: {msg}");
                Err(status)
            }
        }
    }
}
