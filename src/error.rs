use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::Responder,
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A business rule that prevented a vote from being cast.
///
/// These are expected outcomes rather than faults, and are reported to the
/// caller as-is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum Rejection {
    #[error("Election does not exist")]
    UnknownElection,
    #[error("Election has not opened yet")]
    ElectionClosed,
    #[error("Election has ended")]
    ElectionEnded,
    #[error("Voter is not registered for this election")]
    NotEligible,
    #[error("Voter has already voted in this election")]
    AlreadyVoted,
    #[error("Candidate does not stand in this election")]
    UnknownCandidate,
}

impl Rejection {
    /// The HTTP status to report this rejection with.
    pub fn status(self) -> Status {
        match self {
            Self::UnknownElection | Self::UnknownCandidate => Status::NotFound,
            Self::ElectionClosed | Self::ElectionEnded | Self::NotEligible => Status::Forbidden,
            Self::AlreadyVoted => Status::Conflict,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    /// Is this the given rejection?
    pub fn is_rejection(&self, rejection: Rejection) -> bool {
        matches!(self, Self::Rejected(r) if *r == rejection)
    }

    /// The HTTP status to report this error with.
    pub fn status(&self) -> Status {
        match self {
            Self::Rejected(rejection) => rejection.status(),
            Self::Db(_) | Self::StoreUnavailable(_) => Status::ServiceUnavailable,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::BadRequest(_) => Status::BadRequest,
        }
    }

    /// Machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected(Rejection::UnknownElection) => "UnknownElection",
            Self::Rejected(Rejection::ElectionClosed) => "ElectionClosed",
            Self::Rejected(Rejection::ElectionEnded) => "ElectionEnded",
            Self::Rejected(Rejection::NotEligible) => "NotEligible",
            Self::Rejected(Rejection::AlreadyVoted) => "AlreadyVoted",
            Self::Rejected(Rejection::UnknownCandidate) => "UnknownCandidate",
            Self::Db(_) | Self::StoreUnavailable(_) => "StoreUnavailable",
            Self::Unauthorized(_) => "Unauthorized",
            Self::BadRequest(_) => "BadRequest",
        }
    }
}

/// The JSON body sent back with any error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.class() == StatusClass::ServerError {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).respond_to(req)
    }
}
