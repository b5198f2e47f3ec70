use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::model::{
    common::{
        election::{CandidateId, ElectionId, VoteId},
        voting_status::VotingStatus,
    },
    db::vote::VoteRecord,
};

/// A vote the voter wishes to cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub candidate: CandidateId,
}

/// Proof of a committed vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastReceipt {
    pub vote_id: VoteId,
    pub election_id: ElectionId,
    pub cast_at: DateTime<Utc>,
}

impl From<&VoteRecord> for CastReceipt {
    fn from(record: &VoteRecord) -> Self {
        Self {
            vote_id: record.id,
            election_id: record.election_id,
            cast_at: record.cast_at,
        }
    }
}

/// The outcome of the advisory eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    /// Why the voter may not vote, if they may not.
    pub reason: Option<Rejection>,
}

impl Eligibility {
    pub fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    pub fn ineligible(reason: Rejection) -> Self {
        Self {
            eligible: false,
            reason: Some(reason),
        }
    }
}

impl From<Result<(), Rejection>> for Eligibility {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => Self::eligible(),
            Err(reason) => Self::ineligible(reason),
        }
    }
}

/// A voter's status in one election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
    pub election_id: ElectionId,
    pub status: VotingStatus,
}
