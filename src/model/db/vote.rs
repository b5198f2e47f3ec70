use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::election::{CandidateId, ElectionId, VoteId, VoterId};

/// Core vote data, as stored in the database.
///
/// Vote records are append-only: written once by the ledger, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    /// Foreign Key voter ID.
    pub voter_id: VoterId,
    /// Foreign Key election ID.
    pub election_id: ElectionId,
    /// The chosen candidate.
    pub candidate_id: CandidateId,
    /// When the vote was committed.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

/// A vote record from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    #[serde(rename = "_id")]
    pub id: VoteId,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl VoteRecord {
    /// Create a vote record with a freshly generated ID.
    pub fn new(
        voter_id: VoterId,
        election_id: ElectionId,
        candidate_id: CandidateId,
        cast_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VoteId::new(),
            vote: VoteCore {
                voter_id,
                election_id,
                candidate_id,
                cast_at,
            },
        }
    }
}

impl Deref for VoteRecord {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}
