use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{CandidateId, ElectionId},
    db::election::Election,
};

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    /// Election unique ID.
    pub id: ElectionId,
    /// Election name.
    pub name: String,
    /// Election open time.
    pub start_time: DateTime<Utc>,
    /// Election close time.
    pub end_time: DateTime<Utc>,
    /// Candidates, in ballot order.
    pub candidates: Vec<CandidateId>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            name: election.election.name,
            start_time: election.election.start_time,
            end_time: election.election.end_time,
            candidates: election.election.candidates,
        }
    }
}
