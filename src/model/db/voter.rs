use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        election::{ElectionId, VoterId},
        voting_status::VotingStatus,
    },
    mongodb::serde_string_map,
};

/// A voter, as stored in the database.
///
/// Voters are registered by the identity layer; this service only flips
/// their per-election status when a vote is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    /// The opaque identity issued by the identity provider.
    #[serde(rename = "_id")]
    pub id: VoterId,
    /// Maps the IDs of the elections the voter is registered for to their
    /// status in that election.
    #[serde(with = "serde_string_map")]
    pub elections: HashMap<ElectionId, VotingStatus>,
}

impl Voter {
    /// Get the voter's status in the given election, or `None` if they are
    /// not registered for it.
    pub fn status(&self, election_id: ElectionId) -> Option<VotingStatus> {
        self.elections.get(&election_id).copied()
    }

    /// The dotted field path of this voter's status for the given election,
    /// for use in queries and updates.
    pub fn status_field(election_id: ElectionId) -> String {
        format!("elections.{}", election_id)
    }
}
