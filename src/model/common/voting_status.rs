use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Whether a voter has voted in a particular election.
///
/// The only legal transition is `NotVoted` to `Voted`, performed by the
/// ledger when a vote is committed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotingStatus {
    /// Registered for the election, but no vote committed yet.
    NotVoted,
    /// A vote has been committed; nothing more may be cast.
    Voted,
}

impl VotingStatus {
    pub fn has_voted(self) -> bool {
        self == Self::Voted
    }
}

impl From<VotingStatus> for Bson {
    fn from(status: VotingStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
