use crate::model::mongodb::Id;

/// Our election IDs are database IDs.
pub type ElectionId = Id;
/// Our vote record IDs are database IDs.
pub type VoteId = Id;
/// Our candidate IDs (names) are strings.
pub type CandidateId = String;
/// Voter IDs are opaque strings issued by the identity provider.
pub type VoterId = String;
