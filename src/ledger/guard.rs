use chrono::{DateTime, Utc};
use mongodb::bson::doc;

use crate::error::{Rejection, Result};
use crate::model::{
    api::vote::{Eligibility, VoterStatus},
    common::election::{ElectionId, VoterId},
    db::{election::Election, voter::Voter},
    mongodb::Coll,
};

use super::Ledger;

/// Election-level rules: the election exists and is open at `now`.
pub fn check_election(
    election: Option<&Election>,
    now: DateTime<Utc>,
) -> Result<&Election, Rejection> {
    let election = election.ok_or(Rejection::UnknownElection)?;
    election.check_window(now)?;
    Ok(election)
}

/// Voter-level rules: the voter is registered for the election and has not
/// voted in it yet.
pub fn check_voter(election_id: ElectionId, voter: Option<&Voter>) -> Result<(), Rejection> {
    let status = voter
        .and_then(|voter| voter.status(election_id))
        .ok_or(Rejection::NotEligible)?;
    if status.has_voted() {
        return Err(Rejection::AlreadyVoted);
    }
    Ok(())
}

impl<'r> Ledger<'r> {
    /// Decide whether the voter may vote in the election right now.
    ///
    /// This is a plain read with no side effects, meant for fast feedback.
    /// Its answer can be stale by the time a vote is cast; `cast_vote`
    /// checks everything again inside its transaction.
    pub async fn check_eligible(
        &self,
        voter_id: &VoterId,
        election_id: ElectionId,
    ) -> Result<Eligibility> {
        let now = Utc::now();

        let election = Coll::<Election>::from_db(self.db)
            .find_one(election_id.as_doc(), None)
            .await?;
        if let Err(reason) = check_election(election.as_ref(), now) {
            return Ok(Eligibility::ineligible(reason));
        }

        let voter = Coll::<Voter>::from_db(self.db)
            .find_one(doc! { "_id": voter_id }, None)
            .await?;
        let eligibility = Eligibility::from(check_voter(election_id, voter.as_ref()));
        if let Some(reason) = eligibility.reason {
            debug!("req{} voter {voter_id} ineligible for {election_id}: {reason}", self.request_id);
        }
        Ok(eligibility)
    }

    /// Read the voter's recorded status in the election.
    ///
    /// Callers whose cast timed out should use this to learn whether their
    /// vote landed before trying again.
    pub async fn voter_status(
        &self,
        voter_id: &VoterId,
        election_id: ElectionId,
    ) -> Result<VoterStatus> {
        let elections = Coll::<Election>::from_db(self.db);
        if elections
            .find_one(election_id.as_doc(), None)
            .await?
            .is_none()
        {
            return Err(Rejection::UnknownElection.into());
        }

        let status = Coll::<Voter>::from_db(self.db)
            .find_one(doc! { "_id": voter_id }, None)
            .await?
            .and_then(|voter| voter.status(election_id))
            .ok_or(Rejection::NotEligible)?;
        Ok(VoterStatus {
            election_id,
            status,
        })
    }
}
