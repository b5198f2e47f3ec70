use std::collections::BTreeMap;

use mongodb::{bson::doc, options::SessionOptions};
use serde::Deserialize;

use crate::error::{Rejection, Result};
use crate::model::{
    common::election::{CandidateId, ElectionId},
    db::{election::Election, vote::VoteRecord},
    mongodb::Coll,
};

use super::Ledger;

/// Vote counts per candidate, ordered by candidate ID.
///
/// Every candidate of the election is present; those without votes have a
/// count of zero.
pub type Tally = BTreeMap<CandidateId, u64>;

/// One row of the grouping aggregation.
#[derive(Debug, Deserialize)]
struct CandidateCount {
    #[serde(rename = "_id")]
    candidate_id: CandidateId,
    count: i64,
}

impl<'r> Ledger<'r> {
    /// Count the votes in the given election.
    ///
    /// Reads from a snapshot, so it neither blocks nor is blocked by votes
    /// being cast; votes committed after the snapshot was taken are not
    /// included.
    pub async fn tally(&self, election_id: ElectionId) -> Result<Tally> {
        let session_options = SessionOptions::builder().snapshot(true).build();
        let mut session = self.client.start_session(Some(session_options)).await?;

        let election = Coll::<Election>::from_db(self.db)
            .find_one_with_session(election_id.as_doc(), None, &mut session)
            .await?
            .ok_or(Rejection::UnknownElection)?;

        let mut tally = election
            .candidates
            .iter()
            .map(|candidate| (candidate.clone(), 0))
            .collect::<Tally>();

        let pipeline = [
            doc! {
                "$match": { "election_id": election_id },
            },
            doc! {
                "$group": {
                    "_id": "$candidate_id",
                    "count": { "$sum": 1 },
                },
            },
        ];
        let mut counts = Coll::<VoteRecord>::from_db(self.db)
            .aggregate_with_session(pipeline, None, &mut session)
            .await?
            .with_type::<CandidateCount>();
        while let Some(row) = counts.next(&mut session).await {
            let row = row?;
            let count = u64::try_from(row.count).unwrap_or(0);
            *tally.entry(row.candidate_id).or_insert(0) += count;
        }

        trace!("req{} tallied election {election_id}: {tally:?}", self.request_id);
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mongodb::Database;
    use rocket::{futures::future::join_all, local::asynchronous::Client};

    use super::super::fixtures::{insert_election, insert_voter};
    use super::*;
    use crate::model::db::election::ElectionCore;

    #[backend_test]
    async fn scenario_single_vote(client: Client, db: Database) {
        let ledger = Ledger::from_rocket(client.rocket());
        let election = insert_election(&db, ElectionCore::current_example()).await;
        let voter = insert_voter(&db, "V", [election.id]).await;

        ledger
            .cast_vote(&voter.id, election.id, &"Alice".to_string())
            .await
            .unwrap();
        let err = ledger
            .cast_vote(&voter.id, election.id, &"Bob".to_string())
            .await
            .unwrap_err();
        assert!(err.is_rejection(Rejection::AlreadyVoted));

        let tally = ledger.tally(election.id).await.unwrap();
        assert_eq!(
            tally,
            Tally::from([("Alice".to_string(), 1), ("Bob".to_string(), 0)])
        );
    }

    #[backend_test]
    async fn counts_match_records(client: Client, db: Database) {
        let ledger = Ledger::from_rocket(client.rocket());
        let core = ElectionCore::new(
            "Three way".to_string(),
            Utc::now() - chrono::Duration::hours(1),
            Utc::now() + chrono::Duration::hours(1),
            vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
        )
        .unwrap();
        let election = insert_election(&db, core).await;

        // c1: 3, c2: 5, c3: none.
        let mut ballots = Vec::new();
        for i in 0..8 {
            let voter = insert_voter(&db, &format!("voter-{i}"), [election.id]).await;
            let candidate = if i < 3 { "c1" } else { "c2" };
            ballots.push((voter.id, candidate.to_string()));
        }
        let results = join_all(
            ballots
                .iter()
                .map(|(voter_id, candidate)| ledger.cast_vote(voter_id, election.id, candidate)),
        )
        .await;
        assert!(results.iter().all(|r| r.is_ok()), "results: {results:?}");

        let tally = ledger.tally(election.id).await.unwrap();
        assert_eq!(
            tally,
            Tally::from([
                ("c1".to_string(), 3),
                ("c2".to_string(), 5),
                ("c3".to_string(), 0),
            ])
        );
    }

    #[backend_test]
    async fn empty_and_unknown_elections(client: Client, db: Database) {
        let ledger = Ledger::from_rocket(client.rocket());
        let election = insert_election(&db, ElectionCore::future_example()).await;

        let tally = ledger.tally(election.id).await.unwrap();
        assert_eq!(tally.len(), election.candidates.len());
        assert!(tally.values().all(|count| *count == 0));

        let err = ledger.tally(ElectionId::new()).await.unwrap_err();
        assert!(err.is_rejection(Rejection::UnknownElection));
    }

    #[backend_test]
    async fn tallies_are_per_election(client: Client, db: Database) {
        let ledger = Ledger::from_rocket(client.rocket());
        let first = insert_election(&db, ElectionCore::current_example()).await;
        let second = insert_election(&db, ElectionCore::current_example()).await;
        let voter = insert_voter(&db, "both", [first.id, second.id]).await;

        ledger
            .cast_vote(&voter.id, first.id, &"Alice".to_string())
            .await
            .unwrap();
        ledger
            .cast_vote(&voter.id, second.id, &"Bob".to_string())
            .await
            .unwrap();

        let first_tally = ledger.tally(first.id).await.unwrap();
        let second_tally = ledger.tally(second.id).await.unwrap();
        assert_eq!(first_tally["Alice"], 1);
        assert_eq!(first_tally["Bob"], 0);
        assert_eq!(second_tally["Alice"], 0);
        assert_eq!(second_tally["Bob"], 1);
    }
}
