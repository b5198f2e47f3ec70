use chrono::Utc;
use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{Acknowledgment, ReadConcern, TransactionOptions, WriteConcern},
    ClientSession,
};
use rand::Rng;
use rocket::tokio::time::{sleep, Duration};

use crate::error::{Error, Rejection, Result};
use crate::model::{
    api::vote::CastReceipt,
    common::{
        election::{CandidateId, ElectionId, VoterId},
        voting_status::VotingStatus,
    },
    db::{election::Election, vote::VoteRecord, voter::Voter},
    mongodb::{
        errors::{is_duplicate_key_error, is_transient_transaction_error, is_unknown_commit_result},
        Coll,
    },
};

use super::{check_election, check_voter, Ledger};

impl<'r> Ledger<'r> {
    /// Cast a vote: atomically append the vote record and mark the voter as
    /// having voted.
    ///
    /// Of any number of concurrent calls for the same voter and election, at
    /// most one succeeds; the rest fail with [`Rejection::AlreadyVoted`].
    /// Either both writes are committed or neither is.
    ///
    /// If this returns a store error the outcome is unknown only when the
    /// commit itself could not be confirmed; callers should read the voter's
    /// status before trying again.
    pub async fn cast_vote(
        &self,
        voter_id: &VoterId,
        election_id: ElectionId,
        candidate_id: &CandidateId,
    ) -> Result<CastReceipt> {
        let options = TransactionOptions::builder()
            .read_concern(ReadConcern::snapshot())
            .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
            .max_commit_time(self.config.max_commit_time())
            .build();
        let mut session = self.client.start_session(None).await?;

        let attempts = self.config.commit_retries();
        for attempt in 1..=attempts {
            session.start_transaction(options.clone()).await?;

            let record = match self
                .record_vote(&mut session, voter_id, election_id, candidate_id)
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    if let Err(abort_err) = session.abort_transaction().await {
                        debug!("req{} abort after failed attempt: {abort_err}", self.request_id);
                    }
                    match e {
                        Error::Db(ref db_err) if is_transient_transaction_error(db_err) => {
                            warn!(
                                "req{} vote by {voter_id} in {election_id} conflicted \
(attempt {attempt}/{attempts}): {db_err}",
                                self.request_id
                            );
                            self.backoff(attempt).await;
                            continue;
                        }
                        e => return Err(e),
                    }
                }
            };

            match self.commit(&mut session).await {
                Ok(()) => {
                    info!(
                        "req{} recorded vote {} by {voter_id} in {election_id}",
                        self.request_id, record.id
                    );
                    return Ok(CastReceipt::from(&record));
                }
                Err(e) if is_transient_transaction_error(&e) => {
                    warn!(
                        "req{} commit of vote by {voter_id} in {election_id} was rejected \
(attempt {attempt}/{attempts}): {e}",
                        self.request_id
                    );
                    self.backoff(attempt).await;
                }
                Err(e) => {
                    error!(
                        "req{} commit of vote by {voter_id} in {election_id} failed, \
outcome unknown: {e}",
                        self.request_id
                    );
                    return Err(e.into());
                }
            }
        }

        error!(
            "req{} gave up on vote by {voter_id} in {election_id} after {attempts} attempts",
            self.request_id
        );
        Err(Error::StoreUnavailable(format!(
            "Vote could not be committed after {attempts} attempts"
        )))
    }

    /// One attempt at the body of the vote transaction.
    ///
    /// Everything is re-read inside the transaction: whatever the caller
    /// checked beforehand may be stale.
    async fn record_vote(
        &self,
        session: &mut ClientSession,
        voter_id: &VoterId,
        election_id: ElectionId,
        candidate_id: &CandidateId,
    ) -> Result<VoteRecord> {
        let now = Utc::now();
        let elections = Coll::<Election>::from_db(self.db);
        let voters = Coll::<Voter>::from_db(self.db);
        let votes = Coll::<VoteRecord>::from_db(self.db);

        let election = elections
            .find_one_with_session(election_id.as_doc(), None, session)
            .await?;
        let election = check_election(election.as_ref(), now)?;

        let voter = voters
            .find_one_with_session(doc! { "_id": voter_id }, None, session)
            .await?;
        check_voter(election_id, voter.as_ref())?;

        if !election.has_candidate(candidate_id) {
            return Err(Rejection::UnknownCandidate.into());
        }

        // Flip the status only if it is still unflipped. A concurrent
        // transaction on the same voter makes this a write conflict.
        let status_field = Voter::status_field(election_id);
        let filter = doc! {
            "_id": voter_id,
            &status_field: VotingStatus::NotVoted,
        };
        let update = doc! {
            "$set": {
                &status_field: VotingStatus::Voted,
            }
        };
        let result = voters
            .update_one_with_session(filter, update, None, session)
            .await?;
        if result.modified_count != 1 {
            return Err(Rejection::AlreadyVoted.into());
        }

        let record = VoteRecord::new(voter_id.clone(), election_id, candidate_id.clone(), now);
        match votes.insert_one_with_session(&record, None, session).await {
            Ok(_) => Ok(record),
            Err(e) if is_duplicate_key_error(&e) => Err(Rejection::AlreadyVoted.into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Commit the transaction, retrying only the commit while its result is
    /// unknown. Re-committing is safe: the server applies a transaction once.
    async fn commit(&self, session: &mut ClientSession) -> Result<(), DbError> {
        let attempts = self.config.commit_retries();
        let mut attempt = 1;
        loop {
            match session.commit_transaction().await {
                Ok(()) => return Ok(()),
                Err(e) if is_unknown_commit_result(&e) && attempt < attempts => {
                    warn!("req{} commit result unknown, retrying commit: {e}", self.request_id);
                    self.backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait before the given (1-based) attempt is retried.
    async fn backoff(&self, attempt: u32) {
        let base = self.config.commit_backoff();
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let jitter = rand::thread_rng().gen_range(0..=base_ms);
        let delay = base_ms.saturating_mul(u64::from(attempt)).saturating_add(jitter);
        sleep(Duration::from_millis(delay)).await;
    }
}
