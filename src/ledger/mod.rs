//! The vote ledger: eligibility checks, the atomic cast path, and tallies.
//!
//! All mutual exclusion between concurrent casts lives in the database
//! (a transaction, a conditional status update, and a unique index on
//! `(voter_id, election_id)`), since requests for the same voter may be
//! served by different processes.

use mongodb::{Client as DbClient, Database};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::config::Config;
use crate::logging::RequestId;

mod commit;
mod guard;
mod tally;

pub use guard::{check_election, check_voter};
pub use tally::Tally;

/// A handle on the ledger for the duration of one request.
///
/// Sessions are started on the pooled client per operation and released
/// when the operation returns, so nothing is shared between requests beyond
/// the pool itself.
pub struct Ledger<'r> {
    client: &'r DbClient,
    db: &'r Database,
    config: &'r Config,
    request_id: RequestId,
}

impl<'r> Ledger<'r> {
    pub fn new(
        client: &'r DbClient,
        db: &'r Database,
        config: &'r Config,
        request_id: RequestId,
    ) -> Self {
        Self {
            client,
            db,
            config,
            request_id,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Ledger<'r> {
    type Error = ();

    /// Assemble the ledger from managed state.
    ///
    /// Panics iff the database or config is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let client = req.guard::<&State<DbClient>>().await.unwrap().inner();
        let db = req.guard::<&State<Database>>().await.unwrap().inner();
        let config = req.guard::<&State<Config>>().await.unwrap().inner();
        let request_id = *req.local_cache(RequestId::next);
        request::Outcome::Success(Ledger::new(client, db, config, request_id))
    }
}

#[cfg(test)]
impl<'r> Ledger<'r> {
    /// Build a ledger straight from a test server's managed state.
    pub fn from_rocket(rocket: &'r rocket::Rocket<rocket::Orbit>) -> Self {
        Self::new(
            rocket.state::<DbClient>().unwrap(),
            rocket.state::<Database>().unwrap(),
            rocket.state::<Config>().unwrap(),
            RequestId::next(),
        )
    }
}
