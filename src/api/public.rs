use rocket::{serde::json::Json, Route};

use crate::error::{Rejection, Result};
use crate::ledger::{Ledger, Tally};
use crate::model::{
    api::election::ElectionDescription, common::election::ElectionId, db::election::Election,
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![election, tally]
}

#[get("/elections/<election_id>")]
async fn election(
    election_id: ElectionId,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let election = elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or(Rejection::UnknownElection)?;
    Ok(Json(election.into()))
}

#[get("/elections/<election_id>/tally")]
async fn tally(election_id: ElectionId, ledger: Ledger<'_>) -> Result<Json<Tally>> {
    let tally = ledger.tally(election_id).await?;
    Ok(Json(tally))
}
