use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::model::{
    api::{
        identity::VoterIdentity,
        vote::{CastReceipt, Eligibility, VoteRequest, VoterStatus},
    },
    common::election::ElectionId,
};

pub fn routes() -> Vec<Route> {
    routes![eligibility, status, cast_vote]
}

#[get("/elections/<election_id>/eligibility")]
async fn eligibility(
    voter: VoterIdentity,
    election_id: ElectionId,
    ledger: Ledger<'_>,
) -> Result<Json<Eligibility>> {
    let eligibility = ledger.check_eligible(voter.id(), election_id).await?;
    Ok(Json(eligibility))
}

#[get("/elections/<election_id>/status")]
async fn status(
    voter: VoterIdentity,
    election_id: ElectionId,
    ledger: Ledger<'_>,
) -> Result<Json<VoterStatus>> {
    let status = ledger.voter_status(voter.id(), election_id).await?;
    Ok(Json(status))
}

#[post("/elections/<election_id>/votes", data = "<vote>", format = "json")]
async fn cast_vote(
    voter: VoterIdentity,
    election_id: ElectionId,
    vote: Json<VoteRequest>,
    ledger: Ledger<'_>,
) -> Result<Json<CastReceipt>> {
    let vote = vote.into_inner();
    if vote.candidate.is_empty() {
        return Err(Error::BadRequest("No candidate given".to_string()));
    }

    // Fail fast on the cheap read; the cast checks again atomically.
    if let Some(reason) = ledger.check_eligible(voter.id(), election_id).await?.reason {
        return Err(reason.into());
    }

    let receipt = ledger
        .cast_vote(voter.id(), election_id, &vote.candidate)
        .await?;
    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use mongodb::{bson::doc, Database};
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use crate::error::ErrorBody;
    use crate::model::{
        api::identity::IdentityClaims,
        common::voting_status::VotingStatus,
        db::{
            election::{Election, ElectionCore},
            vote::VoteRecord,
            voter::Voter,
        },
        mongodb::Coll,
    };
    use crate::Config;

    use super::*;

    /// Insert an election and a voter registered for it.
    async fn setup(db: &Database, core: ElectionCore, voter_id: &str) -> Election {
        let election = Election {
            id: ElectionId::new(),
            election: core,
        };
        Coll::<Election>::from_db(db)
            .insert_one(&election, None)
            .await
            .unwrap();
        Coll::<Voter>::from_db(db)
            .insert_one(Voter::example(voter_id, [election.id]), None)
            .await
            .unwrap();
        election
    }

    fn auth(client: &Client, voter_id: &str) -> Header<'static> {
        let config = client.rocket().state::<Config>().unwrap();
        Header::new("Authorization", IdentityClaims::bearer(voter_id, config))
    }

    #[backend_test]
    async fn cast_and_read_back(client: Client, db: Database, votes: Coll<VoteRecord>) {
        let election = setup(&db, ElectionCore::current_example(), "carol").await;

        let response = client
            .get(uri!(eligibility(election.id)))
            .header(auth(&client, "carol"))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let eligibility =
            serde_json::from_str::<Eligibility>(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(eligibility, Eligibility::eligible());

        let response = client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .header(auth(&client, "carol"))
            .body(json!(VoteRequest { candidate: "Alice".to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let receipt =
            serde_json::from_str::<CastReceipt>(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(receipt.election_id, election.id);

        let record = votes
            .find_one(receipt.vote_id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.voter_id, "carol");
        assert_eq!(record.candidate_id, "Alice");

        let response = client
            .get(uri!(status(election.id)))
            .header(auth(&client, "carol"))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let status =
            serde_json::from_str::<VoterStatus>(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(status.status, VotingStatus::Voted);
    }

    #[backend_test]
    async fn second_cast_conflicts(client: Client, db: Database, votes: Coll<VoteRecord>) {
        let election = setup(&db, ElectionCore::current_example(), "dave").await;

        for (candidate, expected) in [("Alice", Status::Ok), ("Bob", Status::Conflict)] {
            let response = client
                .post(uri!(cast_vote(election.id)))
                .header(ContentType::JSON)
                .header(auth(&client, "dave"))
                .body(json!({ "candidate": candidate }).to_string())
                .dispatch()
                .await;
            assert_eq!(expected, response.status());
        }

        let count = votes
            .count_documents(doc! { "voter_id": "dave" }, None)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[backend_test]
    async fn rejections_carry_their_kind(client: Client, db: Database) {
        let future = setup(&db, ElectionCore::future_example(), "erin").await;
        let current = setup(&db, ElectionCore::current_example(), "frank").await;

        let cases = [
            (future.id, "erin", "Alice", Status::Forbidden, "ElectionClosed"),
            (current.id, "erin", "Alice", Status::Forbidden, "NotEligible"),
            (current.id, "frank", "Zed", Status::NotFound, "UnknownCandidate"),
            (ElectionId::new(), "frank", "Alice", Status::NotFound, "UnknownElection"),
        ];
        for (election_id, voter, candidate, status, kind) in cases {
            let response = client
                .post(uri!(cast_vote(election_id)))
                .header(ContentType::JSON)
                .header(auth(&client, voter))
                .body(json!({ "candidate": candidate }).to_string())
                .dispatch()
                .await;
            assert_eq!(status, response.status(), "{kind}");
            let body =
                serde_json::from_str::<ErrorBody>(&response.into_string().await.unwrap()).unwrap();
            assert_eq!(body.error, kind);
        }
    }

    #[backend_test]
    async fn empty_candidate_is_bad_request(client: Client, db: Database) {
        let election = setup(&db, ElectionCore::current_example(), "gina").await;

        let response = client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .header(auth(&client, "gina"))
            .body(json!({ "candidate": "" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test("ivy")]
    async fn registered_elsewhere_is_ineligible(client: Client, elections: Coll<Election>) {
        let election = Election::current_example();
        elections.insert_one(&election, None).await.unwrap();

        let response = client
            .get(uri!(eligibility(election.id)))
            .header(auth(&client, "ivy"))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let eligibility =
            serde_json::from_str::<Eligibility>(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(
            eligibility,
            Eligibility::ineligible(crate::error::Rejection::NotEligible)
        );
    }

    #[backend_test]
    async fn identity_required(client: Client, db: Database) {
        let election = setup(&db, ElectionCore::current_example(), "hank").await;

        let response = client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate": "Alice" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = client
            .get(uri!(status(election.id)))
            .header(Header::new("Authorization", "Bearer not-a-token"))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        let body =
            serde_json::from_str::<ErrorBody>(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body.error, "Unauthorized");
    }
}
