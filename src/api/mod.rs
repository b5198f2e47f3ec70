use rocket::{serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

mod public;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(public::routes());
    routes.extend(voter::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, unauthorized, not_found, unprocessable]
}

/// Errors raised by Rocket itself, before a handler runs, get the same JSON
/// shape as handler errors.
fn caught(kind: &str, req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: kind.to_string(),
        message: format!("{} {}", req.method(), req.uri()),
    })
}

#[catch(400)]
fn bad_request(req: &Request) -> Json<ErrorBody> {
    caught("BadRequest", req)
}

#[catch(401)]
fn unauthorized(req: &Request) -> Json<ErrorBody> {
    caught("Unauthorized", req)
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ErrorBody> {
    caught("NotFound", req)
}

#[catch(422)]
fn unprocessable(req: &Request) -> Json<ErrorBody> {
    caught("BadRequest", req)
}
