use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, TokenData, Validation};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::common::election::VoterId;

const BEARER_PREFIX: &str = "Bearer ";

/// An already-authenticated voter identity, as asserted by the identity
/// provider. We trust the claim once its signature checks out; credentials
/// are never seen here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterIdentity(pub VoterId);

impl VoterIdentity {
    pub fn id(&self) -> &VoterId {
        &self.0
    }

    /// Extract the identity from an `Authorization` header value.
    pub fn from_header(header: &str, config: &Config) -> Result<Self, Error> {
        let token = header
            .strip_prefix(BEARER_PREFIX)
            .ok_or_else(|| Error::Unauthorized("Expected a bearer token".to_string()))?;
        let claims = jsonwebtoken::decode(
            token.trim(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<IdentityClaims>| data.claims)
        .map_err(|e| Error::Unauthorized(format!("Invalid identity claim: {e}")))?;

        if claims.sub.trim().is_empty() {
            return Err(Error::Unauthorized("Identity claim has no subject".to_string()));
        }
        Ok(Self(claims.sub))
    }
}

/// Claims carried by the identity provider's token.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// The voter's opaque identity.
    pub sub: VoterId,
    #[serde(with = "ts_seconds")]
    pub exp: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterIdentity {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let header = match req.headers().get_one("Authorization") {
            Some(header) => header,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("Missing identity claim".to_string()),
                ))
            }
        };

        match Self::from_header(header, config) {
            Ok(identity) => Outcome::Success(identity),
            Err(e) => {
                debug!("Rejected identity claim: {e}");
                Outcome::Failure((Status::Unauthorized, e))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn accepts_signed_claim() {
        let config = Config::example();
        let header = IdentityClaims::bearer("voter-42", &config);
        let identity = VoterIdentity::from_header(&header, &config).unwrap();
        assert_eq!(identity.id(), "voter-42");
    }

    #[test]
    fn rejects_missing_bearer_prefix() {
        let config = Config::example();
        let header = IdentityClaims::bearer("voter-42", &config);
        let raw = header.trim_start_matches(BEARER_PREFIX);
        assert!(matches!(
            VoterIdentity::from_header(raw, &config),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_expired_claim() {
        let config = Config::example();
        let header = IdentityClaims::bearer_expiring(
            "voter-42",
            Utc::now() - Duration::hours(2),
            &config,
        );
        assert!(VoterIdentity::from_header(&header, &config).is_err());
    }

    #[test]
    fn rejects_empty_subject() {
        let config = Config::example();
        let header = IdentityClaims::bearer("  ", &config);
        assert!(VoterIdentity::from_header(&header, &config).is_err());
    }

    #[test]
    fn rejects_claim_signed_with_other_secret() {
        let config = Config::example();
        let other: Config = rocket::figment::Figment::new()
            .merge(rocket::figment::providers::Serialized::default(
                "jwt_secret",
                "some-other-secret",
            ))
            .extract()
            .unwrap();
        let header = IdentityClaims::bearer("voter-42", &other);
        assert!(VoterIdentity::from_header(&header, &config).is_err());
    }
}
