use std::collections::HashSet;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::model::common::election::{CandidateId, ElectionId};

/// Core election data, as stored in the database.
///
/// Elections are created by administrators outside this service and are
/// only ever read here.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election name.
    pub name: String,
    /// Election open time; votes are accepted from this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Election close time; votes are rejected from this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// The fixed candidate set, in ballot order.
    pub candidates: Vec<CandidateId>,
}

impl ElectionCore {
    /// Create a new election.
    /// Returns `None` if the window is empty or backwards, or if any candidate is duplicated.
    pub fn new(
        name: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        candidates: Vec<CandidateId>,
    ) -> Option<Self> {
        if end_time <= start_time {
            return None;
        }
        let unique = candidates.iter().collect::<HashSet<_>>();
        if unique.len() != candidates.len() {
            return None;
        }
        Some(Self {
            name,
            start_time,
            end_time,
            candidates,
        })
    }

    /// Check that `now` falls within `[start_time, end_time)`.
    pub fn check_window(&self, now: DateTime<Utc>) -> Result<(), Rejection> {
        if now < self.start_time {
            Err(Rejection::ElectionClosed)
        } else if now >= self.end_time {
            Err(Rejection::ElectionEnded)
        } else {
            Ok(())
        }
    }

    /// Does the given candidate stand in this election?
    pub fn has_candidate(&self, candidate: &str) -> bool {
        self.candidates.iter().any(|c| c == candidate)
    }
}

/// An election from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use chrono::Duration;

    use super::*;

    impl ElectionCore {
        /// An election that is open right now, with candidates Alice and Bob.
        pub fn current_example() -> Self {
            let now = Utc::now();
            Self::new(
                "Current Election".to_string(),
                now - Duration::days(1),
                now + Duration::days(1),
                vec!["Alice".to_string(), "Bob".to_string()],
            )
            .unwrap()
        }

        /// An election that has not opened yet.
        pub fn future_example() -> Self {
            let now = Utc::now();
            Self::new(
                "Future Election".to_string(),
                now + Duration::days(1),
                now + Duration::days(2),
                vec!["Alice".to_string(), "Bob".to_string()],
            )
            .unwrap()
        }

        /// An election that has already closed.
        pub fn past_example() -> Self {
            let now = Utc::now();
            Self::new(
                "Past Election".to_string(),
                now - Duration::days(2),
                now - Duration::days(1),
                vec!["Alice".to_string(), "Bob".to_string()],
            )
            .unwrap()
        }
    }

    impl Election {
        pub fn current_example() -> Self {
            Self {
                id: ElectionId::new(),
                election: ElectionCore::current_example(),
            }
        }

        pub fn future_example() -> Self {
            Self {
                id: ElectionId::new(),
                election: ElectionCore::future_example(),
            }
        }

        pub fn past_example() -> Self {
            Self {
                id: ElectionId::new(),
                election: ElectionCore::past_example(),
            }
        }
    }
}
