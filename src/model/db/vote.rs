use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;
use crate::voting::VoteRecord;

/// Core vote data, as stored in the database.
///
/// The `(judge_id, candidate_id, event_id)` triple is unique across the
/// collection, see [`crate::model::mongodb::ensure_indexes_exist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteCore {
    /// Foreign key: the event being judged.
    pub event_id: Id,
    /// Foreign key: the candidate being scored.
    pub candidate_id: Id,
    /// Foreign key: the judge who cast this vote.
    pub judge_id: Id,
    /// The score awarded.
    pub score: f64,
    /// When the vote was first recorded.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// When the score was last changed.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl VoteCore {
    /// Turn a validated record into a storable vote, stamped at `now`.
    pub fn from_record(record: &VoteRecord, now: DateTime<Utc>) -> Self {
        Self {
            event_id: record.event_id,
            candidate_id: record.candidate_id,
            judge_id: record.judge_id,
            score: record.score,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Vote {
    /// Was this vote cast by the given judge?
    pub fn cast_by(&self, judge_id: Id) -> bool {
        self.vote.judge_id == judge_id
    }
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}
