use std::fmt::{Display, Formatter};

use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::mongodb::Id;

use super::ScoreBounds;

/// Why a vote batch was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionKind {
    /// The batch contained no votes at all.
    EmptyBatch,
    /// A score was not a finite number within the configured bounds.
    OutOfRangeScore,
    /// The referenced candidate or event does not exist.
    UnknownCandidateOrEvent,
    /// The candidate is entered in a different event.
    CandidateEventMismatch,
    /// The judge already scored this candidate in this event.
    DuplicateVote,
}

impl Display for RejectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A client-input error that aborts a whole vote batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{kind}: {message}")]
pub struct VoteRejection {
    pub kind: RejectionKind,
    pub message: String,
    /// Position of the first failing tuple in the submitted batch, if any.
    pub offending_tuple_index: Option<usize>,
}

impl VoteRejection {
    pub fn empty_batch() -> Self {
        Self {
            kind: RejectionKind::EmptyBatch,
            message: "A submission must contain at least one vote".to_string(),
            offending_tuple_index: None,
        }
    }

    pub fn out_of_range(index: usize, score: f64, bounds: ScoreBounds) -> Self {
        Self {
            kind: RejectionKind::OutOfRangeScore,
            message: format!("Score {score} is outside the allowed range {bounds}"),
            offending_tuple_index: Some(index),
        }
    }

    /// The score was missing, or neither a number nor a string holding one.
    pub fn unreadable_score(index: usize, raw: &Value) -> Self {
        let message = match raw {
            Value::Null => "Score is missing".to_string(),
            raw => format!("Score {raw} is not a number"),
        };
        Self {
            kind: RejectionKind::OutOfRangeScore,
            message,
            offending_tuple_index: Some(index),
        }
    }

    /// A score amendment, which has no batch position.
    pub fn amended_out_of_range(score: f64, bounds: ScoreBounds) -> Self {
        Self {
            kind: RejectionKind::OutOfRangeScore,
            message: format!("Score {score} is outside the allowed range {bounds}"),
            offending_tuple_index: None,
        }
    }

    pub fn unknown(index: usize, candidate_id: &str, event_id: &str) -> Self {
        Self {
            kind: RejectionKind::UnknownCandidateOrEvent,
            message: format!("Invalid candidate '{candidate_id}' or event '{event_id}'"),
            offending_tuple_index: Some(index),
        }
    }

    pub fn mismatch(index: usize, candidate_id: Id, actual_event: Id, claimed_event: Id) -> Self {
        Self {
            kind: RejectionKind::CandidateEventMismatch,
            message: format!(
                "Candidate {candidate_id} belongs to event {actual_event}, not {claimed_event}"
            ),
            offending_tuple_index: Some(index),
        }
    }

    pub fn already_voted(index: usize, candidate_id: Id, event_id: Id) -> Self {
        Self {
            kind: RejectionKind::DuplicateVote,
            message: format!(
                "You have already voted for candidate {candidate_id} in event {event_id}"
            ),
            offending_tuple_index: Some(index),
        }
    }

    pub fn repeated_in_batch(index: usize, candidate_id: Id, event_id: Id) -> Self {
        Self {
            kind: RejectionKind::DuplicateVote,
            message: format!(
                "Candidate {candidate_id} in event {event_id} appears more than once in this submission"
            ),
            offending_tuple_index: Some(index),
        }
    }

    /// The storage layer's unique index caught a duplicate the checks missed,
    /// e.g. a concurrent submission by the same judge.
    pub fn lost_race(index: Option<usize>) -> Self {
        Self {
            kind: RejectionKind::DuplicateVote,
            message: "A vote for this judge, candidate and event was recorded concurrently"
                .to_string(),
            offending_tuple_index: index,
        }
    }
}
