use std::collections::{HashMap, HashSet};

use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{db::candidate::Candidate, mongodb::Id};

use super::{EntityStore, ScoreBounds, VoteRejection};

/// One vote of a judge's submission, as it arrives from the client.
///
/// Identifiers and the score stay as they were sent so that a malformed one
/// can be reported against its position in the batch rather than failing the
/// whole request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTuple {
    #[serde(alias = "candidate")]
    pub candidate_id: String,
    #[serde(alias = "event")]
    pub event_id: String,
    /// A number, or a string holding one. Null when absent.
    #[serde(default)]
    pub score: Value,
}

impl VoteTuple {
    pub fn new(candidate_id: Id, event_id: Id, score: f64) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            event_id: event_id.to_string(),
            score: Value::from(score),
        }
    }

    /// The score as a number, if it is one or is a string that parses as one.
    fn score(&self) -> Option<f64> {
        match &self.score {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// The candidate and event IDs, if both are well-formed.
    fn ids(&self) -> Option<(Id, Id)> {
        let candidate_id = self.candidate_id.trim().parse().ok()?;
        let event_id = self.event_id.trim().parse().ok()?;
        Some((candidate_id, event_id))
    }
}

/// A validated vote, ready to be persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteRecord {
    pub event_id: Id,
    pub candidate_id: Id,
    pub judge_id: Id,
    pub score: f64,
}

/// The slice of stored state that decides whether one judge's batch is admissible.
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    candidates: HashMap<Id, Candidate>,
    events: HashSet<Id>,
    /// `(candidate, event)` pairs this judge has already voted on.
    voted: HashSet<(Id, Id)>,
}

impl BatchContext {
    /// Read everything the batch refers to from the store.
    ///
    /// Each distinct candidate, event and `(candidate, event)` pair is looked
    /// up once. Tuples with malformed IDs are skipped; validation reports them.
    pub async fn fetch<S>(store: &S, judge_id: Id, tuples: &[VoteTuple]) -> Result<Self>
    where
        S: EntityStore + ?Sized,
    {
        let mut context = Self::default();
        let mut seen_candidates = HashSet::new();
        let mut seen_events = HashSet::new();
        let mut seen_pairs = HashSet::new();

        for (candidate_id, event_id) in tuples.iter().filter_map(VoteTuple::ids) {
            if seen_candidates.insert(candidate_id) {
                if let Some(candidate) = store.find_candidate_by_id(candidate_id).await? {
                    context.candidates.insert(candidate_id, candidate);
                }
            }
            if seen_events.insert(event_id) && store.find_event_by_id(event_id).await?.is_some() {
                context.events.insert(event_id);
            }
            if seen_pairs.insert((candidate_id, event_id))
                && store
                    .find_vote_by_judge_candidate_event(judge_id, candidate_id, event_id)
                    .await?
                    .is_some()
            {
                context.voted.insert((candidate_id, event_id));
            }
        }

        Ok(context)
    }

    pub fn with_candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.insert(candidate.id, candidate);
        self
    }

    pub fn with_event(mut self, event_id: Id) -> Self {
        self.events.insert(event_id);
        self
    }

    pub fn with_existing_vote(mut self, candidate_id: Id, event_id: Id) -> Self {
        self.voted.insert((candidate_id, event_id));
        self
    }
}

/// Decide whether a judge's batch may be written, without touching the store.
///
/// Tuples are checked in order: score range, existence, candidate/event
/// agreement, then duplicates against both `context` and earlier tuples.
/// The first failure rejects the whole batch. `context` must have been
/// fetched for the same `judge_id`.
pub fn validate_batch(
    judge_id: Id,
    tuples: &[VoteTuple],
    context: &BatchContext,
    bounds: ScoreBounds,
) -> std::result::Result<Vec<VoteRecord>, VoteRejection> {
    if tuples.is_empty() {
        return Err(VoteRejection::empty_batch());
    }

    let mut accepted = HashSet::with_capacity(tuples.len());
    tuples
        .iter()
        .enumerate()
        .map(|(index, tuple)| {
            let score = tuple
                .score()
                .ok_or_else(|| VoteRejection::unreadable_score(index, &tuple.score))?;
            if !bounds.contains(score) {
                return Err(VoteRejection::out_of_range(index, score, bounds));
            }

            let unknown = || VoteRejection::unknown(index, &tuple.candidate_id, &tuple.event_id);
            let (candidate_id, event_id) = tuple.ids().ok_or_else(unknown)?;
            let candidate = context
                .candidates
                .get(&candidate_id)
                .filter(|_| context.events.contains(&event_id))
                .ok_or_else(unknown)?;

            if candidate.event_id != event_id {
                return Err(VoteRejection::mismatch(
                    index,
                    candidate_id,
                    candidate.event_id,
                    event_id,
                ));
            }

            if context.voted.contains(&(candidate_id, event_id)) {
                return Err(VoteRejection::already_voted(index, candidate_id, event_id));
            }
            if !accepted.insert((candidate_id, event_id)) {
                return Err(VoteRejection::repeated_in_batch(
                    index,
                    candidate_id,
                    event_id,
                ));
            }

            Ok(VoteRecord {
                event_id,
                candidate_id,
                judge_id,
                score,
            })
        })
        .collect()
}
