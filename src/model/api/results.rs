use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{candidate::Candidate, event::Event},
};
use crate::voting::CandidateResult;

/// An API-friendly event summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescription {
    pub id: ApiId,
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub active: bool,
}

impl From<Event> for EventDescription {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.into(),
            name: event.event.name,
            description: event.event.description,
            date: event.event.date,
            active: event.event.active,
        }
    }
}

/// An API-friendly candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: ApiId,
    pub event_id: ApiId,
    pub number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            event_id: candidate.candidate.event_id.into(),
            number: candidate.candidate.number,
            name: candidate.candidate.name,
            description: candidate.candidate.description,
            image_url: candidate.candidate.image_url,
        }
    }
}

/// One row of the scoreboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub candidate: CandidateDescription,
    pub total_score: f64,
    pub vote_count: u64,
    pub average_score: f64,
}

/// The ranked scoreboard of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResults {
    pub event: EventDescription,
    pub results: Vec<RankedCandidate>,
}

impl EventResults {
    /// Attach ranks to the ordered output of the aggregation engine.
    pub fn new(event: Event, ranked: Vec<CandidateResult>) -> Self {
        let results = ranked
            .into_iter()
            .enumerate()
            .map(|(index, result)| RankedCandidate {
                rank: index + 1,
                candidate: result.candidate.into(),
                total_score: result.total_score,
                vote_count: result.vote_count,
                average_score: result.average_score,
            })
            .collect();
        Self {
            event: event.into(),
            results,
        }
    }
}
