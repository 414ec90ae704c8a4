use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{candidate::Candidate, event::Event, user::User, vote::Vote},
};
use crate::voting::VoteTuple;

/// The body of a judge's submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteBatch {
    pub votes: Vec<VoteTuple>,
}

/// The body of a score amendment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub score: f64,
}

/// An API-friendly vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDescription {
    pub id: ApiId,
    pub event_id: ApiId,
    pub candidate_id: ApiId,
    pub judge_id: ApiId,
    pub score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vote> for VoteDescription {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            event_id: vote.vote.event_id.into(),
            candidate_id: vote.vote.candidate_id.into(),
            judge_id: vote.vote.judge_id.into(),
            score: vote.vote.score,
            created_at: vote.vote.created_at,
            updated_at: vote.vote.updated_at,
        }
    }
}

/// The candidate a vote is for, as shown alongside the vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub number: u32,
    pub name: String,
}

impl From<Candidate> for CandidateSummary {
    fn from(candidate: Candidate) -> Self {
        Self {
            number: candidate.candidate.number,
            name: candidate.candidate.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub name: String,
    pub date: DateTime<Utc>,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            name: event.event.name,
            date: event.event.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeSummary {
    pub name: String,
    pub email: String,
}

impl From<User> for JudgeSummary {
    fn from(user: User) -> Self {
        Self {
            name: user.user.name,
            email: user.user.email,
        }
    }
}

/// A vote with what it refers to filled in.
///
/// A reference is `None` if whatever it named has since been removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteDetails {
    #[serde(flatten)]
    pub vote: VoteDescription,
    pub candidate: Option<CandidateSummary>,
    pub event: Option<EventSummary>,
    pub judge: Option<JudgeSummary>,
}
