use std::sync::Mutex;

use chrono::Utc;
use mongodb::error::Error as DbError;

use crate::error::Result;
use crate::model::{
    db::{
        candidate::Candidate,
        event::Event,
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};

use super::{EntityStore, VoteFilter, VoteRecord, VoteRejection};

#[derive(Default)]
struct Tables {
    events: Vec<Event>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
}

/// An [`EntityStore`] held in memory, for exercising the core without MongoDB.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    offline: bool,
}

impl MemoryStore {
    /// A store whose every operation fails as if the database were unreachable.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn add_event(&self, event: Event) {
        self.tables.lock().unwrap().events.push(event);
    }

    pub fn add_candidate(&self, candidate: Candidate) {
        self.tables.lock().unwrap().candidates.push(candidate);
    }

    pub fn add_vote(&self, vote: Vote) {
        self.tables.lock().unwrap().votes.push(vote);
    }

    pub fn votes(&self) -> Vec<Vote> {
        self.tables.lock().unwrap().votes.clone()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "offline");
            return Err(DbError::from(cause).into());
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl EntityStore for MemoryStore {
    async fn find_candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        self.check_online()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn find_event_by_id(&self, id: Id) -> Result<Option<Event>> {
        self.check_online()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.events.iter().find(|e| e.id == id).cloned())
    }

    async fn find_vote_by_judge_candidate_event(
        &self,
        judge_id: Id,
        candidate_id: Id,
        event_id: Id,
    ) -> Result<Option<Vote>> {
        self.check_online()?;
        let filter = VoteFilter {
            event_id: Some(event_id),
            judge_id: Some(judge_id),
            candidate_id: Some(candidate_id),
        };
        let tables = self.tables.lock().unwrap();
        Ok(tables.votes.iter().find(|v| filter.matches(v)).cloned())
    }

    async fn list_candidates_by_event(&self, event_id: Id) -> Result<Vec<Candidate>> {
        self.check_online()?;
        let tables = self.tables.lock().unwrap();
        let mut candidates = tables
            .candidates
            .iter()
            .filter(|c| c.event_id == event_id)
            .cloned()
            .collect::<Vec<_>>();
        candidates.sort_by_key(|c| (c.number, c.id));
        Ok(candidates)
    }

    async fn list_votes_by_event(&self, event_id: Id) -> Result<Vec<Vote>> {
        self.list_votes(VoteFilter {
            event_id: Some(event_id),
            ..VoteFilter::default()
        })
        .await
    }

    async fn create_votes(&self, batch: &[VoteRecord]) -> Result<Vec<Vote>> {
        self.check_online()?;
        let mut tables = self.tables.lock().unwrap();

        // Enforce the unique triple the same way the database index would.
        for (index, record) in batch.iter().enumerate() {
            let clashes = tables
                .votes
                .iter()
                .map(|v| (v.judge_id, v.candidate_id, v.event_id))
                .chain(
                    batch[..index]
                        .iter()
                        .map(|r| (r.judge_id, r.candidate_id, r.event_id)),
                )
                .any(|key| key == (record.judge_id, record.candidate_id, record.event_id));
            if clashes {
                return Err(VoteRejection::lost_race(Some(index)).into());
            }
        }

        let now = Utc::now();
        let votes = batch
            .iter()
            .map(|record| Vote {
                id: Id::new(),
                vote: NewVote::from_record(record, now),
            })
            .collect::<Vec<_>>();
        tables.votes.extend(votes.iter().cloned());
        Ok(votes)
    }

    async fn find_vote_by_id(&self, id: Id) -> Result<Option<Vote>> {
        self.check_online()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.votes.iter().find(|v| v.id == id).cloned())
    }

    async fn list_votes(&self, filter: VoteFilter) -> Result<Vec<Vote>> {
        self.check_online()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .votes
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    async fn update_vote_score(&self, id: Id, score: f64) -> Result<Option<Vote>> {
        self.check_online()?;
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.votes.iter_mut().find(|v| v.id == id).map(|vote| {
            vote.score = score;
            vote.updated_at = Utc::now();
            vote.clone()
        }))
    }

    async fn delete_vote(&self, id: Id) -> Result<bool> {
        self.check_online()?;
        let mut tables = self.tables.lock().unwrap();
        let before = tables.votes.len();
        tables.votes.retain(|v| v.id != id);
        Ok(tables.votes.len() < before)
    }
}
