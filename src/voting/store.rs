//! The entity store the voting core reads from and writes to.

use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Database,
};
use rocket::{
    futures::TryStreamExt,
    request::{self, FromRequest, Request},
    State,
};

use crate::error::{Error, Result};
use crate::model::{
    db::{
        candidate::Candidate,
        event::Event,
        vote::{NewVote, Vote},
    },
    mongodb::{duplicate_key_index, is_duplicate_key_error, Coll, Id},
};

use super::{VoteRecord, VoteRejection};

/// Optional constraints when listing votes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteFilter {
    pub event_id: Option<Id>,
    pub judge_id: Option<Id>,
    pub candidate_id: Option<Id>,
}

impl VoteFilter {
    fn as_doc(&self) -> Document {
        let mut filter = doc! {};
        if let Some(event_id) = self.event_id {
            filter.insert("event_id", event_id);
        }
        if let Some(judge_id) = self.judge_id {
            filter.insert("judge_id", judge_id);
        }
        if let Some(candidate_id) = self.candidate_id {
            filter.insert("candidate_id", candidate_id);
        }
        filter
    }

    pub fn matches(&self, vote: &Vote) -> bool {
        self.event_id.map_or(true, |id| vote.event_id == id)
            && self.judge_id.map_or(true, |id| vote.judge_id == id)
            && self.candidate_id.map_or(true, |id| vote.candidate_id == id)
    }
}

/// Durable storage for events, candidates and votes.
///
/// Every failure is a storage failure and is passed up unchanged; the core
/// never retries. The one exception is `create_votes`, which reports a unique
/// index violation as a [`VoteRejection`].
#[rocket::async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_candidate_by_id(&self, id: Id) -> Result<Option<Candidate>>;

    async fn find_event_by_id(&self, id: Id) -> Result<Option<Event>>;

    /// The vote identified by the dedup triple, if any.
    async fn find_vote_by_judge_candidate_event(
        &self,
        judge_id: Id,
        candidate_id: Id,
        event_id: Id,
    ) -> Result<Option<Vote>>;

    /// An event's candidates, ordered by display number.
    async fn list_candidates_by_event(&self, event_id: Id) -> Result<Vec<Candidate>>;

    async fn list_votes_by_event(&self, event_id: Id) -> Result<Vec<Vote>>;

    /// Persist a validated batch: all of it or none of it.
    async fn create_votes(&self, batch: &[VoteRecord]) -> Result<Vec<Vote>>;

    async fn find_vote_by_id(&self, id: Id) -> Result<Option<Vote>>;

    async fn list_votes(&self, filter: VoteFilter) -> Result<Vec<Vote>>;

    /// Change only the score of a vote. Returns the updated vote, if it exists.
    async fn update_vote_score(&self, id: Id, score: f64) -> Result<Option<Vote>>;

    /// Returns whether a vote was deleted.
    async fn delete_vote(&self, id: Id) -> Result<bool>;
}

/// [`EntityStore`] backed by MongoDB.
///
/// Batch inserts run in a transaction, so the deployment must be a replica set.
pub struct MongoStore {
    client: Client,
    events: Coll<Event>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
}

impl MongoStore {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            events: Coll::from_db(db),
            candidates: Coll::from_db(db),
            votes: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for MongoStore {
    type Error = ();

    /// Build a store from the managed client and database.
    ///
    /// Panics iff either is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let client = req.guard::<&State<Client>>().await.unwrap();
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(MongoStore::new(client.inner().clone(), db))
    }
}

#[rocket::async_trait]
impl EntityStore for MongoStore {
    async fn find_candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.candidates.find_one(id.as_doc(), None).await?)
    }

    async fn find_event_by_id(&self, id: Id) -> Result<Option<Event>> {
        Ok(self.events.find_one(id.as_doc(), None).await?)
    }

    async fn find_vote_by_judge_candidate_event(
        &self,
        judge_id: Id,
        candidate_id: Id,
        event_id: Id,
    ) -> Result<Option<Vote>> {
        let filter = doc! {
            "judge_id": judge_id,
            "candidate_id": candidate_id,
            "event_id": event_id,
        };
        Ok(self.votes.find_one(filter, None).await?)
    }

    async fn list_candidates_by_event(&self, event_id: Id) -> Result<Vec<Candidate>> {
        let options = FindOptions::builder()
            .sort(doc! {"number": 1, "_id": 1})
            .build();
        let candidates = self
            .candidates
            .find(doc! {"event_id": event_id}, options)
            .await?
            .try_collect()
            .await?;
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
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        // Stamp at the precision the database keeps.
        let now = BsonDateTime::now().to_chrono();
        let votes = batch
            .iter()
            .map(|record| Vote {
                id: Id::new(),
                vote: NewVote::from_record(record, now),
            })
            .collect::<Vec<_>>();

        // Dropping the session without committing aborts the transaction.
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        if let Err(e) = self
            .votes
            .insert_many_with_session(&votes, None, &mut session)
            .await
        {
            if is_duplicate_key_error(&e) {
                return Err(VoteRejection::lost_race(duplicate_key_index(&e)).into());
            }
            return Err(Error::Db(e));
        }
        session.commit_transaction().await?;

        Ok(votes)
    }

    async fn find_vote_by_id(&self, id: Id) -> Result<Option<Vote>> {
        Ok(self.votes.find_one(id.as_doc(), None).await?)
    }

    async fn list_votes(&self, filter: VoteFilter) -> Result<Vec<Vote>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let votes = self
            .votes
            .find(filter.as_doc(), options)
            .await?
            .try_collect()
            .await?;
        Ok(votes)
    }

    async fn update_vote_score(&self, id: Id, score: f64) -> Result<Option<Vote>> {
        let update = doc! {
            "$set": {
                "score": score,
                "updated_at": BsonDateTime::now(),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .votes
            .find_one_and_update(id.as_doc(), update, options)
            .await?)
    }

    async fn delete_vote(&self, id: Id) -> Result<bool> {
        let result = self.votes.delete_one(id.as_doc(), None).await?;
        Ok(result.deleted_count == 1)
    }
}

#[cfg(test)]
mod tests {
    use mongodb::Database;

    use super::*;
    use crate::model::db::{
        candidate::NewCandidate,
        event::{Event, NewEvent},
    };
    use crate::voting::RejectionKind;

    async fn insert_event(db: &Database) -> Id {
        let event = Event {
            id: Id::new(),
            event: NewEvent::example(),
        };
        Coll::<Event>::from_db(db)
            .insert_one(&event, None)
            .await
            .unwrap();
        event.id
    }

    async fn insert_candidate(db: &Database, event_id: Id, number: u32) -> Candidate {
        let candidate = Candidate {
            id: Id::new(),
            candidate: NewCandidate::example(event_id, number, &format!("Candidate {number}")),
        };
        Coll::<Candidate>::from_db(db)
            .insert_one(&candidate, None)
            .await
            .unwrap();
        candidate
    }

    fn record(judge_id: Id, candidate: &Candidate, score: f64) -> VoteRecord {
        VoteRecord {
            event_id: candidate.event_id,
            candidate_id: candidate.id,
            judge_id,
            score,
        }
    }

    #[backend_test]
    async fn lists_candidates_by_number(db: Database) {
        let store = MongoStore::new(crate::db_client().await, &db);
        let event_id = insert_event(&db).await;
        let third = insert_candidate(&db, event_id, 3).await;
        let first = insert_candidate(&db, event_id, 1).await;
        insert_candidate(&db, insert_event(&db).await, 2).await;

        let listed = store.list_candidates_by_event(event_id).await.unwrap();
        assert_eq!(listed, vec![first, third]);
    }

    #[backend_test]
    async fn creates_and_finds_votes(db: Database) {
        let store = MongoStore::new(crate::db_client().await, &db);
        let event_id = insert_event(&db).await;
        let alice = insert_candidate(&db, event_id, 1).await;
        let bella = insert_candidate(&db, event_id, 2).await;
        let judge = Id::new();

        let created = store
            .create_votes(&[record(judge, &alice, 8.0), record(judge, &bella, 6.5)])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        let found = store
            .find_vote_by_judge_candidate_event(judge, bella.id, event_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.score, 6.5);
        assert_eq!(found.id, created[1].id);

        let by_event = store.list_votes_by_event(event_id).await.unwrap();
        assert_eq!(by_event.len(), 2);
    }

    #[backend_test]
    async fn unique_index_rejects_whole_batch(db: Database) {
        let store = MongoStore::new(crate::db_client().await, &db);
        let event_id = insert_event(&db).await;
        let alice = insert_candidate(&db, event_id, 1).await;
        let bella = insert_candidate(&db, event_id, 2).await;
        let judge = Id::new();

        store
            .create_votes(&[record(judge, &alice, 8.0)])
            .await
            .unwrap();

        // Bypasses validation, as a concurrent submission would.
        let result = store
            .create_votes(&[record(judge, &bella, 5.0), record(judge, &alice, 9.0)])
            .await;
        match result {
            Err(Error::Rejected(rejection)) => {
                assert_eq!(rejection.kind, RejectionKind::DuplicateVote)
            }
            other => panic!("Expected a duplicate vote rejection, got {other:?}"),
        }

        // Nothing from the failed batch was kept.
        let votes = store.list_votes_by_event(event_id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].score, 8.0);
    }

    #[backend_test]
    async fn updates_and_deletes(db: Database) {
        let store = MongoStore::new(crate::db_client().await, &db);
        let event_id = insert_event(&db).await;
        let alice = insert_candidate(&db, event_id, 1).await;
        let judge = Id::new();
        let vote = store
            .create_votes(&[record(judge, &alice, 4.0)])
            .await
            .unwrap()
            .remove(0);

        let updated = store.update_vote_score(vote.id, 7.5).await.unwrap().unwrap();
        assert_eq!(updated.score, 7.5);
        assert_eq!(updated.judge_id, judge);
        assert_eq!(updated.candidate_id, alice.id);

        assert!(store.update_vote_score(Id::new(), 1.0).await.unwrap().is_none());

        assert!(store.delete_vote(vote.id).await.unwrap());
        assert!(!store.delete_vote(vote.id).await.unwrap());
        assert!(store.find_vote_by_id(vote.id).await.unwrap().is_none());
    }

    #[backend_test]
    async fn filters_votes(db: Database) {
        let store = MongoStore::new(crate::db_client().await, &db);
        let event_id = insert_event(&db).await;
        let alice = insert_candidate(&db, event_id, 1).await;
        let bella = insert_candidate(&db, event_id, 2).await;
        let (judge1, judge2) = (Id::new(), Id::new());
        store
            .create_votes(&[
                record(judge1, &alice, 1.0),
                record(judge1, &bella, 2.0),
                record(judge2, &alice, 3.0),
            ])
            .await
            .unwrap();

        let filter = VoteFilter {
            judge_id: Some(judge1),
            ..VoteFilter::default()
        };
        assert_eq!(store.list_votes(filter).await.unwrap().len(), 2);

        let filter = VoteFilter {
            judge_id: Some(judge2),
            candidate_id: Some(alice.id),
            event_id: Some(event_id),
        };
        let votes = store.list_votes(filter).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].score, 3.0);

        assert_eq!(store.list_votes(VoteFilter::default()).await.unwrap().len(), 3);
    }
}
