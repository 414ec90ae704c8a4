use std::collections::HashMap;

use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{Admin, AnyUser, AuthToken, Judge},
        vote::{
            CandidateSummary, EventSummary, JudgeSummary, ScoreUpdate, VoteBatch,
            VoteDescription, VoteDetails,
        },
    },
    db::{user::User, vote::Vote},
    mongodb::{Coll, Id},
};
use crate::voting::{amend_score, submit_votes, EntityStore, MongoStore, VoteFilter};
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![submit, list, get_vote, update_score, remove]
}

/// Filters for listing votes. All are optional.
#[derive(Debug, FromForm)]
struct VoteQuery {
    #[field(name = "eventId")]
    event_id: Option<Id>,
    #[field(name = "judgeId")]
    judge_id: Option<Id>,
    #[field(name = "candidateId")]
    candidate_id: Option<Id>,
}

impl From<VoteQuery> for VoteFilter {
    fn from(query: VoteQuery) -> Self {
        Self {
            event_id: query.event_id,
            judge_id: query.judge_id,
            candidate_id: query.candidate_id,
        }
    }
}

/// Fills in the candidate, event and judge of votes, reading each at most once.
struct Details<'a> {
    store: &'a MongoStore,
    users: &'a Coll<User>,
    candidates: HashMap<Id, Option<CandidateSummary>>,
    events: HashMap<Id, Option<EventSummary>>,
    judges: HashMap<Id, Option<JudgeSummary>>,
}

impl<'a> Details<'a> {
    fn new(store: &'a MongoStore, users: &'a Coll<User>) -> Self {
        Self {
            store,
            users,
            candidates: HashMap::new(),
            events: HashMap::new(),
            judges: HashMap::new(),
        }
    }

    async fn of(&mut self, vote: Vote) -> Result<VoteDetails> {
        if !self.candidates.contains_key(&vote.candidate_id) {
            let candidate = self.store.find_candidate_by_id(vote.candidate_id).await?;
            self.candidates
                .insert(vote.candidate_id, candidate.map(CandidateSummary::from));
        }
        if !self.events.contains_key(&vote.event_id) {
            let event = self.store.find_event_by_id(vote.event_id).await?;
            self.events.insert(vote.event_id, event.map(EventSummary::from));
        }
        if !self.judges.contains_key(&vote.judge_id) {
            let judge = self.users.find_one(vote.judge_id.as_doc(), None).await?;
            self.judges.insert(vote.judge_id, judge.map(JudgeSummary::from));
        }

        Ok(VoteDetails {
            candidate: self.candidates.get(&vote.candidate_id).cloned().flatten(),
            event: self.events.get(&vote.event_id).cloned().flatten(),
            judge: self.judges.get(&vote.judge_id).cloned().flatten(),
            vote: vote.into(),
        })
    }

    async fn of_all(&mut self, votes: Vec<Vote>) -> Result<Vec<VoteDetails>> {
        let mut details = Vec::with_capacity(votes.len());
        for vote in votes {
            details.push(self.of(vote).await?);
        }
        Ok(details)
    }
}

#[post("/votes", data = "<batch>", format = "json")]
async fn submit(
    token: AuthToken<Judge>,
    batch: Json<VoteBatch>,
    store: MongoStore,
    config: &State<Config>,
) -> Result<Json<Vec<VoteDescription>>> {
    let votes = submit_votes(&store, token.id, &batch.votes, config.score_bounds()).await?;
    Ok(Json(votes.into_iter().map(VoteDescription::from).collect()))
}

#[get("/votes?<query..>")]
async fn list(
    _token: AuthToken<Admin>,
    query: VoteQuery,
    store: MongoStore,
    users: Coll<User>,
) -> Result<Json<Vec<VoteDetails>>> {
    let votes = store.list_votes(query.into()).await?;
    let details = Details::new(&store, &users).of_all(votes).await?;
    Ok(Json(details))
}

/// Find a vote the caller may see: any vote for an admin, only their own for a judge.
async fn visible_vote(
    token: &AuthToken<AnyUser>,
    store: &MongoStore,
    vote_id: Id,
) -> Result<Vote> {
    let vote = store
        .find_vote_by_id(vote_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Vote with ID '{vote_id}'")))?;
    if !token.is_admin() && !vote.cast_by(token.id) {
        return Err(Error::forbidden(format!(
            "Vote {vote_id} was not cast by judge {}",
            token.id
        )));
    }
    Ok(vote)
}

#[get("/votes/<vote_id>")]
async fn get_vote(
    token: AuthToken<AnyUser>,
    vote_id: Id,
    store: MongoStore,
    users: Coll<User>,
) -> Result<Json<VoteDetails>> {
    let vote = visible_vote(&token, &store, vote_id).await?;
    let details = Details::new(&store, &users).of(vote).await?;
    Ok(Json(details))
}

#[put("/votes/<vote_id>", data = "<update>", format = "json")]
async fn update_score(
    token: AuthToken<AnyUser>,
    vote_id: Id,
    update: Json<ScoreUpdate>,
    store: MongoStore,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<VoteDetails>> {
    visible_vote(&token, &store, vote_id).await?;
    let vote = amend_score(&store, vote_id, update.score, config.score_bounds())
        .await?
        // Deleted in the meantime.
        .ok_or_else(|| Error::not_found(format!("Vote with ID '{vote_id}'")))?;
    info!("{} {} set vote {vote_id} to {}", token.rights, token.id, vote.score);
    let details = Details::new(&store, &users).of(vote).await?;
    Ok(Json(details))
}

#[delete("/votes/<vote_id>")]
async fn remove(token: AuthToken<Admin>, vote_id: Id, store: MongoStore) -> Result<()> {
    if !store.delete_vote(vote_id).await? {
        return Err(Error::not_found(format!("Vote with ID '{vote_id}'")));
    }
    info!("Admin {} deleted vote {vote_id}", token.id);
    Ok(())
}
