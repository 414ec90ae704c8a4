use crate::error::Result;
use crate::model::{
    db::{event::Event, vote::Vote},
    mongodb::Id,
};

use super::{
    compute_results, validate_batch, BatchContext, CandidateResult, EntityStore, ScoreBounds,
    VoteRejection, VoteTuple,
};

/// Validate a judge's batch against the store and persist it as a whole.
///
/// Returns the created votes in submission order. A rejected batch writes
/// nothing. Storage failures are passed up as they are.
pub async fn submit_votes<S>(
    store: &S,
    judge_id: Id,
    tuples: &[VoteTuple],
    bounds: ScoreBounds,
) -> Result<Vec<Vote>>
where
    S: EntityStore + ?Sized,
{
    let context = BatchContext::fetch(store, judge_id, tuples).await?;
    let records = validate_batch(judge_id, tuples, &context, bounds).map_err(|rejection| {
        debug!("Rejected batch from judge {judge_id}: {rejection}");
        rejection
    })?;
    let votes = store.create_votes(&records).await?;
    info!("Recorded {} vote(s) from judge {judge_id}", votes.len());
    Ok(votes)
}

/// Change the score of an existing vote, keeping it within `bounds`.
///
/// Returns `None` if the vote does not exist. Whether the caller may touch
/// the vote is for the caller to decide.
pub async fn amend_score<S>(
    store: &S,
    vote_id: Id,
    score: f64,
    bounds: ScoreBounds,
) -> Result<Option<Vote>>
where
    S: EntityStore + ?Sized,
{
    if !bounds.contains(score) {
        return Err(VoteRejection::amended_out_of_range(score, bounds).into());
    }
    store.update_vote_score(vote_id, score).await
}

/// The ranked scoreboard of an event, or `None` if there is no such event.
pub async fn event_results<S>(
    store: &S,
    event_id: Id,
) -> Result<Option<(Event, Vec<CandidateResult>)>>
where
    S: EntityStore + ?Sized,
{
    let event = match store.find_event_by_id(event_id).await? {
        Some(event) => event,
        None => return Ok(None),
    };
    let candidates = store.list_candidates_by_event(event_id).await?;
    let votes = store.list_votes_by_event(event_id).await?;
    let results = compute_results(event_id, candidates, &votes);
    Ok(Some((event, results)))
}
