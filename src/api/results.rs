use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AnyUser, AuthToken},
        results::EventResults,
    },
    mongodb::Id,
};
use crate::voting::{event_results, MongoStore};

pub fn routes() -> Vec<Route> {
    routes![results]
}

#[get("/events/<event_id>/results")]
async fn results(
    _token: AuthToken<AnyUser>,
    event_id: Id,
    store: MongoStore,
) -> Result<Json<EventResults>> {
    let (event, ranked) = event_results(&store, event_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Event with ID '{event_id}'")))?;
    Ok(Json(EventResults::new(event, ranked)))
}
