use rocket::Route;

mod results;
mod votes;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(votes::routes());
    routes.extend(results::routes());
    routes
}

/// Store a user and mint a header that authenticates as them.
#[cfg(test)]
pub(crate) async fn sign_in(
    client: &rocket::local::asynchronous::Client,
    db: &mongodb::Database,
    user: crate::model::db::user::NewUser,
) -> rocket::http::Header<'static> {
    use chrono::{Duration, Utc};

    use crate::model::{
        api::auth::{AnyUser, AuthToken, AUTH_TOKEN_HEADER},
        db::user::NewUser,
        mongodb::{Coll, Id},
    };

    let id = Coll::<NewUser>::from_db(db)
        .insert_one(&user, None)
        .await
        .unwrap()
        .inserted_id
        .as_object_id()
        .map(Id::from)
        .unwrap();
    let config = client.rocket().state::<crate::Config>().unwrap();
    let token = AuthToken::<AnyUser>::new(id, user.role)
        .encode(config, Utc::now() + Duration::hours(1));
    rocket::http::Header::new(AUTH_TOKEN_HEADER, token)
}
