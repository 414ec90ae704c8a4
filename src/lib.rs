#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub use config::Config;
use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod voting;

pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
}

/// A database client for tests, independent of any Rocket instance.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .unwrap();
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// A fresh, randomly named database for one test.
#[cfg(test)]
pub(crate) fn database() -> String {
    config::get_database_name()
}

/// A Rocket instance bound to the given database, bypassing [`DatabaseFairing`].
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db).await.unwrap();
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .manage(client)
        .manage(db)
}
