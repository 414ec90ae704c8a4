use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{api::auth::Rights, mongodb::Id};

/// Core user data, as stored in the database.
///
/// Users are provisioned by the identity provider; this service only reads
/// them to confirm that a token still names a live account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub name: String,
    /// Unique across all users.
    pub email: String,
    pub password_hash: String,
    pub role: Rights,
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}
