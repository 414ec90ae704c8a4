use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, TokenData, Validation};
use mongodb::{bson::doc, Database};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    db::user::User,
    mongodb::{Coll, Id},
};

use super::user::{Rights, Role};

/// Header carrying the identity provider's token.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";
/// Cookie carrying the identity provider's token, for browser clients.
pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authenticated principal, proven to hold role `R`.
///
/// Tokens are minted by the identity provider; this service only checks the
/// signature, the expiry, the role, and that the user still exists.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AuthToken<R> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<R>,
}

impl<R> AuthToken<R> {
    pub fn new(id: Id, rights: Rights) -> Self {
        Self {
            id,
            rights,
            phantom: PhantomData,
        }
    }

    /// Is the principal an administrator?
    pub fn is_admin(&self) -> bool {
        self.rights == Rights::Admin
    }

    /// Sign this token, valid until `expire_at`, as the identity provider would.
    #[cfg(test)]
    pub fn encode(self, config: &Config, expire_at: DateTime<Utc>) -> String {
        use jsonwebtoken::{EncodingKey, Header};

        let claims = Claims {
            token: self,
            expire_at,
        };

        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings")
    }

    /// Verify and decode a signed token.
    pub fn decode(raw: &str, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            raw,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<R>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Token claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<R> {
    #[serde(flatten, bound = "")]
    token: AuthToken<R>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Role + Send + Sync + 'static,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the header or cookie, verify that it grants role `R`,
    /// and check that the user behind it still exists.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let raw = req
            .headers()
            .get_one(AUTH_TOKEN_HEADER)
            .map(str::to_string)
            .or_else(|| {
                req.cookies()
                    .get(AUTH_TOKEN_COOKIE)
                    .map(|cookie| cookie.value().to_string())
            });
        let raw = match raw {
            Some(raw) => raw,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Status(Status::Unauthorized, "No token presented".to_string()),
                ))
            }
        };

        let token = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e)),
        };

        // The capability check itself.
        if !R::permits(token.rights) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::Status(
                    Status::Forbidden,
                    format!("{} {} is not a {}", token.rights, token.id, R::NAME),
                ),
            ));
        }

        // Check the user actually exists with the claimed role.
        let db = req.guard::<&State<Database>>().await.unwrap();
        let filter = doc! {
            "_id": token.id,
            "role": token.rights,
        };
        match Coll::<User>::from_db(db).find_one(filter, None).await {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => Outcome::Failure((
                Status::Unauthorized,
                Error::Status(
                    Status::Unauthorized,
                    format!("No {} with ID {}", token.rights, token.id),
                ),
            )),
            Err(e) => Outcome::Failure((Status::ServiceUnavailable, e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::api::auth::Judge;

    #[test]
    fn decode_accepts_own_signature() {
        let config = Config::example();
        let id = Id::new();
        let raw = AuthToken::<Judge>::new(id, Rights::Judge)
            .encode(&config, Utc::now() + Duration::hours(1));

        let token = AuthToken::<Judge>::decode(&raw, &config).unwrap();
        assert_eq!(token.id, id);
        assert_eq!(token.rights, Rights::Judge);
        assert!(!token.is_admin());
    }

    #[test]
    fn decode_rejects_expired() {
        let config = Config::example();
        let raw = AuthToken::<Judge>::new(Id::new(), Rights::Judge)
            .encode(&config, Utc::now() - Duration::hours(1));

        assert!(matches!(
            AuthToken::<Judge>::decode(&raw, &config),
            Err(Error::Jwt(_))
        ));
    }

    #[test]
    fn decode_rejects_foreign_signature() {
        let config = Config::example();
        let other = Config::example_with_secret("some other secret");
        let raw = AuthToken::<Judge>::new(Id::new(), Rights::Judge)
            .encode(&other, Utc::now() + Duration::hours(1));

        assert!(AuthToken::<Judge>::decode(&raw, &config).is_err());
    }
}
