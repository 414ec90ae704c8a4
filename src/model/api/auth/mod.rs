mod token;
mod user;

pub use token::{AuthToken, AUTH_TOKEN_COOKIE, AUTH_TOKEN_HEADER};
pub use user::{Admin, AnyUser, Judge, Rights, Role};
