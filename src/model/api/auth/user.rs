use std::fmt::Display;

use mongodb::bson::Bson;
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Judge = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Judge => "judge",
                Self::Admin => "admin",
            }
        )
    }
}

impl From<Rights> for Bson {
    fn from(rights: Rights) -> Self {
        Bson::Int32(rights as i32)
    }
}

/// A capability a route can demand of its caller.
pub trait Role {
    /// Human-readable name, used in log lines.
    const NAME: &'static str;
    /// Do the given rights grant this role?
    fn permits(rights: Rights) -> bool;
}

/// May submit and amend their own votes.
pub struct Judge;

impl Role for Judge {
    const NAME: &'static str = "judge";

    fn permits(rights: Rights) -> bool {
        rights == Rights::Judge
    }
}

/// May inspect, amend and delete any vote.
pub struct Admin;

impl Role for Admin {
    const NAME: &'static str = "admin";

    fn permits(rights: Rights) -> bool {
        rights == Rights::Admin
    }
}

/// Any authenticated user, judge or admin.
pub struct AnyUser;

impl Role for AnyUser {
    const NAME: &'static str = "user";

    fn permits(_rights: Rights) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_grant_exactly_their_rights() {
        assert!(Judge::permits(Rights::Judge));
        assert!(!Judge::permits(Rights::Admin));
        assert!(Admin::permits(Rights::Admin));
        assert!(!Admin::permits(Rights::Judge));
        assert!(AnyUser::permits(Rights::Judge));
        assert!(AnyUser::permits(Rights::Admin));
    }

    #[test]
    fn rights_are_stored_as_integers() {
        assert_eq!(Bson::from(Rights::Judge), Bson::Int32(0));
        assert_eq!(Bson::from(Rights::Admin), Bson::Int32(1));
    }
}
