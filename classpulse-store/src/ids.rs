//! Typed identifiers.
//!
//! Every entity is keyed by a UUID. Wrapping each in its own type keeps a
//! session id from being passed where a question id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new ID with a UUIDv7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Primary key of a stored event.
    EventId
);
uuid_id!(
    /// A single run of a quiz in a classroom.
    SessionId
);
uuid_id!(QuestionId);
uuid_id!(StudentId);
uuid_id!(TeacherId);
uuid_id!(QuizId);
uuid_id!(ClassroomId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_from_canonical_uuid_text() {
        let id: SessionId = "6f1c3f8e-2a4b-4c51-9d1e-0b8f7c2d4e10".parse().unwrap();
        assert_eq!(id.to_string(), "6f1c3f8e-2a4b-4c51-9d1e-0b8f7c2d4e10");
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!("not-a-uuid".parse::<QuestionId>().is_err());
        assert!("".parse::<StudentId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ClassroomId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
