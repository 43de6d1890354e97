//! Entity identity types.
//!
//! The platform addresses events, categories, and candidates by opaque
//! string ids assigned by the external store. Newtype wrappers keep scope
//! filters from mixing them up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a voting event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

/// Identifier of a category within an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

/// Identifier of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

macro_rules! impl_id_traits {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

impl_id_traits!(EventId);
impl_id_traits!(CategoryId);
impl_id_traits!(CandidateId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_json() {
        let id = EventId::from("ev-2026-awards");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ev-2026-awards\"");
        let back: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_is_the_raw_id() {
        assert_eq!(CandidateId::from("cand-7").to_string(), "cand-7");
    }
}
