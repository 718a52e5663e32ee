//! Broadcast topics.
//!
//! A [`Topic`] partitions the broadcast scope. Its string form is the key
//! clients see (`machine:<id>`, `department:<id>`, `shop`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{DepartmentId, MachineId};

/// Kind of topic a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKind {
    /// Updates for one machine.
    Machine,
    /// Updates for one department.
    Department,
    /// Every update on the shop floor.
    Shop,
}

/// Error returned when a topic key or kind/id pair is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicParseError {
    /// The key has an unknown prefix.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
    /// The id part is not a valid UUID.
    #[error("invalid {kind} id: {id}")]
    InvalidId {
        /// Topic kind being parsed.
        kind: &'static str,
        /// Offending id string.
        id: String,
    },
    /// A machine or department topic was requested without an id.
    #[error("{0} topic requires an id")]
    MissingId(&'static str),
}

/// Broadcast scope key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// `machine:<id>`
    Machine(MachineId),
    /// `department:<id>`
    Department(DepartmentId),
    /// `shop`
    Shop,
}

impl Topic {
    /// Builds a topic from a kind and an optional id string, as sent by
    /// subscription commands.
    ///
    /// # Errors
    ///
    /// Returns [`TopicParseError`] if the id is missing or not a UUID for
    /// machine and department topics. The id is ignored for `shop`.
    pub fn from_parts(kind: TopicKind, id: Option<&str>) -> Result<Self, TopicParseError> {
        match kind {
            TopicKind::Shop => Ok(Self::Shop),
            TopicKind::Machine => {
                let raw = id.ok_or(TopicParseError::MissingId("machine"))?;
                raw.parse()
                    .map(Self::Machine)
                    .map_err(|_| TopicParseError::InvalidId {
                        kind: "machine",
                        id: raw.to_string(),
                    })
            }
            TopicKind::Department => {
                let raw = id.ok_or(TopicParseError::MissingId("department"))?;
                raw.parse()
                    .map(Self::Department)
                    .map_err(|_| TopicParseError::InvalidId {
                        kind: "department",
                        id: raw.to_string(),
                    })
            }
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Machine(id) => write!(f, "machine:{id}"),
            Self::Department(id) => write!(f, "department:{id}"),
            Self::Shop => f.write_str("shop"),
        }
    }
}

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "shop" {
            return Ok(Self::Shop);
        }
        match s.split_once(':') {
            Some(("machine", id)) => Self::from_parts(TopicKind::Machine, Some(id)),
            Some(("department", id)) => Self::from_parts(TopicKind::Department, Some(id)),
            _ => Err(TopicParseError::UnknownTopic(s.to_string())),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
