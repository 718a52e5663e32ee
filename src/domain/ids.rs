//! Type-safe entity identifiers.
//!
//! Every identifier is a newtype wrapper around [`uuid::Uuid`] so that a
//! machine id can never be passed where a department or job id is
//! expected. [`ConnectionId`] is generated by the gateway for each live
//! WebSocket connection; the others come from the metadata store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<uuid::Uuid>().map(Self)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of a machine tool or workstation.
    MachineId
);

uuid_id!(
    /// Identifier of a shop-floor department.
    DepartmentId
);

uuid_id!(
    /// Identifier of a job routing (work order).
    JobId
);

uuid_id!(
    /// Identifier of a single operation within a job routing.
    OperationId
);

uuid_id!(
    /// Identifier of a live subscriber connection.
    ///
    /// Generated once when the WebSocket is upgraded and dropped from the
    /// subscription registry when the connection closes.
    ConnectionId
);
