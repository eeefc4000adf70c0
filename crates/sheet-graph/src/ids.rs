//! Identifier newtypes
//!
//! Every id is a v4 UUID. Node ids double as persistence ids, so they are
//! serialized transparently and survive a save/load round trip unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
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
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Stable node identifier, also used as the persistence id
    NodeId
);

uuid_id!(
    /// Connection identifier
    ConnectionId
);

uuid_id!(
    /// Sheet (graph) identifier
    SheetId
);

uuid_id!(
    /// Folder identifier
    FolderId
);

uuid_id!(
    /// Immutable sheet version identifier
    VersionId
);
