//! Identifier newtypes for persisted documents.
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Faction document key.
    FactionId
);
string_id!(
    /// Territory document key.
    TerritoryId
);
string_id!(
    /// Legion document key.
    LegionId
);
string_id!(
    /// Samurai document key.
    SamuraiId
);
string_id!(
    /// Snapshot document key.
    SnapshotId
);

/// Sequence number of an operation-log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OperationId(pub u64);

impl OperationId {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{:06}", self.0)
    }
}

impl SnapshotId {
    /// Snapshot key derived from the operation that captured it.
    #[must_use]
    pub fn for_operation(operation: OperationId) -> Self {
        Self(format!("snap-{:06}", operation.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_transparently() {
        let id = FactionId::new("oda");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"oda\"");
        let op = OperationId(7);
        assert_eq!(serde_json::to_string(&op).unwrap(), "7");
        assert_eq!(op.to_string(), "op-000007");
        assert_eq!(SnapshotId::for_operation(op).as_str(), "snap-000007");
    }
}
