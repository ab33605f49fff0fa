//! Transaction isolation levels.
//!
//! The enumeration mirrors the levels a SQL session understands, plus an
//! `Unspecified` sentinel meaning "leave the session's current level alone".

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transaction isolation level of a database session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Do not change the session's isolation level.
    ///
    /// This is a request sentinel, not a level a session can be in; sessions
    /// reject attempts to set it.
    #[default]
    Unspecified,

    /// Transactions are not supported.
    None,

    /// Dirty reads, non-repeatable reads and phantom reads can occur.
    ReadUncommitted,

    /// Dirty reads are prevented; non-repeatable reads and phantom reads
    /// can occur.
    ReadCommitted,

    /// Dirty reads and non-repeatable reads are prevented; phantom reads
    /// can occur.
    RepeatableRead,

    /// Dirty reads, non-repeatable reads and phantom reads are prevented.
    Serializable,
}

impl IsolationLevel {
    /// Whether this is the `Unspecified` sentinel.
    pub fn is_unspecified(&self) -> bool {
        matches!(self, IsolationLevel::Unspecified)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::Unspecified => write!(f, "UNSPECIFIED"),
            IsolationLevel::None => write!(f, "NONE"),
            IsolationLevel::ReadUncommitted => write!(f, "READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => write!(f, "READ COMMITTED"),
            IsolationLevel::RepeatableRead => write!(f, "REPEATABLE READ"),
            IsolationLevel::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Parse isolation level from string (SQL syntax).
impl std::str::FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNSPECIFIED" | "DEFAULT" => Ok(IsolationLevel::Unspecified),
            "NONE" => Ok(IsolationLevel::None),
            "READ UNCOMMITTED" | "READ_UNCOMMITTED" | "READUNCOMMITTED" => {
                Ok(IsolationLevel::ReadUncommitted)
            }
            "READ COMMITTED" | "READ_COMMITTED" | "READCOMMITTED" => {
                Ok(IsolationLevel::ReadCommitted)
            }
            "REPEATABLE READ" | "REPEATABLE_READ" | "REPEATABLEREAD" => {
                Ok(IsolationLevel::RepeatableRead)
            }
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => Err(format!("unknown isolation level: {}", s)),
        }
    }
}
