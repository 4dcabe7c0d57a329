//! Domain types for a coordination session.
//!
//! Identities are resolved once at initialization and never change for the
//! lifetime of the process. All types serialize via serde so hosts can report
//! them (e.g. `workstack whoami --json`).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed process id, unique within one coordination session.
///
/// Derived from the rank as `rank_<n>`; also used as the suffix of the
/// per-process `LOG_<id>` channel file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub String);

impl ProcessId {
    pub fn from_rank(rank: u32) -> Self {
        Self(format!("rank_{rank}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProcessId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProcessId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Role of a process within its group. Rank 0 is always the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    Worker,
}

impl Role {
    pub fn for_rank(rank: u32) -> Self {
        if rank == 0 {
            Role::Master
        } else {
            Role::Worker
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => write!(f, "master"),
            Role::Worker => write!(f, "worker"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Who this process is within the coordination group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIdentity {
    rank: u32,
    id: ProcessId,
    role: Role,
}

impl ProcessIdentity {
    pub fn from_rank(rank: u32) -> Self {
        Self {
            rank,
            id: ProcessId::from_rank(rank),
            role: Role::for_rank(rank),
        }
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
