use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Exchange trading state at an instant. Derived from wall-clock time, never stored
/// as the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    PreOpen,
    Open,
    Closed,
    Weekend,
    Holiday,
}

impl SessionPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreOpen => "pre_open",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Weekend => "weekend",
            Self::Holiday => "holiday",
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl Display for SessionPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
