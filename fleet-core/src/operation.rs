//! Operation kinds an account can be driven through.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named unit of remote work. The string tag is what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operation {
    Faucet,
    CollectPulses,
    Bridge,
    CycleSwaps,
    ClaimTasks,
    ChatWithAgents,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Faucet,
        Operation::CollectPulses,
        Operation::Bridge,
        Operation::CycleSwaps,
        Operation::ClaimTasks,
        Operation::ChatWithAgents,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Operation::Faucet => "FAUCET",
            Operation::CollectPulses => "COLLECT_PULSES",
            Operation::Bridge => "BRIDGE",
            Operation::CycleSwaps => "CYCLE_SWAPS",
            Operation::ClaimTasks => "CLAIM_TASKS",
            Operation::ChatWithAgents => "CHAT_WITH_AGENTS",
        }
    }

    /// Parses an ordered list of tags, failing on the first unknown one.
    pub fn parse_list<S: AsRef<str>>(tags: &[S]) -> Result<Vec<Operation>, ConfigError> {
        tags.iter().map(|tag| tag.as_ref().parse()).collect()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Operation::ALL
            .into_iter()
            .find(|op| op.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| ConfigError::UnknownOperation {
                tag: tag.to_string(),
            })
    }
}

impl TryFrom<String> for Operation {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.tag().to_string()
    }
}
