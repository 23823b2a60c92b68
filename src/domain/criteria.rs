//! Predefined trimming criteria

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::nbt::ChunkSummary;

/// Game ticks per real-time minute.
pub const TICKS_PER_MINUTE: i64 = 1200;

/// A rule deciding which chunks get trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Criterion {
    /// Players spent at most one minute in the chunk
    #[value(name = "inhabited_time<1m")]
    #[serde(rename = "inhabited_time<1m")]
    InhabitedUnder1m,
    /// Players spent at most five minutes in the chunk
    #[value(name = "inhabited_time<5m")]
    #[serde(rename = "inhabited_time<5m")]
    InhabitedUnder5m,
    /// Players spent at most ten minutes in the chunk
    #[value(name = "inhabited_time<10m")]
    #[serde(rename = "inhabited_time<10m")]
    InhabitedUnder10m,
}

impl Criterion {
    pub const ALL: [Criterion; 3] = [
        Criterion::InhabitedUnder1m,
        Criterion::InhabitedUnder5m,
        Criterion::InhabitedUnder10m,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::InhabitedUnder1m => "inhabited_time<1m",
            Criterion::InhabitedUnder5m => "inhabited_time<5m",
            Criterion::InhabitedUnder10m => "inhabited_time<10m",
        }
    }

    /// Inclusive `InhabitedTime` limit in ticks.
    pub fn max_inhabited_ticks(&self) -> i64 {
        match self {
            Criterion::InhabitedUnder1m => TICKS_PER_MINUTE,
            Criterion::InhabitedUnder5m => 5 * TICKS_PER_MINUTE,
            Criterion::InhabitedUnder10m => 10 * TICKS_PER_MINUTE,
        }
    }

    /// True if the chunk should be trimmed. Chunks without `InhabitedTime`
    /// never match.
    pub fn matches(&self, summary: &ChunkSummary) -> bool {
        summary
            .inhabited_time
            .is_some_and(|t| t <= self.max_inhabited_ticks())
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Criterion {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Criterion::ALL
            .into_iter()
            .find(|c| c.name() == s.trim())
            .ok_or_else(|| DomainError::UnknownCriterion(s.to_string()))
    }
}
