//! Symptom log records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mamaguide_core::error::MamaGuideError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_URGENCY: &str = "Next visit";
pub const DEFAULT_ACTION: &str = "Monitor and discuss with provider";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymptomSeverity {
    #[default]
    Mild,
    Moderate,
    Severe,
}

impl SymptomSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

impl fmt::Display for SymptomSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymptomSeverity {
    type Err = MamaGuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mild" => Ok(Self::Mild),
            "moderate" => Ok(Self::Moderate),
            "severe" => Ok(Self::Severe),
            other => Err(MamaGuideError::Memory(format!("unknown severity: {other}"))),
        }
    }
}

/// What the user submits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSymptomLog {
    pub symptom: String,
    #[serde(default)]
    pub severity: SymptomSeverity,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub notes: String,
}

/// A stored entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomLogEntry {
    pub id: String,
    pub symptom: String,
    pub severity: SymptomSeverity,
    pub duration: String,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
    pub urgency: String,
    pub action: String,
}
