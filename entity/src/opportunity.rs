use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    pub name: String,
    pub stage: Stage,
    #[serde(deserialize_with = "crate::units::whole_units")]
    pub amount: i64,
    pub close_date: NaiveDate,
    pub status: OpportunityStatus,
    pub created_at: DateTime<Utc>,
}

impl Opportunity {
    /// Builds the record; an explicit status on the input wins, otherwise it
    /// is derived from the stage.
    pub fn from_input(id: String, created_at: DateTime<Utc>, input: NewOpportunity) -> Self {
        let status = input.status.unwrap_or_else(|| input.stage.status());
        Self {
            id,
            account_id: input.account_id,
            contact_id: input.contact_id,
            name: input.name,
            stage: input.stage,
            amount: input.amount,
            close_date: input.close_date,
            status,
            created_at,
        }
    }

    /// Applies `patch` and recomputes the status from the resulting stage,
    /// whether or not the patch touched the stage.
    pub fn merged(&self, patch: &OpportunityPatch) -> Self {
        let mut next = self.clone();
        if let Some(account_id) = &patch.account_id {
            next.account_id = account_id.clone();
        }
        if let Some(contact_id) = &patch.contact_id {
            next.contact_id = contact_id.clone();
        }
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(stage) = patch.stage {
            next.stage = stage;
        }
        if let Some(amount) = patch.amount {
            next.amount = amount;
        }
        if let Some(close_date) = patch.close_date {
            next.close_date = close_date;
        }
        next.status = next.stage.status();
        next
    }

    pub fn is_open(&self) -> bool {
        self.status == OpportunityStatus::Open
    }
}

/// Ordered sales stages; the two closed stages are terminal.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Stage {
    #[default]
    #[serde(alias = "leads", alias = "prospecting")]
    Prospecting,
    #[serde(alias = "qualified", alias = "qualification")]
    Qualification,
    #[serde(alias = "proposal")]
    Proposal,
    #[serde(alias = "negotiation")]
    Negotiation,
    #[serde(rename = "Closed Won", alias = "closed-won")]
    ClosedWon,
    #[serde(rename = "Closed Lost", alias = "closed-lost")]
    ClosedLost,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Self::Prospecting,
        Self::Qualification,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Prospecting => "Prospecting",
            Self::Qualification => "Qualification",
            Self::Proposal => "Proposal",
            Self::Negotiation => "Negotiation",
            Self::ClosedWon => "Closed Won",
            Self::ClosedLost => "Closed Lost",
        }
    }

    /// Short hyphenated id used on the pipeline board.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Prospecting => "leads",
            Self::Qualification => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed-won",
            Self::ClosedLost => "closed-lost",
        }
    }

    pub fn sort_order(self) -> u8 {
        match self {
            Self::Prospecting => 1,
            Self::Qualification => 2,
            Self::Proposal => 3,
            Self::Negotiation => 4,
            Self::ClosedWon => 5,
            Self::ClosedLost => 6,
        }
    }

    /// Win probability in percent.
    pub fn probability(self) -> u8 {
        match self {
            Self::Prospecting => 10,
            Self::Qualification => 25,
            Self::Proposal => 50,
            Self::Negotiation => 75,
            Self::ClosedWon => 100,
            Self::ClosedLost => 0,
        }
    }

    pub fn is_won(self) -> bool {
        matches!(self, Self::ClosedWon)
    }

    pub fn is_lost(self) -> bool {
        matches!(self, Self::ClosedLost)
    }

    pub fn is_terminal(self) -> bool {
        self.is_won() || self.is_lost()
    }

    pub fn status(self) -> OpportunityStatus {
        if self.is_won() {
            OpportunityStatus::Won
        } else if self.is_lost() {
            OpportunityStatus::Lost
        } else {
            OpportunityStatus::Open
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        let stage = match normalized.as_str() {
            "prospecting" | "leads" => Self::Prospecting,
            "qualification" | "qualified" => Self::Qualification,
            "proposal" => Self::Proposal,
            "negotiation" => Self::Negotiation,
            "closed-won" | "won" => Self::ClosedWon,
            "closed-lost" | "lost" => Self::ClosedLost,
            _ => return Err(ParseEnumError::new("stage", value)),
        };
        Ok(stage)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpportunityStatus {
    Open,
    Won,
    Lost,
}

impl OpportunityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Won => "Won",
            Self::Lost => "Lost",
        }
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOpportunity {
    pub account_id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    pub name: String,
    pub stage: Stage,
    pub amount: i64,
    pub close_date: NaiveDate,
    #[serde(default)]
    pub status: Option<OpportunityStatus>,
}

/// Partial update. There is no status field: status always follows stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpportunityPatch {
    pub account_id: Option<String>,
    pub contact_id: Option<Option<String>>,
    pub name: Option<String>,
    pub stage: Option<Stage>,
    pub amount: Option<i64>,
    pub close_date: Option<NaiveDate>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
