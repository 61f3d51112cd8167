use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::opportunity::ParseEnumError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::units::optional_whole_units"
    )]
    pub annual_revenue: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn from_input(id: String, created_at: DateTime<Utc>, input: NewAccount) -> Self {
        Self {
            id,
            name: input.name,
            industry: input.industry,
            website: input.website,
            description: input.description,
            annual_revenue: input.annual_revenue,
            employee_count: input.employee_count,
            status: input.status,
            created_at,
        }
    }

    /// Returns a copy with every field named by `patch` replaced.
    pub fn merged(&self, patch: &AccountPatch) -> Self {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(industry) = &patch.industry {
            next.industry = industry.clone();
        }
        if let Some(website) = &patch.website {
            next.website = website.clone();
        }
        if let Some(description) = &patch.description {
            next.description = description.clone();
        }
        if let Some(revenue) = patch.annual_revenue {
            next.annual_revenue = revenue;
        }
        if let Some(count) = patch.employee_count {
            next.employee_count = count;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        next
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Prospect,
    Churned,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 3] = [Self::Active, Self::Prospect, Self::Churned];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Prospect => "Prospect",
            Self::Churned => "Churned",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ParseEnumError::new("account status", value))
    }
}

/// Fields supplied when creating an account; id and timestamp are assigned
/// by the data service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub annual_revenue: Option<i64>,
    #[serde(default)]
    pub employee_count: Option<u32>,
    #[serde(default)]
    pub status: Option<AccountStatus>,
}

/// Partial update. `None` leaves a field alone; `Some(None)` clears an
/// optional field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub industry: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub annual_revenue: Option<Option<i64>>,
    pub employee_count: Option<Option<u32>>,
    pub status: Option<Option<AccountStatus>>,
}
