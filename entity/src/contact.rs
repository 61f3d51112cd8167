use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person who always belongs to exactly one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn from_input(id: String, created_at: DateTime<Utc>, input: NewContact) -> Self {
        Self {
            id,
            account_id: input.account_id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            job_title: input.job_title,
            created_at,
        }
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            ("", last) => last.to_string(),
            (first, "") => first.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }

    pub fn merged(&self, patch: &ContactPatch) -> Self {
        let mut next = self.clone();
        if let Some(account_id) = &patch.account_id {
            next.account_id = account_id.clone();
        }
        if let Some(first) = &patch.first_name {
            next.first_name = first.clone();
        }
        if let Some(last) = &patch.last_name {
            next.last_name = last.clone();
        }
        if let Some(email) = &patch.email {
            next.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            next.phone = phone.clone();
        }
        if let Some(title) = &patch.job_title {
            next.job_title = title.clone();
        }
        next
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub account_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub job_title: Option<Option<String>>,
}
