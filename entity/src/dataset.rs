use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::{Account, Contact, Opportunity};

/// Current layout of the persisted blob.
pub const DATASET_VERSION: u32 = 1;

fn default_version() -> u32 {
    DATASET_VERSION
}

/// The three collections, kept in insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default = "default_version")]
    pub version: u32,
    pub accounts: Vec<Account>,
    pub contacts: Vec<Contact>,
    pub opportunities: Vec<Opportunity>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            version: DATASET_VERSION,
            accounts: Vec::new(),
            contacts: Vec::new(),
            opportunities: Vec::new(),
        }
    }
}

impl Dataset {
    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }

    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|contact| contact.id == id)
    }

    pub fn opportunity(&self, id: &str) -> Option<&Opportunity> {
        self.opportunities.iter().find(|opp| opp.id == id)
    }

    pub fn account_name(&self, id: &str) -> Option<&str> {
        self.account(id).map(|account| account.name.as_str())
    }

    pub fn contact_name(&self, id: &str) -> Option<String> {
        self.contact(id).map(Contact::display_name)
    }

    pub fn accounts_sorted(&self) -> Vec<&Account> {
        sorted_by_name(self.accounts.iter(), |account| account.name.clone())
    }

    pub fn contacts_sorted(&self) -> Vec<&Contact> {
        sorted_by_name(self.contacts.iter(), Contact::display_name)
    }

    pub fn opportunities_sorted(&self) -> Vec<&Opportunity> {
        sorted_by_name(self.opportunities.iter(), |opp| opp.name.clone())
    }

    pub fn contacts_for_account(&self, account_id: &str) -> Vec<&Contact> {
        sorted_by_name(
            self.contacts.iter().filter(|c| c.account_id == account_id),
            Contact::display_name,
        )
    }

    pub fn opportunities_for_account(&self, account_id: &str) -> Vec<&Opportunity> {
        sorted_by_name(
            self.opportunities
                .iter()
                .filter(|opp| opp.account_id == account_id),
            |opp| opp.name.clone(),
        )
    }

    pub fn opportunities_for_contact(&self, contact_id: &str) -> Vec<&Opportunity> {
        sorted_by_name(
            self.opportunities
                .iter()
                .filter(|opp| opp.contact_id.as_deref() == Some(contact_id)),
            |opp| opp.name.clone(),
        )
    }

    /// Lists every broken cross-reference. Empty for a consistent dataset.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        for contact in &self.contacts {
            if self.account(&contact.account_id).is_none() {
                issues.push(IntegrityIssue::ContactWithoutAccount {
                    contact_id: contact.id.clone(),
                    account_id: contact.account_id.clone(),
                });
            }
        }
        for opp in &self.opportunities {
            if self.account(&opp.account_id).is_none() {
                issues.push(IntegrityIssue::OpportunityWithoutAccount {
                    opportunity_id: opp.id.clone(),
                    account_id: opp.account_id.clone(),
                });
            }
            let Some(contact_id) = &opp.contact_id else {
                continue;
            };
            match self.contact(contact_id) {
                None => issues.push(IntegrityIssue::OpportunityWithoutContact {
                    opportunity_id: opp.id.clone(),
                    contact_id: contact_id.clone(),
                }),
                Some(contact) if contact.account_id != opp.account_id => {
                    issues.push(IntegrityIssue::ContactAccountMismatch {
                        opportunity_id: opp.id.clone(),
                        contact_id: contact_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntegrityIssue {
    ContactWithoutAccount {
        contact_id: String,
        account_id: String,
    },
    OpportunityWithoutAccount {
        opportunity_id: String,
        account_id: String,
    },
    OpportunityWithoutContact {
        opportunity_id: String,
        contact_id: String,
    },
    ContactAccountMismatch {
        opportunity_id: String,
        contact_id: String,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContactWithoutAccount {
                contact_id,
                account_id,
            } => write!(f, "contact {contact_id} references missing account {account_id}"),
            Self::OpportunityWithoutAccount {
                opportunity_id,
                account_id,
            } => write!(
                f,
                "opportunity {opportunity_id} references missing account {account_id}"
            ),
            Self::OpportunityWithoutContact {
                opportunity_id,
                contact_id,
            } => write!(
                f,
                "opportunity {opportunity_id} references missing contact {contact_id}"
            ),
            Self::ContactAccountMismatch {
                opportunity_id,
                contact_id,
            } => write!(
                f,
                "opportunity {opportunity_id} uses contact {contact_id} from another account"
            ),
        }
    }
}

fn sorted_by_name<'a, T, I, F>(items: I, name: F) -> Vec<&'a T>
where
    I: Iterator<Item = &'a T>,
    F: Fn(&T) -> String,
{
    let mut keyed: Vec<(String, &'a T)> = items.map(|item| (name(item), item)).collect();
    keyed.sort_by(|(a, _), (b, _)| compare_names(a, b));
    keyed.into_iter().map(|(_, item)| item).collect()
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
