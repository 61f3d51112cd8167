//! Record model for the CRM: accounts own contacts and opportunities, and the
//! three collections travel together as one [`Dataset`].

pub mod account;
pub mod contact;
pub mod dataset;
pub mod opportunity;
mod units;

pub use account::{Account, AccountPatch, AccountStatus, NewAccount};
pub use contact::{Contact, ContactPatch, NewContact};
pub use dataset::{DATASET_VERSION, Dataset, IntegrityIssue};
pub use opportunity::{
    NewOpportunity, Opportunity, OpportunityPatch, OpportunityStatus, ParseEnumError, Stage,
};
