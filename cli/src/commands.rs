//! Subcommand handlers. Each one validates its input, calls the service and
//! renders the resulting snapshot.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use entity::{
    AccountPatch, AccountStatus, ContactPatch, NewAccount, NewContact, NewOpportunity,
    OpportunityPatch, Stage,
};
use platform_api::ApiError;
use products_crm::{CrmService, metrics, validation};
use serde::Serialize;
use tracing::instrument;

use crate::render;

#[derive(Clone, Copy, Debug)]
pub struct Output {
    pub json: bool,
}

impl Output {
    fn emit<T: Serialize + ?Sized>(self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            let body = serde_json::to_string_pretty(value).context("encode JSON output")?;
            println!("{body}");
        } else {
            print!("{}", text());
        }
        Ok(())
    }
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    List,
    Show { id: String },
    Create(AccountFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: AccountFields,
    },
    /// Deletes the account with its contacts and opportunities.
    Delete { id: String },
}

/// Account fields. On update an empty string clears an optional field.
#[derive(Args, Debug, Default)]
pub struct AccountFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub industry: Option<String>,
    #[arg(long)]
    pub website: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "revenue", value_name = "AMOUNT")]
    pub annual_revenue: Option<i64>,
    #[arg(long = "employees", value_name = "COUNT")]
    pub employee_count: Option<u32>,
    /// Active, Prospect or Churned.
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ContactCommand {
    List,
    Show { id: String },
    Create(ContactFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: ContactFields,
    },
    /// Deletes the contact and clears it from its opportunities.
    Delete { id: String },
}

#[derive(Args, Debug, Default)]
pub struct ContactFields {
    #[arg(long = "account", value_name = "ACCOUNT_ID")]
    pub account_id: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub job_title: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum OpportunityCommand {
    List,
    Show { id: String },
    Create(OpportunityFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: OpportunityFields,
    },
    /// Moves the opportunity to another pipeline stage.
    Move { id: String, stage: Stage },
    Delete { id: String },
}

#[derive(Args, Debug, Default)]
pub struct OpportunityFields {
    #[arg(long = "account", value_name = "ACCOUNT_ID")]
    pub account_id: Option<String>,
    /// Contact of the same account; an empty value clears it on update.
    #[arg(long = "contact", value_name = "CONTACT_ID")]
    pub contact_id: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    /// Stage title or slug, e.g. "Closed Won" or closed-won.
    #[arg(long)]
    pub stage: Option<Stage>,
    #[arg(long)]
    pub amount: Option<i64>,
    /// YYYY-MM-DD.
    #[arg(long)]
    pub close_date: Option<NaiveDate>,
}

#[instrument(name = "cli.seed", skip_all)]
pub fn seed(service: &mut CrmService, out: Output) -> Result<()> {
    let data = service.reset_data();
    let metrics = metrics::Metrics::compute(&data);
    out.emit(&metrics, || render::dashboard(&metrics))
}

#[instrument(name = "cli.dashboard", skip_all)]
pub fn dashboard(service: &CrmService, out: Output) -> Result<()> {
    let metrics = service.metrics();
    out.emit(&metrics, || render::dashboard(&metrics))
}

#[instrument(name = "cli.pipeline", skip_all)]
pub fn pipeline(service: &CrmService, out: Output) -> Result<()> {
    let board = metrics::pipeline_board(&service.snapshot());
    out.emit(&board, || render::pipeline(&board))
}

#[instrument(name = "cli.check", skip_all)]
pub fn check(service: &CrmService, out: Output) -> Result<()> {
    let issues: Vec<String> = service
        .snapshot()
        .integrity_issues()
        .iter()
        .map(ToString::to_string)
        .collect();
    out.emit(&issues, || {
        if issues.is_empty() {
            "no integrity issues\n".to_string()
        } else {
            issues.iter().map(|issue| format!("{issue}\n")).collect()
        }
    })
}

#[instrument(name = "cli.accounts", skip_all)]
pub fn accounts(service: &mut CrmService, cmd: AccountCommand, out: Output) -> Result<()> {
    match cmd {
        AccountCommand::List => {
            let data = service.snapshot();
            out.emit(&data.accounts_sorted(), || render::accounts(&data))
        }
        AccountCommand::Show { id } => {
            let data = service.snapshot();
            let account = data
                .account(&id)
                .ok_or_else(|| ApiError::not_found("account", &id))?;
            out.emit(account, || render::account_detail(&data, account))
        }
        AccountCommand::Create(fields) => {
            let input = new_account(fields)?;
            validation::validate_new_account(&input)?;
            let data = service.create_account(input);
            let account = data.accounts.last().context("created account missing")?;
            out.emit(account, || render::account_detail(&data, account))
        }
        AccountCommand::Update { id, fields } => {
            let patch = account_patch(fields)?;
            validation::validate_account_patch(&patch)?;
            let data = service.update_account(&id, patch)?;
            let account = data.account(&id).context("updated account missing")?;
            out.emit(account, || render::account_detail(&data, account))
        }
        AccountCommand::Delete { id } => {
            let data = service.delete_account(&id)?;
            deleted(out, "account", &id, data.accounts.len())
        }
    }
}

#[instrument(name = "cli.contacts", skip_all)]
pub fn contacts(service: &mut CrmService, cmd: ContactCommand, out: Output) -> Result<()> {
    match cmd {
        ContactCommand::List => {
            let data = service.snapshot();
            out.emit(&data.contacts_sorted(), || render::contacts(&data))
        }
        ContactCommand::Show { id } => {
            let data = service.snapshot();
            let contact = data
                .contact(&id)
                .ok_or_else(|| ApiError::not_found("contact", &id))?;
            out.emit(contact, || render::contact_detail(&data, contact))
        }
        ContactCommand::Create(fields) => {
            let input = NewContact {
                account_id: trimmed(fields.account_id).unwrap_or_default(),
                first_name: trimmed(fields.first_name).unwrap_or_default(),
                last_name: trimmed(fields.last_name).unwrap_or_default(),
                email: trimmed(fields.email).unwrap_or_default(),
                phone: non_blank(fields.phone),
                job_title: non_blank(fields.job_title),
            };
            validation::validate_new_contact(&input)?;
            let data = service.create_contact(input)?;
            let contact = data.contacts.last().context("created contact missing")?;
            out.emit(contact, || render::contact_detail(&data, contact))
        }
        ContactCommand::Update { id, fields } => {
            let current = service
                .contact(&id)
                .cloned()
                .ok_or_else(|| ApiError::not_found("contact", &id))?;
            let patch = ContactPatch {
                account_id: trimmed(fields.account_id),
                first_name: trimmed(fields.first_name),
                last_name: trimmed(fields.last_name),
                email: trimmed(fields.email),
                phone: clearable(fields.phone),
                job_title: clearable(fields.job_title),
            };
            validation::validate_contact_update(&current, &patch)?;
            let data = service.update_contact(&id, patch)?;
            let contact = data.contact(&id).context("updated contact missing")?;
            out.emit(contact, || render::contact_detail(&data, contact))
        }
        ContactCommand::Delete { id } => {
            let data = service.delete_contact(&id)?;
            deleted(out, "contact", &id, data.contacts.len())
        }
    }
}

#[instrument(name = "cli.opportunities", skip_all)]
pub fn opportunities(service: &mut CrmService, cmd: OpportunityCommand, out: Output) -> Result<()> {
    match cmd {
        OpportunityCommand::List => {
            let data = service.snapshot();
            out.emit(&data.opportunities_sorted(), || render::opportunities(&data))
        }
        OpportunityCommand::Show { id } => {
            let data = service.snapshot();
            let opp = data
                .opportunity(&id)
                .ok_or_else(|| ApiError::not_found("opportunity", &id))?;
            out.emit(opp, || render::opportunity_detail(&data, opp))
        }
        OpportunityCommand::Create(fields) => {
            let input = new_opportunity(fields)?;
            validation::validate_new_opportunity(&input)?;
            let data = service.create_opportunity(input)?;
            let opp = data
                .opportunities
                .last()
                .context("created opportunity missing")?;
            out.emit(opp, || render::opportunity_detail(&data, opp))
        }
        OpportunityCommand::Update { id, fields } => {
            let patch = OpportunityPatch {
                account_id: fields.account_id,
                contact_id: clearable(fields.contact_id),
                name: fields.name,
                stage: fields.stage,
                amount: fields.amount,
                close_date: fields.close_date,
            };
            validation::validate_opportunity_patch(&patch)?;
            let data = service.update_opportunity(&id, patch)?;
            let opp = data.opportunity(&id).context("updated opportunity missing")?;
            out.emit(opp, || render::opportunity_detail(&data, opp))
        }
        OpportunityCommand::Move { id, stage } => {
            let data = service.move_opportunity(&id, stage)?;
            let opp = data.opportunity(&id).context("moved opportunity missing")?;
            out.emit(opp, || render::opportunity_detail(&data, opp))
        }
        OpportunityCommand::Delete { id } => {
            let data = service.delete_opportunity(&id)?;
            deleted(out, "opportunity", &id, data.opportunities.len())
        }
    }
}

fn deleted(out: Output, entity: &str, id: &str, remaining: usize) -> Result<()> {
    #[derive(Serialize)]
    struct Deleted<'a> {
        deleted: &'a str,
        id: &'a str,
        remaining: usize,
    }
    let body = Deleted {
        deleted: entity,
        id,
        remaining,
    };
    out.emit(&body, || format!("deleted {entity} {id} ({remaining} left)\n"))
}

fn new_account(fields: AccountFields) -> Result<NewAccount, ApiError> {
    Ok(NewAccount {
        name: fields.name.unwrap_or_default(),
        industry: non_blank(fields.industry),
        website: non_blank(fields.website),
        description: non_blank(fields.description),
        annual_revenue: fields.annual_revenue,
        employee_count: fields.employee_count,
        status: parse_status(fields.status)?.flatten(),
    })
}

fn account_patch(fields: AccountFields) -> Result<AccountPatch, ApiError> {
    Ok(AccountPatch {
        name: fields.name,
        industry: clearable(fields.industry),
        website: clearable(fields.website),
        description: clearable(fields.description),
        annual_revenue: fields.annual_revenue.map(Some),
        employee_count: fields.employee_count.map(Some),
        status: parse_status(fields.status)?,
    })
}

fn new_opportunity(fields: OpportunityFields) -> Result<NewOpportunity, ApiError> {
    let close_date = fields
        .close_date
        .ok_or_else(|| ApiError::invalid("close date is required"))?;
    Ok(NewOpportunity {
        account_id: fields.account_id.unwrap_or_default(),
        contact_id: non_blank(fields.contact_id),
        name: fields.name.unwrap_or_default(),
        stage: fields.stage.unwrap_or_default(),
        amount: fields
            .amount
            .ok_or_else(|| ApiError::invalid("amount is required"))?,
        close_date,
        status: None,
    })
}

/// `Some("")` clears the status.
fn parse_status(raw: Option<String>) -> Result<Option<Option<AccountStatus>>, ApiError> {
    match clearable(raw) {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(value)) => value
            .parse::<AccountStatus>()
            .map(|status| Some(Some(status)))
            .map_err(|err| ApiError::invalid(err.to_string())),
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|raw| raw.trim().to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    clearable(value).flatten()
}

/// Maps a flag to a patch field: absent leaves it, blank clears it.
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
