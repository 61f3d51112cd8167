//! Field rules checked at the presentation boundary before a create or
//! update reaches the service. The service itself only enforces references.

use entity::{
    AccountPatch, Contact, ContactPatch, NewAccount, NewContact, NewOpportunity, OpportunityPatch,
};
use platform_api::{ApiError, ApiResult};
use url::Url;

const MAX_NAME_LEN: usize = 200;
/// Upper bound for amounts and revenue, in whole currency units.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

pub fn validate_new_account(input: &NewAccount) -> ApiResult<()> {
    validate_name("name", &input.name)?;
    validate_website(input.website.as_deref())?;
    validate_revenue(input.annual_revenue)?;
    validate_employee_count(input.employee_count)
}

pub fn validate_account_patch(patch: &AccountPatch) -> ApiResult<()> {
    if let Some(name) = &patch.name {
        validate_name("name", name)?;
    }
    if let Some(website) = &patch.website {
        validate_website(website.as_deref())?;
    }
    if let Some(revenue) = patch.annual_revenue {
        validate_revenue(revenue)?;
    }
    if let Some(count) = patch.employee_count {
        validate_employee_count(count)?;
    }
    Ok(())
}

pub fn validate_new_contact(input: &NewContact) -> ApiResult<()> {
    validate_contact_name(&input.first_name, &input.last_name)?;
    validate_email(&input.email)?;
    require_reference("account", &input.account_id)
}

/// Checks the fields a patch sets. A patch that blanks both name parts is
/// rejected; use [`validate_contact_update`] to also check against the
/// current record.
pub fn validate_contact_patch(patch: &ContactPatch) -> ApiResult<()> {
    match (&patch.first_name, &patch.last_name) {
        (Some(first), Some(last)) => validate_contact_name(first, last)?,
        (Some(first), None) => validate_length("first name", first, MAX_NAME_LEN)?,
        (None, Some(last)) => validate_length("last name", last, MAX_NAME_LEN)?,
        (None, None) => {}
    }
    if let Some(email) = &patch.email {
        validate_email(email)?;
    }
    if let Some(account_id) = &patch.account_id {
        require_reference("account", account_id)?;
    }
    Ok(())
}

/// Patch rules plus the name rule applied to the merged contact.
pub fn validate_contact_update(current: &Contact, patch: &ContactPatch) -> ApiResult<()> {
    validate_contact_patch(patch)?;
    let merged = current.merged(patch);
    validate_contact_name(&merged.first_name, &merged.last_name)
}

fn validate_contact_name(first: &str, last: &str) -> ApiResult<()> {
    if first.trim().is_empty() && last.trim().is_empty() {
        return Err(ApiError::invalid("contact name is required"));
    }
    validate_length("first name", first, MAX_NAME_LEN)?;
    validate_length("last name", last, MAX_NAME_LEN)
}

pub fn validate_new_opportunity(input: &NewOpportunity) -> ApiResult<()> {
    validate_name("name", &input.name)?;
    require_reference("account", &input.account_id)?;
    validate_amount(input.amount)
}

pub fn validate_opportunity_patch(patch: &OpportunityPatch) -> ApiResult<()> {
    if let Some(name) = &patch.name {
        validate_name("name", name)?;
    }
    if let Some(account_id) = &patch.account_id {
        require_reference("account", account_id)?;
    }
    if let Some(amount) = patch.amount {
        validate_amount(amount)?;
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid(format!("{field} is required")));
    }
    validate_length(field, value, MAX_NAME_LEN)
}

fn validate_length(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.chars().count() > max {
        return Err(ApiError::invalid(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn require_reference(field: &str, id: &str) -> ApiResult<()> {
    if id.trim().is_empty() {
        return Err(ApiError::invalid(format!("an associated {field} is required")));
    }
    Ok(())
}

fn validate_amount(amount: i64) -> ApiResult<()> {
    if amount <= 0 {
        return Err(ApiError::invalid("amount must be greater than zero"));
    }
    if amount > MAX_AMOUNT {
        return Err(ApiError::invalid(format!(
            "amount must be at most {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

fn validate_revenue(revenue: Option<i64>) -> ApiResult<()> {
    match revenue {
        Some(value) if value < 0 => Err(ApiError::invalid("annual revenue cannot be negative")),
        Some(value) if value > MAX_AMOUNT => Err(ApiError::invalid(format!(
            "annual revenue must be at most {MAX_AMOUNT}"
        ))),
        _ => Ok(()),
    }
}

fn validate_employee_count(count: Option<u32>) -> ApiResult<()> {
    match count {
        Some(0) => Err(ApiError::invalid(
            "employee count must be greater than zero",
        )),
        _ => Ok(()),
    }
}

fn validate_website(website: Option<&str>) -> ApiResult<()> {
    let Some(raw) = website else {
        return Ok(());
    };
    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
        _ => Err(ApiError::invalid("website must be an absolute http(s) URL")),
    }
}

/// Loose shape check: one `@`, a non-empty local part, and a dotted domain.
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn validate_email(value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid("email is required"));
    }
    if !is_valid_email(value) {
        return Err(ApiError::invalid("email must be valid"));
    }
    Ok(())
}
