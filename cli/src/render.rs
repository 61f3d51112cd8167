//! Plain-text views over a dataset snapshot.

use std::fmt::Write as _;

use entity::{Account, Contact, Dataset, Opportunity};
use products_crm::{Metrics, PipelineColumn};

/// `185000` -> `$185,000`.
pub fn currency(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}${grouped}")
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

pub fn accounts(data: &Dataset) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40} {:<28} {:<14} {:<10} {:>8} {:>5}",
        "ID", "NAME", "INDUSTRY", "STATUS", "CONTACTS", "DEALS"
    );
    for account in data.accounts_sorted() {
        let _ = writeln!(
            out,
            "{:<40} {:<28} {:<14} {:<10} {:>8} {:>5}",
            account.id,
            account.name,
            or_dash(account.industry.as_deref()),
            account.status.map(|s| s.as_str()).unwrap_or("-"),
            data.contacts_for_account(&account.id).len(),
            data.opportunities_for_account(&account.id).len(),
        );
    }
    out
}

pub fn account_detail(data: &Dataset, account: &Account) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", account.name);
    let _ = writeln!(out, "  id:          {}", account.id);
    let _ = writeln!(out, "  industry:    {}", or_dash(account.industry.as_deref()));
    let _ = writeln!(out, "  website:     {}", or_dash(account.website.as_deref()));
    let _ = writeln!(
        out,
        "  status:      {}",
        account.status.map(|s| s.as_str()).unwrap_or("-")
    );
    if let Some(revenue) = account.annual_revenue {
        let _ = writeln!(out, "  revenue:     {}", currency(revenue));
    }
    if let Some(employees) = account.employee_count {
        let _ = writeln!(out, "  employees:   {employees}");
    }
    if let Some(description) = account.description.as_deref() {
        let _ = writeln!(out, "  description: {description}");
    }
    let _ = writeln!(out, "  created:     {}", account.created_at.format("%Y-%m-%d"));

    let contacts = data.contacts_for_account(&account.id);
    let _ = writeln!(out, "\nContacts ({})", contacts.len());
    for contact in contacts {
        let _ = writeln!(out, "  {:<24} {}", contact.display_name(), contact.email);
    }
    let opportunities = data.opportunities_for_account(&account.id);
    let _ = writeln!(out, "\nOpportunities ({})", opportunities.len());
    for opp in opportunities {
        let _ = writeln!(
            out,
            "  {:<32} {:<13} {:>12}",
            opp.name,
            opp.stage.label(),
            currency(opp.amount)
        );
    }
    out
}

pub fn contacts(data: &Dataset) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40} {:<22} {:<40} {:<28}",
        "ID", "NAME", "EMAIL", "ACCOUNT"
    );
    for contact in data.contacts_sorted() {
        let _ = writeln!(
            out,
            "{:<40} {:<22} {:<40} {:<28}",
            contact.id,
            contact.display_name(),
            contact.email,
            data.account_name(&contact.account_id).unwrap_or("-"),
        );
    }
    out
}

pub fn contact_detail(data: &Dataset, contact: &Contact) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", contact.display_name());
    let _ = writeln!(out, "  id:        {}", contact.id);
    let _ = writeln!(out, "  email:     {}", contact.email);
    let _ = writeln!(out, "  phone:     {}", or_dash(contact.phone.as_deref()));
    let _ = writeln!(out, "  title:     {}", or_dash(contact.job_title.as_deref()));
    let _ = writeln!(
        out,
        "  account:   {}",
        data.account_name(&contact.account_id).unwrap_or("-")
    );
    let opportunities = data.opportunities_for_contact(&contact.id);
    let _ = writeln!(out, "\nOpportunities ({})", opportunities.len());
    for opp in opportunities {
        let _ = writeln!(out, "  {:<32} {:<13}", opp.name, opp.stage.label());
    }
    out
}

pub fn opportunities(data: &Dataset) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40} {:<32} {:<13} {:<6} {:>12} {:<10}",
        "ID", "NAME", "STAGE", "STATUS", "AMOUNT", "CLOSE"
    );
    for opp in data.opportunities_sorted() {
        let _ = writeln!(
            out,
            "{:<40} {:<32} {:<13} {:<6} {:>12} {:<10}",
            opp.id,
            opp.name,
            opp.stage.label(),
            opp.status.as_str(),
            currency(opp.amount),
            opp.close_date,
        );
    }
    out
}

pub fn opportunity_detail(data: &Dataset, opp: &Opportunity) -> String {
    let contact = opp
        .contact_id
        .as_deref()
        .and_then(|id| data.contact_name(id))
        .unwrap_or_else(|| "-".into());
    let mut out = String::new();
    let _ = writeln!(out, "{}", opp.name);
    let _ = writeln!(out, "  id:        {}", opp.id);
    let _ = writeln!(
        out,
        "  account:   {}",
        data.account_name(&opp.account_id).unwrap_or("-")
    );
    let _ = writeln!(out, "  contact:   {contact}");
    let _ = writeln!(out, "  stage:     {}", opp.stage.label());
    let _ = writeln!(out, "  status:    {}", opp.status);
    let _ = writeln!(out, "  amount:    {}", currency(opp.amount));
    let _ = writeln!(out, "  closes:    {}", opp.close_date);
    out
}

pub fn dashboard(metrics: &Metrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Accounts            {}", metrics.total_accounts);
    let _ = writeln!(out, "Contacts            {}", metrics.total_contacts);
    let _ = writeln!(
        out,
        "Opportunities       {} ({} open)",
        metrics.total_opportunities, metrics.open_opportunities
    );
    let _ = writeln!(out, "Pipeline value      {}", currency(metrics.pipeline_value));
    let _ = writeln!(out, "Expected value      {}", currency(metrics.expected_value));
    let _ = writeln!(out, "Closed won          {}", currency(metrics.closed_won_value));
    out
}

pub fn pipeline(board: &[PipelineColumn]) -> String {
    let mut out = String::new();
    for column in board {
        let _ = writeln!(
            out,
            "{} [{}] {} deal(s), {}",
            column.stage.label(),
            column.stage.slug(),
            column.opportunities.len(),
            currency(column.total_amount)
        );
        for opp in &column.opportunities {
            let _ = writeln!(out, "  - {:<32} {:>12}", opp.name, currency(opp.amount));
        }
    }
    out
}
