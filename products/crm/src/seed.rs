//! Starter dataset: three accounts, four contacts and three open deals with
//! close dates relative to the build time.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use entity::{
    Account, AccountStatus, Contact, Dataset, NewAccount, NewContact, NewOpportunity, Opportunity,
    Stage,
};

use crate::ids::{self, ACCOUNT_PREFIX, CONTACT_PREFIX, OPPORTUNITY_PREFIX};

pub fn build() -> Dataset {
    build_at(Utc::now())
}

/// Same shape as [`build`] with a fixed clock. Ids are fresh on every call.
pub fn build_at(now: DateTime<Utc>) -> Dataset {
    let today = now.date_naive();

    let nimbus = account(
        now,
        "Nimbus Analytics",
        "SaaS",
        "https://nimbusanalytics.com",
        180,
        AccountStatus::Active,
    );
    let harbor = account(
        now,
        "Harbor & Co. Logistics",
        "Logistics",
        "https://harborandco.com",
        420,
        AccountStatus::Prospect,
    );
    let radiant = account(
        now,
        "Radiant Health Partners",
        "Healthcare",
        "https://radianthealthpartners.com",
        95,
        AccountStatus::Active,
    );

    let alicia = contact(
        now,
        &nimbus,
        ("Alicia", "Hart"),
        "alicia.hart@nimbusanalytics.com",
        "(415) 555-0182",
        "VP of Revenue Operations",
    );
    let marcus = contact(
        now,
        &nimbus,
        ("Marcus", "Levine"),
        "marcus.levine@nimbusanalytics.com",
        "(415) 555-0134",
        "Director of Sales Enablement",
    );
    let priya = contact(
        now,
        &harbor,
        ("Priya", "Malhotra"),
        "priya.malhotra@harborandco.com",
        "(312) 555-0110",
        "Chief Operating Officer",
    );
    let ethan = contact(
        now,
        &radiant,
        ("Ethan", "Cole"),
        "ethan.cole@radianthealthpartners.com",
        "(617) 555-0141",
        "Head of Procurement",
    );

    let opportunities = vec![
        opportunity(
            now,
            &alicia,
            "Revenue Intelligence Rollout",
            Stage::Negotiation,
            120_000,
            today,
        ),
        opportunity(
            now,
            &priya,
            "Supply Chain Visibility Suite",
            Stage::Proposal,
            185_000,
            today + Duration::days(30),
        ),
        opportunity(
            now,
            &ethan,
            "Patient Engagement Platform",
            Stage::Qualification,
            96_000,
            today + Duration::days(45),
        ),
    ];

    Dataset {
        accounts: vec![nimbus, harbor, radiant],
        contacts: vec![alicia, marcus, priya, ethan],
        opportunities,
        ..Default::default()
    }
}

fn account(
    now: DateTime<Utc>,
    name: &str,
    industry: &str,
    website: &str,
    employees: u32,
    status: AccountStatus,
) -> Account {
    Account::from_input(
        ids::generate(Some(ACCOUNT_PREFIX)),
        now,
        NewAccount {
            name: name.to_string(),
            industry: Some(industry.to_string()),
            website: Some(website.to_string()),
            employee_count: Some(employees),
            status: Some(status),
            ..Default::default()
        },
    )
}

fn contact(
    now: DateTime<Utc>,
    account: &Account,
    (first, last): (&str, &str),
    email: &str,
    phone: &str,
    title: &str,
) -> Contact {
    Contact::from_input(
        ids::generate(Some(CONTACT_PREFIX)),
        now,
        NewContact {
            account_id: account.id.clone(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            phone: Some(phone.to_string()),
            job_title: Some(title.to_string()),
        },
    )
}

/// Deals are attached to the primary contact's own account.
fn opportunity(
    now: DateTime<Utc>,
    primary: &Contact,
    name: &str,
    stage: Stage,
    amount: i64,
    close_date: NaiveDate,
) -> Opportunity {
    Opportunity::from_input(
        ids::generate(Some(OPPORTUNITY_PREFIX)),
        now,
        NewOpportunity {
            account_id: primary.account_id.clone(),
            contact_id: Some(primary.id.clone()),
            name: name.to_string(),
            stage,
            amount,
            close_date,
            status: None,
        },
    )
}
