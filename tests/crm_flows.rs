use anyhow::{Context, Result};
use entity::{AccountStatus, ContactPatch, OpportunityPatch, OpportunityStatus, Stage};
use products_crm::{CrmService, metrics};
use suite_tests::{atlas_account, atlas_contact, atlas_opportunity};

#[test]
fn seeded_dataset_has_the_starter_accounts() {
    let service = CrmService::in_memory();
    let data = service.snapshot();
    let accounts: Vec<(&str, Option<AccountStatus>)> = data
        .accounts
        .iter()
        .map(|a| (a.name.as_str(), a.status))
        .collect();
    assert_eq!(
        accounts,
        vec![
            ("Nimbus Analytics", Some(AccountStatus::Active)),
            ("Harbor & Co. Logistics", Some(AccountStatus::Prospect)),
            ("Radiant Health Partners", Some(AccountStatus::Active)),
        ]
    );
    assert_eq!(data.contacts.len(), 4);
    assert_eq!(data.opportunities.len(), 3);
    assert!(data.integrity_issues().is_empty());
    assert_eq!(service.stage_value(Stage::Proposal), 185_000);
}

#[test]
fn atlas_manufacturing_flow() -> Result<()> {
    let mut service = CrmService::in_memory();
    let proposal_before = service.stage_value(Stage::Proposal);
    let won_before = service.stage_value(Stage::ClosedWon);

    let data = service.create_account(atlas_account());
    let account_id = data.accounts.last().context("account")?.id.clone();
    let data = service.create_contact(atlas_contact(&account_id))?;
    let contact_id = data.contacts.last().context("contact")?.id.clone();
    let data = service.create_opportunity(atlas_opportunity(&account_id, Some(&contact_id)))?;
    let opp = data.opportunities.last().context("opportunity")?.clone();
    assert_eq!(opp.status, OpportunityStatus::Open);
    assert_eq!(service.stage_value(Stage::Proposal), proposal_before + 98_000);

    let data = service.update_opportunity(
        &opp.id,
        OpportunityPatch {
            stage: Some(Stage::ClosedWon),
            amount: Some(110_000),
            ..Default::default()
        },
    )?;
    let won = data.opportunity(&opp.id).context("won opportunity")?;
    assert_eq!(won.status, OpportunityStatus::Won);
    assert_eq!(service.stage_value(Stage::Proposal), proposal_before);
    assert_eq!(service.stage_value(Stage::ClosedWon), won_before + 110_000);
    assert_eq!(metrics::closed_won_value(&data), won_before + 110_000);

    let data = service.delete_contact(&contact_id)?;
    assert_eq!(data.opportunity(&opp.id).context("survivor")?.contact_id, None);

    let data = service.delete_account(&account_id)?;
    assert!(data.account(&account_id).is_none());
    assert!(data.contacts_for_account(&account_id).is_empty());
    assert!(data.opportunity(&opp.id).is_none());
    assert!(data.integrity_issues().is_empty());
    Ok(())
}

#[test]
fn reopening_a_closed_deal_makes_it_open_again() -> Result<()> {
    let mut service = CrmService::in_memory();
    let id = service.snapshot().opportunities[0].id.clone();
    let data = service.move_opportunity(&id, Stage::ClosedLost)?;
    assert_eq!(data.opportunity(&id).context("lost")?.status, OpportunityStatus::Lost);
    let pipeline_lost = metrics::pipeline_value(&data);

    let data = service.move_opportunity(&id, Stage::Qualification)?;
    let reopened = data.opportunity(&id).context("reopened")?;
    assert_eq!(reopened.status, OpportunityStatus::Open);
    assert_eq!(metrics::pipeline_value(&data), pipeline_lost + reopened.amount);
    Ok(())
}

#[test]
fn stage_aliases_parse_to_the_same_stage() {
    assert_eq!("closed-won".parse::<Stage>().ok(), Some(Stage::ClosedWon));
    assert_eq!("Closed Won".parse::<Stage>().ok(), Some(Stage::ClosedWon));
    assert_eq!("leads".parse::<Stage>().ok(), Some(Stage::Prospecting));
    assert_eq!("qualified".parse::<Stage>().ok(), Some(Stage::Qualification));
}

#[test]
fn rejected_operations_apply_nothing() -> Result<()> {
    let mut service = CrmService::in_memory();
    let before = service.snapshot();
    let harbor_contact = before
        .contacts
        .iter()
        .find(|c| c.first_name == "Priya")
        .context("seeded contact")?
        .id
        .clone();
    let nimbus = before.accounts[0].id.clone();

    let err = service
        .create_opportunity(atlas_opportunity(&nimbus, Some(&harbor_contact)))
        .unwrap_err();
    assert_eq!(err.code(), "INTEGRITY_VIOLATION");

    let err = service
        .update_contact(
            &harbor_contact,
            ContactPatch {
                account_id: Some("acc-missing".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "INTEGRITY_VIOLATION");

    let err = service.delete_account("acc-missing").unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    assert_eq!(*service.snapshot(), *before);
    Ok(())
}

#[test]
fn board_and_totals_cover_every_stage() {
    let service = CrmService::in_memory();
    let data = service.snapshot();
    let board = metrics::pipeline_board(&data);
    assert_eq!(board.len(), Stage::ALL.len());
    let totals = metrics::stage_totals(&data);
    let negotiation = totals
        .iter()
        .find(|t| t.stage == Stage::Negotiation)
        .map(|t| (t.count, t.amount, t.expected_amount));
    assert_eq!(negotiation, Some((1, 120_000, 90_000)));

    let summary = service.metrics();
    assert_eq!(summary.total_accounts, 3);
    assert_eq!(summary.open_opportunities, 3);
    assert_eq!(summary.pipeline_value, 120_000 + 185_000 + 96_000);
}
