use std::sync::Arc;

use chrono::Utc;
use entity::{
    Account, AccountPatch, Contact, ContactPatch, Dataset, NewAccount, NewContact, NewOpportunity,
    Opportunity, OpportunityPatch, Stage,
};
use platform_api::{ApiError, ApiResult};
use platform_db::{BlobStore, MemoryStore, StoreSettings};
use tracing::{debug, info};

use crate::{
    ids::{self, ACCOUNT_PREFIX, CONTACT_PREFIX, OPPORTUNITY_PREFIX},
    metrics::{self, Metrics},
    seed,
};

/// Sole owner of the CRM dataset.
///
/// Each mutation builds a new [`Dataset`] from the current one, persists it
/// through the blob store and swaps it in; callers get the new snapshot.
/// A failed mutation leaves both the snapshot and storage untouched.
#[derive(Debug)]
pub struct CrmService {
    data: Arc<Dataset>,
    store: BlobStore,
}

impl CrmService {
    /// Loads the persisted dataset, or seeds and persists a fresh one when
    /// nothing usable is stored.
    pub fn open(mut store: BlobStore) -> Self {
        let data = match store.load::<Dataset>() {
            Some(data) => {
                info!(
                    key = store.key(),
                    accounts = data.accounts.len(),
                    contacts = data.contacts.len(),
                    opportunities = data.opportunities.len(),
                    "loaded persisted dataset"
                );
                data
            }
            None => {
                let seeded = seed::build();
                store.save(&seeded);
                info!(key = store.key(), "seeded starter dataset");
                seeded
            }
        };
        Self {
            data: Arc::new(data),
            store,
        }
    }

    pub fn from_settings(settings: &StoreSettings) -> Self {
        Self::open(BlobStore::from_settings(settings))
    }

    pub fn in_memory() -> Self {
        Self::open(BlobStore::new(MemoryStore::new(), platform_db::DEFAULT_KEY))
    }

    pub fn snapshot(&self) -> Arc<Dataset> {
        Arc::clone(&self.data)
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::compute(&self.data)
    }

    pub fn stage_value(&self, stage: Stage) -> i64 {
        metrics::stage_value(&self.data, stage)
    }

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.data.account(id)
    }

    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.data.contact(id)
    }

    pub fn opportunity(&self, id: &str) -> Option<&Opportunity> {
        self.data.opportunity(id)
    }

    pub fn contacts_for_account(&self, account_id: &str) -> Vec<&Contact> {
        self.data.contacts_for_account(account_id)
    }

    pub fn opportunities_for_account(&self, account_id: &str) -> Vec<&Opportunity> {
        self.data.opportunities_for_account(account_id)
    }

    pub fn opportunities_for_contact(&self, contact_id: &str) -> Vec<&Opportunity> {
        self.data.opportunities_for_contact(contact_id)
    }

    pub fn create_account(&mut self, input: NewAccount) -> Arc<Dataset> {
        let account = Account::from_input(ids::generate(Some(ACCOUNT_PREFIX)), Utc::now(), input);
        debug!(account_id = %account.id, "account created");
        let mut next = self.draft();
        next.accounts.push(account);
        self.commit(next)
    }

    pub fn update_account(&mut self, id: &str, patch: AccountPatch) -> ApiResult<Arc<Dataset>> {
        let updated = self.require_account(id)?.merged(&patch);
        let mut next = self.draft();
        replace(&mut next.accounts, updated, |a| &a.id);
        debug!(account_id = id, "account updated");
        Ok(self.commit(next))
    }

    /// Removes the account together with its contacts and opportunities.
    pub fn delete_account(&mut self, id: &str) -> ApiResult<Arc<Dataset>> {
        self.require_account(id)?;
        let mut next = self.draft();
        next.accounts.retain(|account| account.id != id);
        let contacts_before = next.contacts.len();
        next.contacts.retain(|contact| contact.account_id != id);
        let opps_before = next.opportunities.len();
        next.opportunities.retain(|opp| opp.account_id != id);
        debug!(
            account_id = id,
            contacts_removed = contacts_before - next.contacts.len(),
            opportunities_removed = opps_before - next.opportunities.len(),
            "account deleted"
        );
        Ok(self.commit(next))
    }

    pub fn create_contact(&mut self, input: NewContact) -> ApiResult<Arc<Dataset>> {
        self.require_account_reference(&input.account_id)?;
        let contact = Contact::from_input(ids::generate(Some(CONTACT_PREFIX)), Utc::now(), input);
        debug!(contact_id = %contact.id, account_id = %contact.account_id, "contact created");
        let mut next = self.draft();
        next.contacts.push(contact);
        Ok(self.commit(next))
    }

    /// Merges `patch`. Moving the contact to another account detaches it from
    /// opportunities that stay with the old account.
    pub fn update_contact(&mut self, id: &str, patch: ContactPatch) -> ApiResult<Arc<Dataset>> {
        let current = self.require_contact(id)?;
        let updated = current.merged(&patch);
        let moved = updated.account_id != current.account_id;
        if moved {
            self.require_account_reference(&updated.account_id)?;
        }

        let mut next = self.draft();
        let new_account = updated.account_id.clone();
        replace(&mut next.contacts, updated, |c| &c.id);
        if moved {
            let detached = detach_contact(&mut next.opportunities, id, |opp| {
                opp.account_id != new_account
            });
            debug!(contact_id = id, detached, "contact moved to account {new_account}");
        } else {
            debug!(contact_id = id, "contact updated");
        }
        Ok(self.commit(next))
    }

    /// Removes the contact and clears it from every opportunity that used it.
    pub fn delete_contact(&mut self, id: &str) -> ApiResult<Arc<Dataset>> {
        self.require_contact(id)?;
        let mut next = self.draft();
        next.contacts.retain(|contact| contact.id != id);
        let detached = detach_contact(&mut next.opportunities, id, |_| true);
        debug!(contact_id = id, detached, "contact deleted");
        Ok(self.commit(next))
    }

    pub fn create_opportunity(&mut self, input: NewOpportunity) -> ApiResult<Arc<Dataset>> {
        self.require_account_reference(&input.account_id)?;
        if let Some(contact_id) = &input.contact_id {
            self.require_contact_in_account(contact_id, &input.account_id)?;
        }
        let opportunity =
            Opportunity::from_input(ids::generate(Some(OPPORTUNITY_PREFIX)), Utc::now(), input);
        debug!(
            opportunity_id = %opportunity.id,
            stage = %opportunity.stage,
            "opportunity created"
        );
        let mut next = self.draft();
        next.opportunities.push(opportunity);
        Ok(self.commit(next))
    }

    /// Merges `patch` and re-derives the status from the resulting stage.
    ///
    /// When the opportunity moves to another account without naming a
    /// contact, a contact from the old account is cleared. A contact named in
    /// the patch must exist and belong to the resulting account.
    pub fn update_opportunity(
        &mut self,
        id: &str,
        patch: OpportunityPatch,
    ) -> ApiResult<Arc<Dataset>> {
        let current = self.require_opportunity(id)?;
        let mut updated = current.merged(&patch);
        if updated.account_id != current.account_id {
            self.require_account_reference(&updated.account_id)?;
        }
        if let Some(contact_id) = updated.contact_id.clone() {
            let named_in_patch = matches!(patch.contact_id, Some(Some(_)));
            if named_in_patch {
                self.require_contact_in_account(&contact_id, &updated.account_id)?;
            } else if self
                .data
                .contact(&contact_id)
                .is_none_or(|contact| contact.account_id != updated.account_id)
            {
                updated.contact_id = None;
            }
        }

        debug!(
            opportunity_id = id,
            stage = %updated.stage,
            status = %updated.status,
            "opportunity updated"
        );
        let mut next = self.draft();
        replace(&mut next.opportunities, updated, |o| &o.id);
        Ok(self.commit(next))
    }

    /// Pipeline-board shortcut for a stage change.
    pub fn move_opportunity(&mut self, id: &str, stage: Stage) -> ApiResult<Arc<Dataset>> {
        self.update_opportunity(
            id,
            OpportunityPatch {
                stage: Some(stage),
                ..Default::default()
            },
        )
    }

    pub fn delete_opportunity(&mut self, id: &str) -> ApiResult<Arc<Dataset>> {
        self.require_opportunity(id)?;
        let mut next = self.draft();
        next.opportunities.retain(|opp| opp.id != id);
        debug!(opportunity_id = id, "opportunity deleted");
        Ok(self.commit(next))
    }

    /// Discards everything and starts over from the seed dataset.
    pub fn reset_data(&mut self) -> Arc<Dataset> {
        info!("resetting dataset to seed data");
        self.commit(seed::build())
    }

    /// Removes the persisted blob. The in-memory dataset is kept, so the next
    /// mutation writes it back.
    pub fn clear_storage(&mut self) {
        info!(key = self.store.key(), "clearing persisted dataset");
        self.store.clear();
    }

    fn draft(&self) -> Dataset {
        Dataset::clone(&self.data)
    }

    fn commit(&mut self, next: Dataset) -> Arc<Dataset> {
        self.store.save(&next);
        self.data = Arc::new(next);
        self.snapshot()
    }

    fn require_account(&self, id: &str) -> ApiResult<&Account> {
        self.data
            .account(id)
            .ok_or_else(|| ApiError::not_found("account", id))
    }

    fn require_contact(&self, id: &str) -> ApiResult<&Contact> {
        self.data
            .contact(id)
            .ok_or_else(|| ApiError::not_found("contact", id))
    }

    fn require_opportunity(&self, id: &str) -> ApiResult<&Opportunity> {
        self.data
            .opportunity(id)
            .ok_or_else(|| ApiError::not_found("opportunity", id))
    }

    fn require_account_reference(&self, account_id: &str) -> ApiResult<()> {
        if self.data.account(account_id).is_none() {
            return Err(ApiError::integrity(format!(
                "account {account_id} does not exist"
            )));
        }
        Ok(())
    }

    fn require_contact_in_account(&self, contact_id: &str, account_id: &str) -> ApiResult<()> {
        match self.data.contact(contact_id) {
            None => Err(ApiError::integrity(format!(
                "contact {contact_id} does not exist"
            ))),
            Some(contact) if contact.account_id != account_id => {
                Err(ApiError::integrity(format!(
                    "contact {contact_id} belongs to account {}, not {account_id}",
                    contact.account_id
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

fn replace<T>(items: &mut [T], value: T, id: impl Fn(&T) -> &String) {
    if let Some(slot) = items.iter_mut().find(|item| id(item) == id(&value)) {
        *slot = value;
    }
}

/// Clears `contact_id` on opportunities using `contact_id` that match
/// `should_detach`. Returns how many were touched.
fn detach_contact(
    opportunities: &mut [Opportunity],
    contact_id: &str,
    should_detach: impl Fn(&Opportunity) -> bool,
) -> usize {
    let mut detached = 0;
    for opp in opportunities
        .iter_mut()
        .filter(|opp| opp.contact_id.as_deref() == Some(contact_id))
    {
        if should_detach(opp) {
            opp.contact_id = None;
            detached += 1;
        }
    }
    detached
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use entity::OpportunityStatus;
    use platform_db::KeyValueStore;

    use super::*;

    fn service_with_store() -> (CrmService, MemoryStore) {
        let backend = MemoryStore::new();
        let service = CrmService::open(BlobStore::new(backend.clone(), "crm-data"));
        (service, backend)
    }

    fn persisted(backend: &MemoryStore) -> Dataset {
        let bytes = backend.get("crm-data").unwrap().expect("blob persisted");
        serde_json::from_slice(&bytes).unwrap()
    }

    fn close_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 15).unwrap()
    }

    #[test]
    fn empty_store_is_seeded_and_persisted() {
        let (service, backend) = service_with_store();
        assert_eq!(service.snapshot().accounts.len(), 3);
        assert_eq!(persisted(&backend), *service.snapshot());
    }

    #[test]
    fn existing_data_is_used_as_is() {
        let backend = MemoryStore::new();
        let stored = Dataset::default();
        backend
            .set("crm-data", &serde_json::to_vec(&stored).unwrap())
            .unwrap();
        let service = CrmService::open(BlobStore::new(backend, "crm-data"));
        assert!(service.snapshot().accounts.is_empty());
    }

    #[test]
    fn corrupt_data_falls_back_to_seed() {
        let backend = MemoryStore::new();
        backend.set("crm-data", b"{\"accounts\": 12").unwrap();
        let service = CrmService::open(BlobStore::new(backend.clone(), "crm-data"));
        assert_eq!(service.snapshot().accounts.len(), 3);
        assert_eq!(persisted(&backend).accounts.len(), 3);
    }

    #[test]
    fn create_account_appends_and_persists() {
        let (mut service, backend) = service_with_store();
        let before = service.snapshot();
        let after = service.create_account(NewAccount {
            name: "Globex Corporation".into(),
            industry: Some("Technology".into()),
            ..Default::default()
        });
        assert_eq!(after.accounts.len(), before.accounts.len() + 1);
        let created = after.accounts.last().unwrap();
        assert!(created.id.starts_with("acc-"));
        assert_eq!(persisted(&backend).accounts.last().unwrap().id, created.id);
        // earlier snapshots are untouched
        assert_eq!(before.accounts.len(), 3);
    }

    #[test]
    fn update_account_merges_and_reports_missing() {
        let (mut service, _) = service_with_store();
        let id = service.snapshot().accounts[0].id.clone();
        let next = service
            .update_account(
                &id,
                AccountPatch {
                    description: Some(Some("Analytics platform".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        let account = next.account(&id).unwrap();
        assert_eq!(account.description.as_deref(), Some("Analytics platform"));
        assert_eq!(account.name, "Nimbus Analytics");

        let err = service
            .update_account("acc-missing", AccountPatch::default())
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn delete_account_cascades() {
        let (mut service, backend) = service_with_store();
        let id = service.snapshot().accounts[0].id.clone();
        let next = service.delete_account(&id).unwrap();
        assert!(next.account(&id).is_none());
        assert!(next.contacts.iter().all(|c| c.account_id != id));
        assert!(next.opportunities.iter().all(|o| o.account_id != id));
        assert!(next.integrity_issues().is_empty());
        assert_eq!(persisted(&backend), *next);
    }

    #[test]
    fn create_contact_rejects_unknown_account() {
        let (mut service, backend) = service_with_store();
        let before = persisted(&backend);
        let err = service
            .create_contact(NewContact {
                account_id: "acc-nope".into(),
                first_name: "Lucius".into(),
                last_name: "Fox".into(),
                email: "lucius.fox@wayne.example.com".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "INTEGRITY_VIOLATION");
        assert_eq!(service.snapshot().contacts.len(), 4);
        assert_eq!(persisted(&backend), before);
    }

    #[test]
    fn moving_a_contact_detaches_it_from_old_account_deals() {
        let (mut service, _) = service_with_store();
        let data = service.snapshot();
        let opp = data.opportunities[0].clone();
        let contact_id = opp.contact_id.clone().unwrap();
        let other_account = data
            .accounts
            .iter()
            .find(|a| a.id != opp.account_id)
            .unwrap()
            .id
            .clone();

        let next = service
            .update_contact(
                &contact_id,
                ContactPatch {
                    account_id: Some(other_account.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(next.contact(&contact_id).unwrap().account_id, other_account);
        let repaired = next.opportunity(&opp.id).unwrap();
        assert_eq!(repaired.contact_id, None);
        assert!(next.integrity_issues().is_empty());
    }

    #[test]
    fn contact_edit_without_move_keeps_references() {
        let (mut service, _) = service_with_store();
        let opp = service.snapshot().opportunities[0].clone();
        let contact_id = opp.contact_id.clone().unwrap();
        let next = service
            .update_contact(
                &contact_id,
                ContactPatch {
                    job_title: Some(Some("CRO".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(next.opportunity(&opp.id).unwrap().contact_id, Some(contact_id));
    }

    #[test]
    fn delete_contact_clears_references() {
        let (mut service, _) = service_with_store();
        let opp = service.snapshot().opportunities[1].clone();
        let contact_id = opp.contact_id.clone().unwrap();
        let next = service.delete_contact(&contact_id).unwrap();
        assert!(next.contact(&contact_id).is_none());
        let survivor = next.opportunity(&opp.id).expect("opportunity survives");
        assert_eq!(survivor.contact_id, None);
        assert_eq!(next.opportunities.len(), 3);
    }

    #[test]
    fn create_opportunity_checks_contact_account() {
        let (mut service, _) = service_with_store();
        let data = service.snapshot();
        let nimbus = &data.accounts[0];
        let harbor_contact = data
            .contacts
            .iter()
            .find(|c| c.account_id != nimbus.id)
            .unwrap();
        let err = service
            .create_opportunity(NewOpportunity {
                account_id: nimbus.id.clone(),
                contact_id: Some(harbor_contact.id.clone()),
                name: "Cross-account".into(),
                stage: Stage::Proposal,
                amount: 10_000,
                close_date: close_date(),
                status: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "INTEGRITY_VIOLATION");
        assert_eq!(service.snapshot().opportunities.len(), 3);
    }

    #[test]
    fn create_opportunity_derives_status_unless_given() {
        let (mut service, _) = service_with_store();
        let account_id = service.snapshot().accounts[0].id.clone();
        let input = NewOpportunity {
            account_id,
            name: "Renewal".into(),
            stage: Stage::ClosedLost,
            amount: 5_000,
            close_date: close_date(),
            ..Default::default()
        };
        let next = service.create_opportunity(input.clone()).unwrap();
        assert_eq!(next.opportunities.last().unwrap().status, OpportunityStatus::Lost);

        let next = service
            .create_opportunity(NewOpportunity {
                status: Some(OpportunityStatus::Open),
                ..input
            })
            .unwrap();
        assert_eq!(next.opportunities.last().unwrap().status, OpportunityStatus::Open);
    }

    #[test]
    fn update_opportunity_always_rederives_status() {
        let (mut service, _) = service_with_store();
        let id = service.snapshot().opportunities[0].id.clone();
        for stage in Stage::ALL {
            let next = service.move_opportunity(&id, stage).unwrap();
            assert_eq!(next.opportunity(&id).unwrap().status, stage.status());
        }
        let next = service
            .update_opportunity(
                &id,
                OpportunityPatch {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(next.opportunity(&id).unwrap().status, OpportunityStatus::Lost);
    }

    #[test]
    fn update_opportunity_account_move_repairs_contact() {
        let (mut service, _) = service_with_store();
        let data = service.snapshot();
        let opp = data.opportunities[0].clone();
        let target = data
            .accounts
            .iter()
            .find(|a| a.id != opp.account_id)
            .unwrap()
            .id
            .clone();
        let next = service
            .update_opportunity(
                &opp.id,
                OpportunityPatch {
                    account_id: Some(target.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        let moved = next.opportunity(&opp.id).unwrap();
        assert_eq!(moved.account_id, target);
        assert_eq!(moved.contact_id, None);
        assert!(next.integrity_issues().is_empty());
    }

    #[test]
    fn update_opportunity_rejects_foreign_contact_and_unknown_account() {
        let (mut service, _) = service_with_store();
        let data = service.snapshot();
        let opp = data.opportunities[0].clone();
        let foreign = data
            .contacts
            .iter()
            .find(|c| c.account_id != opp.account_id)
            .unwrap()
            .id
            .clone();
        let err = service
            .update_opportunity(
                &opp.id,
                OpportunityPatch {
                    contact_id: Some(Some(foreign)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "INTEGRITY_VIOLATION");

        let err = service
            .update_opportunity(
                &opp.id,
                OpportunityPatch {
                    account_id: Some("acc-ghost".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "INTEGRITY_VIOLATION");
        assert_eq!(*service.snapshot(), *data);
    }

    #[test]
    fn deletes_of_unknown_ids_are_not_found() {
        let (mut service, _) = service_with_store();
        assert_eq!(service.delete_account("x").unwrap_err().code(), "NOT_FOUND");
        assert_eq!(service.delete_contact("x").unwrap_err().code(), "NOT_FOUND");
        assert_eq!(service.delete_opportunity("x").unwrap_err().code(), "NOT_FOUND");
        assert_eq!(service.move_opportunity("x", Stage::Proposal).unwrap_err().code(), "NOT_FOUND");
    }

    #[test]
    fn updates_of_unknown_ids_are_not_found() {
        let (mut service, backend) = service_with_store();
        let before = persisted(&backend);
        let err = service
            .update_contact(
                "con-missing",
                ContactPatch {
                    first_name: Some("Ghost".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        let err = service
            .update_opportunity("opp-missing", OpportunityPatch::default())
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(persisted(&backend), before);
    }

    #[test]
    fn update_account_leaves_related_records_alone() {
        let (mut service, _) = service_with_store();
        let data = service.snapshot();
        let id = data.accounts[1].id.clone();
        let next = service
            .update_account(
                &id,
                AccountPatch {
                    name: Some("Harbor Logistics Group".into()),
                    status: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(next.account(&id).unwrap().name, "Harbor Logistics Group");
        assert_eq!(next.account(&id).unwrap().status, None);
        assert_eq!(next.contacts, data.contacts);
        assert_eq!(next.opportunities, data.opportunities);
    }

    #[test]
    fn delete_opportunity_has_no_cascade() {
        let (mut service, _) = service_with_store();
        let data = service.snapshot();
        let id = data.opportunities[0].id.clone();
        let next = service.delete_opportunity(&id).unwrap();
        assert_eq!(next.opportunities.len(), 2);
        assert_eq!(next.accounts, data.accounts);
        assert_eq!(next.contacts, data.contacts);
    }

    #[test]
    fn reset_rebuilds_seed() {
        let (mut service, backend) = service_with_store();
        let first = service.snapshot().accounts[0].id.clone();
        service.delete_account(&first).unwrap();
        let next = service.reset_data();
        assert_eq!(next.accounts.len(), 3);
        assert_ne!(next.accounts[0].id, first);
        assert_eq!(persisted(&backend), *next);
    }

    #[test]
    fn clear_storage_keeps_memory_state() {
        let (mut service, backend) = service_with_store();
        service.clear_storage();
        assert!(!backend.contains("crm-data"));
        assert_eq!(service.snapshot().accounts.len(), 3);
    }
}
