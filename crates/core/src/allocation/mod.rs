//! Assignment preconditions and resolution gates.
//!
//! The ordering of checks in [`check_assignment`] is load-bearing: callers and
//! tests depend on which failure wins when several apply at once.

pub mod quota;

use serde::{Deserialize, Serialize};

use crate::domain::client::{Client, Quota, Role};
use crate::domain::lead::Lead;
use crate::errors::{AllocationError, ForbiddenReason};

/// Validates a single lead-to-client assignment against every precondition,
/// in order: lead state, client active, client role, quota, category access.
/// The first failing check is the one reported.
pub fn check_assignment(lead: &Lead, client: &Client) -> Result<(), AllocationError> {
    if !lead.is_assignable() {
        return Err(AllocationError::InvalidInput { field: "status" });
    }
    if !client.is_active {
        return Err(AllocationError::Forbidden { reason: ForbiddenReason::InactiveClient });
    }
    if client.role != Role::Client {
        return Err(AllocationError::Forbidden { reason: ForbiddenReason::NotAClient });
    }
    if !quota::has_remaining_quota(client) {
        let limit = match client.monthly_lead_limit {
            Quota::Limited(limit) => limit,
            // unreachable with quota exhausted, but keep the payload honest
            Quota::Unlimited => u32::MAX,
        };
        return Err(AllocationError::QuotaExceeded {
            limit,
            received: client.leads_received_this_month,
        });
    }
    if !quota::is_category_allowed(client, &lead.category_id) {
        return Err(AllocationError::CategoryNotAllowed {
            category_id: lead.category_id.clone(),
        });
    }
    Ok(())
}

/// Upfront capacity gate for a bulk assignment. Computed once against the
/// counter as loaded; per-item checks still run inside the bulk loop.
pub fn precheck_bulk_capacity(client: &Client, requested: u32) -> Result<(), AllocationError> {
    match quota::remaining_capacity(client) {
        Quota::Unlimited => Ok(()),
        Quota::Limited(remaining) if remaining >= requested => Ok(()),
        Quota::Limited(remaining) => {
            Err(AllocationError::InsufficientCapacity { requested, remaining })
        }
    }
}

/// Whether `actor_id` may return or convert the lead: operators always,
/// clients only for leads currently assigned to them.
pub fn may_resolve_lead(lead: &Lead, actor_role: Role, actor_id: &str) -> bool {
    match actor_role {
        Role::Operator => true,
        Role::Client => lead
            .assigned_to
            .as_ref()
            .is_some_and(|client_id| client_id.0 == actor_id),
    }
}

/// Tally of a bulk assignment run. Skipped items carry their own per-lead
/// error detail at the call site; this is just the aggregate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub assigned: u32,
    pub skipped: u32,
}

impl BulkOutcome {
    pub fn record_assigned(&mut self) {
        self.assigned += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn total(&self) -> u32 {
        self.assigned + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::category::CategoryId;
    use crate::domain::client::{Client, ClientId, PackageType, Quota, Role};
    use crate::domain::lead::{Lead, LeadId, LeadStatus, Priority};
    use crate::errors::{AllocationError, ForbiddenReason};

    use super::{check_assignment, may_resolve_lead, precheck_bulk_capacity, BulkOutcome};

    fn client() -> Client {
        Client {
            id: ClientId("C-1".to_string()),
            name: "Mizrahi Plumbing".to_string(),
            email: "office@example.com".to_string(),
            phone: None,
            package: PackageType::Professional,
            role: Role::Client,
            monthly_lead_limit: Quota::Limited(10),
            leads_received_this_month: 3,
            category_access: Quota::Limited(1),
            allowed_categories: vec![CategoryId("plumbing".to_string())],
            is_active: true,
            is_vip: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn lead(status: LeadStatus) -> Lead {
        Lead {
            id: LeadId("L-1".to_string()),
            customer_name: "Dana Levi".to_string(),
            phone: "050-1234567".to_string(),
            email: None,
            category_id: CategoryId("plumbing".to_string()),
            priority: Priority::Normal,
            status,
            assigned_to: None,
            sent_at: None,
            sent_via: None,
            return_reason: None,
            converted_at: None,
            service_area: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn accepts_a_clean_assignment() {
        assert_eq!(check_assignment(&lead(LeadStatus::New), &client()), Ok(()));
        assert_eq!(check_assignment(&lead(LeadStatus::Returned), &client()), Ok(()));
    }

    #[test]
    fn rejects_a_lead_that_is_already_out() {
        let error = check_assignment(&lead(LeadStatus::Sent), &client()).unwrap_err();
        assert_eq!(error, AllocationError::InvalidInput { field: "status" });
    }

    #[test]
    fn rejects_an_inactive_client() {
        let mut c = client();
        c.is_active = false;
        let error = check_assignment(&lead(LeadStatus::New), &c).unwrap_err();
        assert_eq!(error, AllocationError::Forbidden { reason: ForbiddenReason::InactiveClient });
    }

    #[test]
    fn rejects_operator_accounts_as_assignees() {
        let mut c = client();
        c.role = Role::Operator;
        let error = check_assignment(&lead(LeadStatus::New), &c).unwrap_err();
        assert_eq!(error, AllocationError::Forbidden { reason: ForbiddenReason::NotAClient });
    }

    #[test]
    fn rejects_an_exhausted_quota() {
        let mut c = client();
        c.leads_received_this_month = 10;
        let error = check_assignment(&lead(LeadStatus::New), &c).unwrap_err();
        assert_eq!(error, AllocationError::QuotaExceeded { limit: 10, received: 10 });
    }

    #[test]
    fn rejects_a_category_outside_the_allowed_set() {
        let mut l = lead(LeadStatus::New);
        l.category_id = CategoryId("electrical".to_string());
        let error = check_assignment(&l, &client()).unwrap_err();
        assert_eq!(
            error,
            AllocationError::CategoryNotAllowed { category_id: CategoryId("electrical".to_string()) }
        );
    }

    #[test]
    fn lead_state_failure_wins_over_every_client_failure() {
        let mut c = client();
        c.is_active = false;
        c.leads_received_this_month = 10;
        let error = check_assignment(&lead(LeadStatus::Converted), &c).unwrap_err();
        assert_eq!(error, AllocationError::InvalidInput { field: "status" });
    }

    #[test]
    fn inactive_wins_over_quota_and_category() {
        let mut c = client();
        c.is_active = false;
        c.leads_received_this_month = 10;
        let mut l = lead(LeadStatus::New);
        l.category_id = CategoryId("electrical".to_string());
        let error = check_assignment(&l, &c).unwrap_err();
        assert_eq!(error, AllocationError::Forbidden { reason: ForbiddenReason::InactiveClient });
    }

    #[test]
    fn quota_wins_over_category() {
        let mut c = client();
        c.leads_received_this_month = 10;
        let mut l = lead(LeadStatus::New);
        l.category_id = CategoryId("electrical".to_string());
        let error = check_assignment(&l, &c).unwrap_err();
        assert_eq!(error, AllocationError::QuotaExceeded { limit: 10, received: 10 });
    }

    #[test]
    fn bulk_precheck_compares_against_remaining_capacity() {
        // limit 10, received 3 => remaining 7
        assert_eq!(precheck_bulk_capacity(&client(), 7), Ok(()));
        assert_eq!(
            precheck_bulk_capacity(&client(), 8),
            Err(AllocationError::InsufficientCapacity { requested: 8, remaining: 7 })
        );

        let mut c = client();
        c.monthly_lead_limit = Quota::Unlimited;
        assert_eq!(precheck_bulk_capacity(&c, 10_000), Ok(()));
    }

    #[test]
    fn operators_may_resolve_any_lead() {
        let l = lead(LeadStatus::Sent);
        assert!(may_resolve_lead(&l, Role::Operator, "anyone"));
    }

    #[test]
    fn clients_may_resolve_only_their_own_leads() {
        let mut l = lead(LeadStatus::Sent);
        l.assigned_to = Some(ClientId("C-1".to_string()));
        assert!(may_resolve_lead(&l, Role::Client, "C-1"));
        assert!(!may_resolve_lead(&l, Role::Client, "C-2"));

        l.assigned_to = None;
        assert!(!may_resolve_lead(&l, Role::Client, "C-1"));
    }

    #[test]
    fn bulk_outcome_tallies_both_sides() {
        let mut outcome = BulkOutcome::default();
        outcome.record_assigned();
        outcome.record_assigned();
        outcome.record_skipped();
        assert_eq!(outcome, BulkOutcome { assigned: 2, skipped: 1 });
        assert_eq!(outcome.total(), 3);
    }
}
