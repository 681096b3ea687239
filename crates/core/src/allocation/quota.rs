//! Pure quota and category-access predicates.
//!
//! These three functions carry the allocation invariants; they take already
//! loaded entities, perform no I/O, and are referentially transparent.

use crate::domain::category::CategoryId;
use crate::domain::client::{Client, Quota};

/// True when the client may still receive a lead this month.
pub fn has_remaining_quota(client: &Client) -> bool {
    match client.monthly_lead_limit {
        Quota::Unlimited => true,
        Quota::Limited(limit) => client.leads_received_this_month < limit,
    }
}

/// Remaining slots this month, floored at zero for over-quota counters.
pub fn remaining_capacity(client: &Client) -> Quota {
    match client.monthly_lead_limit {
        Quota::Unlimited => Quota::Unlimited,
        Quota::Limited(limit) => {
            Quota::Limited(limit.saturating_sub(client.leads_received_this_month))
        }
    }
}

/// True when the client's package grants access to the category.
pub fn is_category_allowed(client: &Client, category_id: &CategoryId) -> bool {
    match client.category_access {
        Quota::Unlimited => true,
        Quota::Limited(_) => client.allowed_categories.contains(category_id),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::category::CategoryId;
    use crate::domain::client::{Client, ClientId, PackageType, Quota, Role};

    use super::{has_remaining_quota, is_category_allowed, remaining_capacity};

    fn client(limit: Quota, received: u32) -> Client {
        Client {
            id: ClientId("C-1".to_string()),
            name: "Mizrahi Plumbing".to_string(),
            email: "office@example.com".to_string(),
            phone: None,
            package: PackageType::Professional,
            role: Role::Client,
            monthly_lead_limit: limit,
            leads_received_this_month: received,
            category_access: Quota::Limited(1),
            allowed_categories: vec![CategoryId("plumbing".to_string())],
            is_active: true,
            is_vip: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unlimited_clients_always_have_quota() {
        assert!(has_remaining_quota(&client(Quota::Unlimited, 0)));
        assert!(has_remaining_quota(&client(Quota::Unlimited, 10_000)));
    }

    #[test]
    fn finite_quota_binds_at_the_limit() {
        assert!(has_remaining_quota(&client(Quota::Limited(2), 0)));
        assert!(has_remaining_quota(&client(Quota::Limited(2), 1)));
        assert!(!has_remaining_quota(&client(Quota::Limited(2), 2)));
        assert!(!has_remaining_quota(&client(Quota::Limited(2), 3)));
    }

    #[test]
    fn zero_limit_means_no_quota_ever() {
        assert!(!has_remaining_quota(&client(Quota::Limited(0), 0)));
        assert_eq!(remaining_capacity(&client(Quota::Limited(0), 0)), Quota::Limited(0));
    }

    #[test]
    fn remaining_capacity_floors_at_zero() {
        assert_eq!(remaining_capacity(&client(Quota::Limited(5), 2)), Quota::Limited(3));
        assert_eq!(remaining_capacity(&client(Quota::Limited(5), 5)), Quota::Limited(0));
        assert_eq!(remaining_capacity(&client(Quota::Limited(5), 9)), Quota::Limited(0));
        assert_eq!(remaining_capacity(&client(Quota::Unlimited, 9)), Quota::Unlimited);
    }

    #[test]
    fn category_gate_respects_the_allowed_set() {
        let c = client(Quota::Limited(5), 0);
        assert!(is_category_allowed(&c, &CategoryId("plumbing".to_string())));
        assert!(!is_category_allowed(&c, &CategoryId("electrical".to_string())));
    }

    #[test]
    fn unlimited_category_access_ignores_the_allowed_set() {
        let mut c = client(Quota::Limited(5), 0);
        c.category_access = Quota::Unlimited;
        c.allowed_categories.clear();
        assert!(is_category_allowed(&c, &CategoryId("electrical".to_string())));
    }

    #[test]
    fn predicates_are_pure_across_repeated_calls() {
        let c = client(Quota::Limited(3), 1);
        let category = CategoryId("plumbing".to_string());
        for _ in 0..100 {
            assert!(has_remaining_quota(&c));
            assert_eq!(remaining_capacity(&c), Quota::Limited(2));
            assert!(is_category_allowed(&c, &category));
        }
    }
}
