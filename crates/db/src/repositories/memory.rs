use std::collections::HashMap;

use tokio::sync::RwLock;

use leadline_core::chrono::Utc;
use leadline_core::domain::category::{Category, CategoryId};
use leadline_core::domain::client::{Client, ClientId, Quota};
use leadline_core::domain::history::LeadHistoryEntry;
use leadline_core::domain::lead::{Lead, LeadId};
use leadline_core::domain::notification::{DeliveryRecord, Notification, NotificationId};

use super::{
    CategoryRepository, ClientRepository, DeliveryLogRepository, HistoryRepository, LeadFilter,
    LeadRepository, NotificationRepository, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryClientRepository {
    clients: RwLock<HashMap<String, Client>>,
}

#[async_trait::async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        let clients = self.clients.read().await;
        Ok(clients.get(&id.0).cloned())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Client>, RepositoryError> {
        let clients = self.clients.read().await;
        let mut listed: Vec<Client> = clients
            .values()
            .filter(|client| !active_only || client.is_active)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    async fn save(&self, client: Client) -> Result<(), RepositoryError> {
        let mut clients = self.clients.write().await;
        clients.insert(client.id.0.clone(), client);
        Ok(())
    }

    async fn try_consume_quota(&self, id: &ClientId) -> Result<bool, RepositoryError> {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.get_mut(&id.0) else {
            return Ok(false);
        };

        let has_room = match client.monthly_lead_limit {
            Quota::Unlimited => true,
            Quota::Limited(limit) => client.leads_received_this_month < limit,
        };
        if has_room {
            client.leads_received_this_month += 1;
            client.updated_at = Utc::now();
        }
        Ok(has_room)
    }

    async fn adjust_received(&self, id: &ClientId, delta: i64) -> Result<(), RepositoryError> {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get_mut(&id.0) {
            let adjusted = i64::from(client.leads_received_this_month) + delta;
            client.leads_received_this_month = adjusted.max(0) as u32;
            client.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: RwLock<HashMap<String, Category>>,
}

#[async_trait::async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories.get(&id.0).cloned())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        let mut listed: Vec<Category> = categories
            .values()
            .filter(|category| !active_only || category.is_active)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.name_en.cmp(&b.name_en));
        Ok(listed)
    }

    async fn save(&self, category: Category) -> Result<(), RepositoryError> {
        let mut categories = self.categories.write().await;
        categories.insert(category.id.0.clone(), category);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<HashMap<String, Lead>>,
}

#[async_trait::async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        Ok(leads.get(&id.0).cloned())
    }

    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        let mut listed: Vec<Lead> = leads
            .values()
            .filter(|lead| filter.status.map_or(true, |status| lead.status == status))
            .filter(|lead| {
                filter.category_id.as_ref().map_or(true, |category| &lead.category_id == category)
            })
            .filter(|lead| {
                filter
                    .assigned_to
                    .as_ref()
                    .map_or(true, |client| lead.assigned_to.as_ref() == Some(client))
            })
            .filter(|lead| filter.priority.map_or(true, |priority| lead.priority == priority))
            .filter(|lead| {
                filter.search.as_ref().map_or(true, |needle| {
                    let needle = needle.to_lowercase();
                    lead.customer_name.to_lowercase().contains(&needle)
                        || lead.phone.contains(&needle)
                })
            })
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(listed)
    }

    async fn save(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut leads = self.leads.write().await;
        leads.insert(lead.id.0.clone(), lead);
        Ok(())
    }

    async fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError> {
        let mut leads = self.leads.write().await;
        Ok(leads.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryHistoryRepository {
    entries: RwLock<Vec<LeadHistoryEntry>>,
}

#[async_trait::async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn append(&self, entry: LeadHistoryEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn list_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<LeadHistoryEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut listed: Vec<LeadHistoryEntry> =
            entries.iter().filter(|entry| &entry.lead_id == lead_id).cloned().collect();
        listed.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.0.cmp(&a.id.0)));
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<HashMap<String, Notification>>,
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, notification: Notification) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.write().await;
        notifications.insert(notification.id.0.clone(), notification);
        Ok(())
    }

    async fn list_for_client(
        &self,
        client_id: &ClientId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.read().await;
        let mut listed: Vec<Notification> = notifications
            .values()
            .filter(|notification| &notification.client_id == client_id)
            .filter(|notification| !unread_only || !notification.is_read)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(listed)
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        match notifications.get_mut(&id.0) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, client_id: &ClientId) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        let mut affected = 0;
        for notification in notifications.values_mut() {
            if &notification.client_id == client_id && !notification.is_read {
                notification.is_read = true;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn find_by_id(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let notifications = self.notifications.read().await;
        Ok(notifications.get(&id.0).cloned())
    }

    async fn delete(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        Ok(notifications.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryDeliveryLogRepository {
    records: RwLock<Vec<DeliveryRecord>>,
}

#[async_trait::async_trait]
impl DeliveryLogRepository for InMemoryDeliveryLogRepository {
    async fn append(&self, record: DeliveryRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn list_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<DeliveryRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut listed: Vec<DeliveryRecord> =
            records.iter().filter(|record| &record.lead_id == lead_id).cloned().collect();
        listed.sort_by(|a, b| a.attempted_at.cmp(&b.attempted_at).then(a.id.0.cmp(&b.id.0)));
        Ok(listed)
    }
}
