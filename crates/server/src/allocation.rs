//! Allocation engine: routes leads to clients under quota and category
//! gates, keeps the append-only history, and fans out notifications.
//!
//! All quota-mutating paths for one client serialize on a per-client lock,
//! so the monthly counter can never double-spend its last slot.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use leadline_core::chrono::Utc;
use leadline_core::export::{render_csv, ExportError};
use leadline_core::{
    check_assignment, may_resolve_lead, precheck_bulk_capacity, AllocationError, BulkOutcome,
    Category, CategoryId, Channel, Client, ClientId, EntityKind, ForbiddenReason, HistoryAction,
    Lead, LeadHistoryEntry, LeadId, LeadStatus, Notification, NotificationId, NotificationKind,
    Priority, Quota, Role, ServiceError,
};
use leadline_db::repositories::{
    CategoryRepository, ClientRepository, HistoryRepository, LeadFilter, LeadRepository,
    NotificationRepository, RepositoryError,
};
use leadline_notify::{Dispatcher, OutboundMessage};

/// The authenticated caller of an operation.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn operator(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: Role::Operator }
    }

    pub fn client(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: Role::Client }
    }
}

/// Payload for creating a lead. Unknown fields are rejected at the edge.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewLead {
    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub category_id: String,
    pub priority: Option<Priority>,
    pub service_area: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SkippedLead {
    pub lead_id: LeadId,
    pub reason: String,
}

/// Per-lead breakdown of a bulk assignment. Partial success is the normal
/// case, not an error.
#[derive(Clone, Debug, Serialize)]
pub struct BulkAssignReport {
    pub outcome: BulkOutcome,
    pub assigned: Vec<LeadId>,
    pub skipped: Vec<SkippedLead>,
}

pub struct AllocationService {
    clients: Arc<dyn ClientRepository>,
    categories: Arc<dyn CategoryRepository>,
    leads: Arc<dyn LeadRepository>,
    history: Arc<dyn HistoryRepository>,
    notifications: Arc<dyn NotificationRepository>,
    dispatcher: Dispatcher,
    client_locks: Mutex<HashMap<ClientId, Arc<Mutex<()>>>>,
}

fn store(error: RepositoryError) -> ServiceError {
    ServiceError::Persistence(error.to_string())
}

fn export_failure(error: ExportError) -> ServiceError {
    ServiceError::Persistence(format!("csv export failed: {error}"))
}

impl AllocationService {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        categories: Arc<dyn CategoryRepository>,
        leads: Arc<dyn LeadRepository>,
        history: Arc<dyn HistoryRepository>,
        notifications: Arc<dyn NotificationRepository>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            clients,
            categories,
            leads,
            history,
            notifications,
            dispatcher,
            client_locks: Mutex::new(HashMap::new()),
        }
    }

    // Entries live for the process lifetime; the map is bounded by the size
    // of the client book, a few bytes per account.
    async fn client_lock(&self, id: &ClientId) -> Arc<Mutex<()>> {
        let mut locks = self.client_locks.lock().await;
        locks.entry(id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn require_operator(actor: &Actor) -> Result<(), ServiceError> {
        if actor.role != Role::Operator {
            return Err(AllocationError::Forbidden { reason: ForbiddenReason::WrongOwner }.into());
        }
        Ok(())
    }

    async fn load_lead(&self, id: &LeadId) -> Result<Lead, ServiceError> {
        self.leads
            .find_by_id(id)
            .await
            .map_err(store)?
            .ok_or_else(|| AllocationError::NotFound { entity: EntityKind::Lead }.into())
    }

    async fn load_client(&self, id: &ClientId) -> Result<Client, ServiceError> {
        self.clients
            .find_by_id(id)
            .await
            .map_err(store)?
            .ok_or_else(|| AllocationError::NotFound { entity: EntityKind::Client }.into())
    }

    /// Create a lead in the `new` state. Operator only.
    pub async fn create_lead(&self, request: NewLead, actor: &Actor) -> Result<Lead, ServiceError> {
        Self::require_operator(actor)?;

        if request.customer_name.trim().is_empty() {
            return Err(AllocationError::InvalidInput { field: "customer_name" }.into());
        }
        if request.phone.trim().is_empty() {
            return Err(AllocationError::InvalidInput { field: "phone" }.into());
        }

        let category_id = CategoryId(request.category_id.clone());
        let category = self
            .categories
            .find_by_id(&category_id)
            .await
            .map_err(store)?
            .ok_or(AllocationError::NotFound { entity: EntityKind::Category })?;
        if !category.is_active {
            return Err(
                AllocationError::Forbidden { reason: ForbiddenReason::InactiveCategory }.into()
            );
        }

        let now = Utc::now();
        let lead = Lead {
            id: LeadId(uuid::Uuid::new_v4().to_string()),
            customer_name: request.customer_name.trim().to_string(),
            phone: request.phone.trim().to_string(),
            email: request.email,
            category_id,
            priority: request.priority.unwrap_or(Priority::Normal),
            status: LeadStatus::New,
            assigned_to: None,
            sent_at: None,
            sent_via: None,
            return_reason: None,
            converted_at: None,
            service_area: request.service_area,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        self.leads.save(lead.clone()).await.map_err(store)?;
        self.history
            .append(LeadHistoryEntry::new(
                lead.id.clone(),
                HistoryAction::Created,
                None,
                Some(LeadStatus::New),
                &actor.id,
            ))
            .await
            .map_err(store)?;

        tracing::info!(lead_id = %lead.id, category_id = %lead.category_id.0, "lead created");
        Ok(lead)
    }

    /// Assign one lead to one client over the requested channel. Checks run
    /// in a fixed order and the quota slot is claimed atomically.
    pub async fn assign_lead(
        &self,
        lead_id: &LeadId,
        client_id: &ClientId,
        channel: Channel,
        actor: &Actor,
    ) -> Result<Lead, ServiceError> {
        Self::require_operator(actor)?;

        let mut lead = self.load_lead(lead_id).await?;
        // existence check before taking the lock; state is re-read under it
        self.load_client(client_id).await?;

        let lock = self.client_lock(client_id).await;
        let _guard = lock.lock().await;

        let client = self.load_client(client_id).await?;
        check_assignment(&lead, &client)?;

        if !self.clients.try_consume_quota(client_id).await.map_err(store)? {
            let limit = match client.monthly_lead_limit {
                Quota::Limited(limit) => limit,
                Quota::Unlimited => u32::MAX,
            };
            return Err(AllocationError::QuotaExceeded {
                limit,
                received: client.leads_received_this_month,
            }
            .into());
        }

        let old_status = lead.status;
        lead.transition_to(LeadStatus::Sent)?;
        lead.assigned_to = Some(client_id.clone());
        lead.sent_at = Some(Utc::now());
        lead.sent_via = Some(channel);
        lead.return_reason = None;
        lead.updated_at = Utc::now();
        self.leads.save(lead.clone()).await.map_err(store)?;

        self.history
            .append(
                LeadHistoryEntry::new(
                    lead.id.clone(),
                    HistoryAction::Assigned,
                    Some(old_status),
                    Some(LeadStatus::Sent),
                    &actor.id,
                )
                .with_note(format!("assigned via {}", channel.as_str())),
            )
            .await
            .map_err(store)?;

        self.notifications
            .save(Notification::unread(
                client_id.clone(),
                NotificationKind::LeadAssigned,
                "New lead assigned",
                format!("New lead: {}", lead.customer_name),
            ))
            .await
            .map_err(store)?;

        // Fire-and-forget: gateway latency never delays the assignment result.
        self.dispatcher.dispatch_detached(OutboundMessage::for_assignment(&lead, &client), channel);

        tracing::info!(
            lead_id = %lead.id,
            client_id = %client_id,
            channel = channel.as_str(),
            "lead assigned"
        );
        Ok(lead)
    }

    /// Assign a batch of leads to one client. One upfront capacity gate, then
    /// per-lead checks; invalid items are skipped and reported, valid items
    /// still go through. A single aggregate notification is created.
    pub async fn bulk_assign(
        &self,
        lead_ids: &[LeadId],
        client_id: &ClientId,
        channel: Channel,
        actor: &Actor,
    ) -> Result<BulkAssignReport, ServiceError> {
        Self::require_operator(actor)?;
        if lead_ids.is_empty() {
            return Err(AllocationError::InvalidInput { field: "lead_ids" }.into());
        }

        self.load_client(client_id).await?;

        let lock = self.client_lock(client_id).await;
        let _guard = lock.lock().await;

        let mut client = self.load_client(client_id).await?;
        precheck_bulk_capacity(&client, lead_ids.len() as u32)?;

        let mut outcome = BulkOutcome::default();
        let mut assigned = Vec::new();
        let mut skipped = Vec::new();

        for lead_id in lead_ids {
            let mut lead = match self.leads.find_by_id(lead_id).await.map_err(store)? {
                Some(lead) => lead,
                None => {
                    outcome.record_skipped();
                    skipped.push(SkippedLead {
                        lead_id: lead_id.clone(),
                        reason: AllocationError::NotFound { entity: EntityKind::Lead }.to_string(),
                    });
                    continue;
                }
            };

            // Bulk only picks up fresh leads; re-assigning a returned lead
            // goes through the single-assign path.
            if lead.status != LeadStatus::New {
                outcome.record_skipped();
                skipped.push(SkippedLead {
                    lead_id: lead_id.clone(),
                    reason: format!("lead is {}, not new", lead.status.as_str()),
                });
                continue;
            }

            if let Err(error) = check_assignment(&lead, &client) {
                outcome.record_skipped();
                skipped.push(SkippedLead { lead_id: lead_id.clone(), reason: error.to_string() });
                continue;
            }

            if !self.clients.try_consume_quota(client_id).await.map_err(store)? {
                outcome.record_skipped();
                skipped.push(SkippedLead {
                    lead_id: lead_id.clone(),
                    reason: "monthly quota exhausted during bulk run".to_string(),
                });
                continue;
            }
            // keep the local snapshot honest for the next iteration's checks
            client.leads_received_this_month += 1;

            let old_status = lead.status;
            lead.status = LeadStatus::Sent;
            lead.assigned_to = Some(client_id.clone());
            lead.sent_at = Some(Utc::now());
            lead.sent_via = Some(channel);
            lead.return_reason = None;
            lead.updated_at = Utc::now();
            self.leads.save(lead.clone()).await.map_err(store)?;

            self.history
                .append(
                    LeadHistoryEntry::new(
                        lead.id.clone(),
                        HistoryAction::Assigned,
                        Some(old_status),
                        Some(LeadStatus::Sent),
                        &actor.id,
                    )
                    .with_note(format!("bulk assigned via {}", channel.as_str())),
                )
                .await
                .map_err(store)?;

            self.dispatcher
                .dispatch_detached(OutboundMessage::for_assignment(&lead, &client), channel);

            outcome.record_assigned();
            assigned.push(lead.id.clone());
        }

        if outcome.assigned > 0 {
            self.notifications
                .save(Notification::unread(
                    client_id.clone(),
                    NotificationKind::LeadAssigned,
                    "New leads assigned",
                    format!("You received {} new leads", outcome.assigned),
                ))
                .await
                .map_err(store)?;
        }

        tracing::info!(
            client_id = %client_id,
            assigned = outcome.assigned,
            skipped = outcome.skipped,
            "bulk assignment finished"
        );
        Ok(BulkAssignReport { outcome, assigned, skipped })
    }

    /// Return a sent lead. The assigned client or any operator may do this;
    /// the quota slot is refunded and the lead becomes assignable again.
    pub async fn return_lead(
        &self,
        lead_id: &LeadId,
        reason: Option<String>,
        actor: &Actor,
    ) -> Result<Lead, ServiceError> {
        let mut lead = self.load_lead(lead_id).await?;

        if !may_resolve_lead(&lead, actor.role, &actor.id) {
            return Err(AllocationError::Forbidden { reason: ForbiddenReason::WrongOwner }.into());
        }

        let client_id = lead
            .assigned_to
            .clone()
            .ok_or(AllocationError::InvalidInput { field: "status" })?;

        let lock = self.client_lock(&client_id).await;
        let _guard = lock.lock().await;

        let old_status = lead.status;
        lead.transition_to(LeadStatus::Returned)?;
        lead.assigned_to = None;
        lead.return_reason = reason.clone();
        lead.updated_at = Utc::now();
        self.leads.save(lead.clone()).await.map_err(store)?;

        self.clients.adjust_received(&client_id, -1).await.map_err(store)?;

        let mut entry = LeadHistoryEntry::new(
            lead.id.clone(),
            HistoryAction::Returned,
            Some(old_status),
            Some(LeadStatus::Returned),
            &actor.id,
        );
        if let Some(note) = &reason {
            entry = entry.with_note(note.clone());
        }
        self.history.append(entry).await.map_err(store)?;

        // Returns surface in the operator inbox, not the returning client's.
        let operators = self.clients.list(true).await.map_err(store)?;
        for operator in operators.iter().filter(|account| account.role == Role::Operator) {
            self.notifications
                .save(Notification::unread(
                    operator.id.clone(),
                    NotificationKind::LeadReturned,
                    "Lead returned",
                    format!("Lead {} was returned to the pool", lead.customer_name),
                ))
                .await
                .map_err(store)?;
        }

        tracing::info!(lead_id = %lead.id, client_id = %client_id, "lead returned");
        Ok(lead)
    }

    /// Mark a sent lead converted. Terminal; the quota slot stays consumed.
    pub async fn convert_lead(&self, lead_id: &LeadId, actor: &Actor) -> Result<Lead, ServiceError> {
        let mut lead = self.load_lead(lead_id).await?;

        if !may_resolve_lead(&lead, actor.role, &actor.id) {
            return Err(AllocationError::Forbidden { reason: ForbiddenReason::WrongOwner }.into());
        }

        let old_status = lead.status;
        lead.transition_to(LeadStatus::Converted)?;
        lead.converted_at = Some(Utc::now());
        lead.updated_at = Utc::now();
        self.leads.save(lead.clone()).await.map_err(store)?;

        self.history
            .append(LeadHistoryEntry::new(
                lead.id.clone(),
                HistoryAction::Converted,
                Some(old_status),
                Some(LeadStatus::Converted),
                &actor.id,
            ))
            .await
            .map_err(store)?;

        tracing::info!(lead_id = %lead.id, "lead converted");
        Ok(lead)
    }

    /// Delete a lead that has not reached an outcome yet. Operator only;
    /// history rows cascade with the lead.
    pub async fn delete_lead(&self, lead_id: &LeadId, actor: &Actor) -> Result<(), ServiceError> {
        Self::require_operator(actor)?;

        let lead = self.load_lead(lead_id).await?;
        if !lead.is_deletable() {
            return Err(AllocationError::InvalidInput { field: "status" }.into());
        }

        self.leads.delete(lead_id).await.map_err(store)?;
        tracing::info!(lead_id = %lead_id, "lead deleted");
        Ok(())
    }

    pub async fn get_lead(&self, lead_id: &LeadId) -> Result<Lead, ServiceError> {
        self.load_lead(lead_id).await
    }

    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, ServiceError> {
        self.leads.list(filter).await.map_err(store)
    }

    /// Full audit trail for one lead, newest first.
    pub async fn lead_history(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<LeadHistoryEntry>, ServiceError> {
        self.load_lead(lead_id).await?;
        self.history.list_for_lead(lead_id).await.map_err(store)
    }

    /// Render the filtered lead list as BOM-prefixed UTF-8 CSV.
    pub async fn export_leads(&self, filter: &LeadFilter) -> Result<Vec<u8>, ServiceError> {
        let leads = self.leads.list(filter).await.map_err(store)?;
        render_csv(&leads).map_err(export_failure)
    }

    pub async fn get_client(&self, client_id: &ClientId) -> Result<Client, ServiceError> {
        self.load_client(client_id).await
    }

    pub async fn list_clients(&self, active_only: bool) -> Result<Vec<Client>, ServiceError> {
        self.clients.list(active_only).await.map_err(store)
    }

    pub async fn upsert_client(&self, client: Client, actor: &Actor) -> Result<(), ServiceError> {
        Self::require_operator(actor)?;
        if client.name.trim().is_empty() {
            return Err(AllocationError::InvalidInput { field: "name" }.into());
        }
        if client.email.trim().is_empty() {
            return Err(AllocationError::InvalidInput { field: "email" }.into());
        }
        self.clients.save(client).await.map_err(store)
    }

    pub async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>, ServiceError> {
        self.categories.list(active_only).await.map_err(store)
    }

    pub async fn upsert_category(
        &self,
        category: Category,
        actor: &Actor,
    ) -> Result<(), ServiceError> {
        Self::require_operator(actor)?;
        if category.name_he.trim().is_empty() && category.name_en.trim().is_empty() {
            return Err(AllocationError::InvalidInput { field: "name" }.into());
        }
        self.categories.save(category).await.map_err(store)
    }

    pub async fn notifications_for_client(
        &self,
        client_id: &ClientId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, ServiceError> {
        self.load_client(client_id).await?;
        self.notifications.list_for_client(client_id, unread_only).await.map_err(store)
    }

    pub async fn mark_notification_read(&self, id: &NotificationId) -> Result<(), ServiceError> {
        if !self.notifications.mark_read(id).await.map_err(store)? {
            return Err(AllocationError::NotFound { entity: EntityKind::Notification }.into());
        }
        Ok(())
    }

    pub async fn mark_all_notifications_read(
        &self,
        client_id: &ClientId,
    ) -> Result<u64, ServiceError> {
        self.load_client(client_id).await?;
        self.notifications.mark_all_read(client_id).await.map_err(store)
    }

    /// Remove one notification. The recipient may clear their own inbox;
    /// operators may clear anyone's.
    pub async fn delete_notification(
        &self,
        id: &NotificationId,
        actor: &Actor,
    ) -> Result<(), ServiceError> {
        let notification = self
            .notifications
            .find_by_id(id)
            .await
            .map_err(store)?
            .ok_or(AllocationError::NotFound { entity: EntityKind::Notification })?;

        if actor.role != Role::Operator && notification.client_id.0 != actor.id {
            return Err(AllocationError::Forbidden { reason: ForbiddenReason::WrongOwner }.into());
        }

        self.notifications.delete(id).await.map_err(store)?;
        Ok(())
    }

    /// Operator announcement delivered to every active client inbox.
    pub async fn broadcast_notification(
        &self,
        title: &str,
        message: &str,
        actor: &Actor,
    ) -> Result<u64, ServiceError> {
        Self::require_operator(actor)?;
        if title.trim().is_empty() {
            return Err(AllocationError::InvalidInput { field: "title" }.into());
        }
        if message.trim().is_empty() {
            return Err(AllocationError::InvalidInput { field: "message" }.into());
        }

        let clients = self.clients.list(true).await.map_err(store)?;
        let mut delivered = 0u64;
        for client in clients.iter().filter(|account| account.role == Role::Client) {
            self.notifications
                .save(Notification::unread(
                    client.id.clone(),
                    NotificationKind::Broadcast,
                    title,
                    message,
                ))
                .await
                .map_err(store)?;
            delivered += 1;
        }

        tracing::info!(recipients = delivered, "broadcast notification sent");
        Ok(delivered)
    }
}
