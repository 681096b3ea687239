use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use leadline_core::{Client, ClientId, DeliveryChannel, Lead, LeadId};

/// Error from one delivery leg. `Clone`/`PartialEq` so tests can assert on
/// exact failures and so the error detail can be copied into the audit row.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("no sink configured for channel `{}`", .0.as_str())]
    NotConfigured(DeliveryChannel),
    #[error("client has no {} recipient address", .0.as_str())]
    MissingRecipient(DeliveryChannel),
    #[error("gateway rejected the message with status {status}")]
    Gateway { status: u16 },
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Message rendered once per assignment and handed to each delivery leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub lead_id: LeadId,
    pub client_id: ClientId,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub subject: String,
    pub body: String,
}

impl OutboundMessage {
    /// Render the assignment message for a lead routed to a client. The body
    /// carries the customer's contact details; category names stay out of it
    /// because the recipient already knows their own grants.
    pub fn for_assignment(lead: &Lead, client: &Client) -> Self {
        let mut body = format!(
            "New lead: {name}\nPhone: {phone}\nPriority: {priority}",
            name = lead.customer_name,
            phone = lead.phone,
            priority = lead.priority.as_str(),
        );
        if let Some(area) = &lead.service_area {
            body.push_str(&format!("\nService area: {area}"));
        }
        if let Some(email) = &lead.email {
            body.push_str(&format!("\nEmail: {email}"));
        }

        Self {
            lead_id: lead.id.clone(),
            client_id: client.id.clone(),
            recipient_email: Some(client.email.clone()),
            recipient_phone: client.phone.clone(),
            subject: format!("New lead assigned: {}", lead.customer_name),
            body,
        }
    }
}

/// One concrete delivery leg (email or sms). Implementations must be cheap
/// to clone behind an `Arc` and safe to call concurrently.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn channel(&self) -> DeliveryChannel;

    async fn deliver(&self, message: &OutboundMessage) -> Result<(), SinkError>;
}

/// Sink used when outbound delivery is disabled. Accepts everything so the
/// allocation flow behaves identically with and without a live gateway.
pub struct NoopSink {
    channel: DeliveryChannel,
}

impl NoopSink {
    pub fn new(channel: DeliveryChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl NotificationSink for NoopSink {
    fn channel(&self) -> DeliveryChannel {
        self.channel
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<(), SinkError> {
        tracing::debug!(
            channel = self.channel.as_str(),
            lead_id = %message.lead_id,
            client_id = %message.client_id,
            "outbound delivery disabled, dropping message"
        );
        Ok(())
    }
}

/// HTTP gateway sink. The email and sms legs share the same shape: POST a
/// small JSON payload to a configured endpoint with an optional bearer key.
pub struct HttpSink {
    channel: DeliveryChannel,
    endpoint: String,
    api_key: Option<SecretString>,
    http: reqwest::Client,
}

impl HttpSink {
    pub fn email(endpoint: String, api_key: Option<SecretString>, http: reqwest::Client) -> Self {
        Self { channel: DeliveryChannel::Email, endpoint, api_key, http }
    }

    pub fn sms(endpoint: String, api_key: Option<SecretString>, http: reqwest::Client) -> Self {
        Self { channel: DeliveryChannel::Sms, endpoint, api_key, http }
    }

    fn payload(&self, message: &OutboundMessage) -> Result<serde_json::Value, SinkError> {
        match self.channel {
            DeliveryChannel::Email => {
                let to = message
                    .recipient_email
                    .as_deref()
                    .filter(|email| !email.is_empty())
                    .ok_or(SinkError::MissingRecipient(DeliveryChannel::Email))?;
                Ok(serde_json::json!({
                    "to": to,
                    "subject": message.subject,
                    "body": message.body,
                }))
            }
            DeliveryChannel::Sms => {
                let to = message
                    .recipient_phone
                    .as_deref()
                    .filter(|phone| !phone.is_empty())
                    .ok_or(SinkError::MissingRecipient(DeliveryChannel::Sms))?;
                Ok(serde_json::json!({
                    "to": to,
                    "message": message.body,
                }))
            }
        }
    }
}

#[async_trait]
impl NotificationSink for HttpSink {
    fn channel(&self) -> DeliveryChannel {
        self.channel
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<(), SinkError> {
        let payload = self.payload(message)?;

        let mut request = self.http.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|err| SinkError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Gateway { status: status.as_u16() });
        }
        Ok(())
    }
}
