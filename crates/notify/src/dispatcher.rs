use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use leadline_core::config::NotifierConfig;
use leadline_core::{Channel, DeliveryChannel, DeliveryRecord, DeliveryStatus};
use leadline_db::repositories::DeliveryLogRepository;

use crate::sink::{HttpSink, NoopSink, NotificationSink, OutboundMessage, SinkError};

/// Fans one outbound message out over the requested channel's legs, records
/// every attempt in the delivery log, and never surfaces a failure to the
/// caller. A lead stays `sent` even when both legs fail.
#[derive(Clone)]
pub struct Dispatcher {
    sinks: Arc<HashMap<DeliveryChannel, Arc<dyn NotificationSink>>>,
    delivery_log: Arc<dyn DeliveryLogRepository>,
}

impl Dispatcher {
    pub fn new(
        sinks: Vec<Arc<dyn NotificationSink>>,
        delivery_log: Arc<dyn DeliveryLogRepository>,
    ) -> Self {
        let sinks = sinks.into_iter().map(|sink| (sink.channel(), sink)).collect();
        Self { sinks: Arc::new(sinks), delivery_log }
    }

    /// Build a dispatcher from config. Disabled delivery gets a no-op sink
    /// per leg; enabled delivery gets an HTTP sink per configured endpoint,
    /// and legs without an endpoint stay unconfigured and fail loudly in
    /// the audit log.
    pub fn from_config(
        config: &NotifierConfig,
        delivery_log: Arc<dyn DeliveryLogRepository>,
    ) -> Self {
        if !config.enabled {
            return Self::new(
                vec![
                    Arc::new(NoopSink::new(DeliveryChannel::Email)),
                    Arc::new(NoopSink::new(DeliveryChannel::Sms)),
                ],
                delivery_log,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();
        if let Some(endpoint) = &config.email_endpoint {
            sinks.push(Arc::new(HttpSink::email(
                endpoint.clone(),
                config.email_api_key.clone(),
                http.clone(),
            )));
        }
        if let Some(endpoint) = &config.sms_endpoint {
            sinks.push(Arc::new(HttpSink::sms(
                endpoint.clone(),
                config.sms_api_key.clone(),
                http,
            )));
        }
        Self::new(sinks, delivery_log)
    }

    /// Deliver over every leg of `channel` and append one audit row per leg.
    /// Returns the rows so callers can log a summary.
    pub async fn dispatch(&self, message: &OutboundMessage, channel: Channel) -> Vec<DeliveryRecord> {
        let mut records = Vec::with_capacity(channel.legs().len());

        for leg in channel.legs() {
            let outcome = match self.sinks.get(leg) {
                Some(sink) => sink.deliver(message).await,
                None => Err(SinkError::NotConfigured(*leg)),
            };

            let record = match outcome {
                Ok(()) => {
                    tracing::info!(
                        channel = leg.as_str(),
                        lead_id = %message.lead_id,
                        client_id = %message.client_id,
                        "delivery leg succeeded"
                    );
                    DeliveryRecord::new(
                        message.lead_id.clone(),
                        message.client_id.clone(),
                        *leg,
                        DeliveryStatus::Delivered,
                        None,
                    )
                }
                Err(error) => {
                    tracing::warn!(
                        channel = leg.as_str(),
                        lead_id = %message.lead_id,
                        client_id = %message.client_id,
                        error = %error,
                        "delivery leg failed"
                    );
                    DeliveryRecord::new(
                        message.lead_id.clone(),
                        message.client_id.clone(),
                        *leg,
                        DeliveryStatus::Failed,
                        Some(error.to_string()),
                    )
                }
            };

            if let Err(error) = self.delivery_log.append(record.clone()).await {
                tracing::warn!(
                    channel = leg.as_str(),
                    lead_id = %message.lead_id,
                    error = %error,
                    "could not persist delivery record"
                );
            }
            records.push(record);
        }

        records
    }

    /// Fire-and-forget variant used by the request path: the allocation
    /// response never waits on gateways.
    pub fn dispatch_detached(&self, message: OutboundMessage, channel: Channel) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(&message, channel).await;
        });
    }
}
