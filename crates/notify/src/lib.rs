//! Outbound delivery for lead assignments: email and sms legs behind a sink
//! trait, with every attempt recorded in the delivery log. Delivery failures
//! are audit data, never allocation errors.

pub mod dispatcher;
pub mod sink;

pub use dispatcher::Dispatcher;
pub use sink::{HttpSink, NoopSink, NotificationSink, OutboundMessage, SinkError};
