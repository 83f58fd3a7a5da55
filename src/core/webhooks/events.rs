//! Event catalog and event envelope
//!
//! Event types are namespaced `domain.action` identifiers. The catalog below is
//! what the helpdesk emits; externally supplied types only have to be well formed.

use crate::utils::error::{Result, WebhookError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Event types emitted by the helpdesk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "ticket.created")]
    TicketCreated,
    #[serde(rename = "ticket.updated")]
    TicketUpdated,
    #[serde(rename = "ticket.closed")]
    TicketClosed,
    #[serde(rename = "ticket.reopened")]
    TicketReopened,
    #[serde(rename = "ticket.assigned")]
    TicketAssigned,
    #[serde(rename = "ticket.escalated")]
    TicketEscalated,
    #[serde(rename = "ticket.priority_changed")]
    TicketPriorityChanged,
    #[serde(rename = "ticket.state_changed")]
    TicketStateChanged,
    #[serde(rename = "ticket.queue_moved")]
    TicketQueueMoved,
    #[serde(rename = "article.created")]
    ArticleCreated,
    #[serde(rename = "article.updated")]
    ArticleUpdated,
    #[serde(rename = "customer.created")]
    CustomerCreated,
    #[serde(rename = "customer.updated")]
    CustomerUpdated,
    #[serde(rename = "sla.warning")]
    SlaWarning,
    #[serde(rename = "sla.breached")]
    SlaBreached,
    #[serde(rename = "queue.created")]
    QueueCreated,
    #[serde(rename = "queue.updated")]
    QueueUpdated,
}

const ALL_EVENT_TYPES: [EventType; 17] = [
    EventType::TicketCreated,
    EventType::TicketUpdated,
    EventType::TicketClosed,
    EventType::TicketReopened,
    EventType::TicketAssigned,
    EventType::TicketEscalated,
    EventType::TicketPriorityChanged,
    EventType::TicketStateChanged,
    EventType::TicketQueueMoved,
    EventType::ArticleCreated,
    EventType::ArticleUpdated,
    EventType::CustomerCreated,
    EventType::CustomerUpdated,
    EventType::SlaWarning,
    EventType::SlaBreached,
    EventType::QueueCreated,
    EventType::QueueUpdated,
];

impl EventType {
    /// Every event type in the catalog
    pub fn all() -> &'static [EventType] {
        &ALL_EVENT_TYPES
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TicketCreated => "ticket.created",
            EventType::TicketUpdated => "ticket.updated",
            EventType::TicketClosed => "ticket.closed",
            EventType::TicketReopened => "ticket.reopened",
            EventType::TicketAssigned => "ticket.assigned",
            EventType::TicketEscalated => "ticket.escalated",
            EventType::TicketPriorityChanged => "ticket.priority_changed",
            EventType::TicketStateChanged => "ticket.state_changed",
            EventType::TicketQueueMoved => "ticket.queue_moved",
            EventType::ArticleCreated => "article.created",
            EventType::ArticleUpdated => "article.updated",
            EventType::CustomerCreated => "customer.created",
            EventType::CustomerUpdated => "customer.updated",
            EventType::SlaWarning => "sla.warning",
            EventType::SlaBreached => "sla.breached",
            EventType::QueueCreated => "queue.created",
            EventType::QueueUpdated => "queue.updated",
        }
    }

    /// The part before the dot, e.g. `ticket`
    pub fn domain(&self) -> &'static str {
        self.as_str().split('.').next().unwrap_or_default()
    }

    pub fn description(&self) -> &'static str {
        match self {
            EventType::TicketCreated => "A new ticket was created",
            EventType::TicketUpdated => "Ticket fields were changed",
            EventType::TicketClosed => "A ticket was closed",
            EventType::TicketReopened => "A closed ticket was reopened",
            EventType::TicketAssigned => "A ticket was assigned to an agent",
            EventType::TicketEscalated => "A ticket was escalated",
            EventType::TicketPriorityChanged => "Ticket priority changed",
            EventType::TicketStateChanged => "Ticket state changed",
            EventType::TicketQueueMoved => "A ticket was moved to another queue",
            EventType::ArticleCreated => "An article was added to a ticket",
            EventType::ArticleUpdated => "An article was edited",
            EventType::CustomerCreated => "A customer user was created",
            EventType::CustomerUpdated => "A customer user was updated",
            EventType::SlaWarning => "A ticket is close to breaching its SLA",
            EventType::SlaBreached => "A ticket breached its SLA",
            EventType::QueueCreated => "A queue was created",
            EventType::QueueUpdated => "A queue was updated",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self> {
        ALL_EVENT_TYPES
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| WebhookError::validation(format!("Unknown event type: {}", s)))
    }
}

/// Check that an externally supplied event type has the `domain.action` shape
pub fn validate_event_type(event_type: &str) -> Result<()> {
    let mut segments = event_type.split('.');
    let well_formed = matches!(
        (segments.next(), segments.next(), segments.next()),
        (Some(domain), Some(action), None) if !domain.is_empty() && !action.is_empty()
    );

    if well_formed {
        Ok(())
    } else {
        Err(WebhookError::validation(format!(
            "Invalid event type '{}': expected <domain>.<action>",
            event_type
        )))
    }
}

/// A domain event as handed to the dispatcher. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: Map<String, Value>,
    pub user_id: Option<i32>,
    pub source: String,
}

impl Event {
    /// Build an event for a catalog type
    pub fn new(event_type: EventType, data: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.as_str().to_string(),
            timestamp: Utc::now(),
            data,
            user_id: None,
            source: "helpdesk".to_string(),
        }
    }

    /// Build an event from an externally supplied type string
    pub fn custom(event_type: &str, data: Map<String, Value>) -> Result<Self> {
        validate_event_type(event_type)?;
        Ok(Self {
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            data,
            user_id: None,
            source: "helpdesk".to_string(),
        })
    }

    pub fn with_user(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = source.into();
        self
    }
}

/// Turn an arbitrary JSON value into an event data map; non-objects are wrapped under `value`
pub fn data_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
