//! Conditional trigger filters
//!
//! A webhook may narrow its subscription to tickets in certain queues, with
//! certain priorities or states, or assigned to certain agents. Filters are
//! matched against the event's `data` map; an empty filter set matches
//! every event.

use crate::utils::error::{Result, WebhookError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookFilters {
    /// Ticket `queue_id` must be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queue_ids: Vec<i64>,
    /// Ticket `priority` must be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub priorities: Vec<String>,
    /// Ticket `status` must be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<String>,
    /// Ticket `assigned_to`, or the customer `id` for customer events
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<i64>,
}

impl WebhookFilters {
    pub fn is_empty(&self) -> bool {
        self.queue_ids.is_empty()
            && self.priorities.is_empty()
            && self.statuses.is_empty()
            && self.user_ids.is_empty()
    }

    /// Whether an event of `event_type` carrying `data` passes these filters.
    ///
    /// Ticket events are checked on queue, priority, status and assignee; an
    /// unassigned ticket passes the user filter. Customer events are checked
    /// on the customer id. Other domains carry none of these keys and always
    /// pass.
    pub fn matches(&self, event_type: &str, data: &Map<String, Value>) -> bool {
        if self.is_empty() {
            return true;
        }

        match event_type.split('.').next() {
            Some("ticket") => {
                contains_id(&self.queue_ids, data.get("queue_id"))
                    && contains_str(&self.priorities, data.get("priority"))
                    && contains_str(&self.statuses, data.get("status"))
                    && match data.get("assigned_to") {
                        None | Some(Value::Null) => true,
                        assignee => contains_id(&self.user_ids, assignee),
                    }
            }
            Some("customer") => contains_id(&self.user_ids, data.get("id")),
            _ => true,
        }
    }

    /// Trim entries and reject blanks or non-positive ids
    pub fn validated(self) -> Result<Self> {
        let ids = |field: &str, ids: Vec<i64>| -> Result<Vec<i64>> {
            if let Some(bad) = ids.iter().find(|id| **id <= 0) {
                return Err(WebhookError::validation(format!(
                    "filters.{} contains invalid id {}",
                    field, bad
                )));
            }
            Ok(ids)
        };
        let names = |field: &str, values: Vec<String>| -> Result<Vec<String>> {
            values
                .into_iter()
                .map(|v| {
                    let v = v.trim().to_string();
                    if v.is_empty() {
                        Err(WebhookError::validation(format!(
                            "filters.{} contains an empty value",
                            field
                        )))
                    } else {
                        Ok(v)
                    }
                })
                .collect()
        };

        Ok(Self {
            queue_ids: ids("queue_ids", self.queue_ids)?,
            priorities: names("priorities", self.priorities)?,
            statuses: names("statuses", self.statuses)?,
            user_ids: ids("user_ids", self.user_ids)?,
        })
    }
}

/// An empty list accepts anything, including a missing key
fn contains_id(allowed: &[i64], value: Option<&Value>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let id = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    id.is_some_and(|id| allowed.contains(&id))
}

fn contains_str(allowed: &[String], value: Option<&Value>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    value
        .and_then(Value::as_str)
        .is_some_and(|v| allowed.iter().any(|a| a == v))
}
