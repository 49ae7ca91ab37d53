//! Domain events decoded from notification payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The row operation that fired the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Insert => write!(f, "INSERT"),
            Action::Update => write!(f, "UPDATE"),
            Action::Delete => write!(f, "DELETE"),
        }
    }
}

/// A row mutation on an attached table.
///
/// `data` is the JSON text of the affected row (the old row for deletes, the
/// new row otherwise). Its shape depends on the table, so it is kept as text;
/// use [`TableEvent::decode_data`] to turn it into a domain type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEvent {
    #[serde(alias = "Table")]
    pub table: String,
    #[serde(alias = "Action")]
    pub action: Action,
    #[serde(alias = "Data")]
    pub data: String,
}

impl TableEvent {
    /// Parse a notification payload.
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Deserialize the row carried by this event.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// What the callback registry dispatches.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    /// A decoded row change, delivered to event callbacks.
    Table(TableEvent),
    /// The subscription was re-established, delivered to reconnect callbacks.
    Reconnected,
}
