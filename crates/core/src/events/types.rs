use serde::{Deserialize, Serialize};

use crate::record::Status;

/// A successful mutation of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrudEvent {
    Created { id: String, user_id: Option<String> },
    Updated { id: String, user_id: Option<String> },
    Deleted { id: String, user_id: String },
    StatusChanged { id: String, user_id: String, status: Status },
    Moved { from: String, to: String, user_id: String },
    BatchCreated { ids: Vec<String>, user_id: Option<String> },
}

impl CrudEvent {
    /// Id of the record the event is about; the target id for moves.
    pub fn id(&self) -> Option<&str> {
        match self {
            CrudEvent::Created { id, .. }
            | CrudEvent::Updated { id, .. }
            | CrudEvent::Deleted { id, .. }
            | CrudEvent::StatusChanged { id, .. } => Some(id),
            CrudEvent::Moved { to, .. } => Some(to),
            CrudEvent::BatchCreated { .. } => None,
        }
    }
}
