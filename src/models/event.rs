use super::town::{Town, TownFields, TownKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Position of an event in the change log. Ids increase in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeId(pub u64);

impl ChangeId {
    /// Big-endian bytes, so byte order in an ordered store equals id order.
    pub fn to_key(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ChangeEventType {
    Create,
    Update,
    Delete,
}

/// One mutation of a town, recorded in the same transaction as the mutation itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: ChangeId,
    pub event_type: ChangeEventType,
    pub recorded_at: DateTime<Utc>,
    pub key: TownKey,

    /// Post-mutation fields for create/update, `None` for delete
    pub snapshot: Option<TownFields>,
}

impl ChangeEvent {
    pub fn created(id: ChangeId, town: &Town) -> Self {
        Self::with_snapshot(id, ChangeEventType::Create, town)
    }

    pub fn updated(id: ChangeId, town: &Town) -> Self {
        Self::with_snapshot(id, ChangeEventType::Update, town)
    }

    pub fn deleted(id: ChangeId, key: &TownKey) -> Self {
        Self {
            id,
            event_type: ChangeEventType::Delete,
            recorded_at: Utc::now(),
            key: key.clone(),
            snapshot: None,
        }
    }

    fn with_snapshot(id: ChangeId, event_type: ChangeEventType, town: &Town) -> Self {
        Self {
            id,
            event_type,
            recorded_at: Utc::now(),
            key: town.key.clone(),
            snapshot: Some(town.fields.clone()),
        }
    }

    pub fn document_id(&self) -> String {
        self.key.document_id()
    }
}
