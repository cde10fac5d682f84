use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use verdant_core::TransactionId;

use crate::mutation::{MutationEvent, MutationKind, Record};

/// Envelope for a committed mutation, as published on the change feed.
///
/// Notes:
/// - Built only from a transaction's journal **after** it commits.
/// - `sequence_number` is the 1-based position of the mutation inside its
///   transaction, so subscribers can replay a cascade in application order.
/// - `payload` holds `{ "before", "after", "cascaded" }` as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEnvelope {
    event_id: Uuid,
    transaction_id: TransactionId,
    sequence_number: u64,

    event_type: String,
    table: String,
    kind: MutationKind,
    origin: String,
    depth: u32,
    occurred_at: DateTime<Utc>,

    payload: JsonValue,
}

impl CommitEnvelope {
    pub fn from_mutation<R>(
        transaction_id: TransactionId,
        sequence_number: u64,
        event: &MutationEvent<R>,
    ) -> Result<Self, serde_json::Error>
    where
        R: Record + Serialize,
    {
        let payload = serde_json::json!({
            "before": serde_json::to_value(&event.before)?,
            "after": serde_json::to_value(&event.after)?,
            "cascaded": serde_json::to_value(&event.cascaded)?,
        });

        Ok(Self {
            event_id: Uuid::now_v7(),
            transaction_id,
            sequence_number,
            event_type: event.event_type(),
            table: event.table.to_string(),
            kind: event.kind,
            origin: event.origin.to_string(),
            depth: event.depth,
            occurred_at: event.occurred_at,
            payload,
        })
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }

    pub fn into_payload(self) -> JsonValue {
        self.payload
    }
}
