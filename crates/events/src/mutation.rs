//! Row mutation events.
//!
//! A `MutationEvent` describes one write that has been applied inside a ledger
//! transaction. It carries the row's before/after images, plus every row that a
//! referential delete action removed along with it.
//!
//! ## Images per kind
//!
//! | kind     | before | after |
//! |----------|--------|-------|
//! | `Insert` | `None` | row   |
//! | `Update` | row    | row   |
//! | `Delete` | row    | `None`|
//!
//! Events are generic over the row type so this crate stays free of the ledger's
//! data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A table row that can travel inside a mutation event.
pub trait Record: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Table discriminant for this row type.
    type Table: Copy
        + Eq
        + core::hash::Hash
        + core::fmt::Debug
        + core::fmt::Display
        + Send
        + Sync
        + 'static;

    /// The table this row belongs to.
    fn table(&self) -> Self::Table;
}

/// Kind of row write.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Insert => "insert",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl core::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who issued a write.
///
/// Client writes own base facts; rule writes own derived fields and
/// compensating side effects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Client,
    Rule(&'static str),
}

impl Origin {
    pub fn is_client(self) -> bool {
        matches!(self, Origin::Client)
    }
}

impl core::fmt::Display for Origin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Origin::Client => f.write_str("client"),
            Origin::Rule(name) => write!(f, "rule:{name}"),
        }
    }
}

/// An applied row write.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEvent<R: Record> {
    pub table: R::Table,
    pub kind: MutationKind,
    pub before: Option<R>,
    pub after: Option<R>,
    /// Rows removed by referential delete actions (transitively), captured
    /// before removal. Only ever non-empty for `Delete`.
    pub cascaded: Vec<R>,
    pub origin: Origin,
    /// 0 for client writes, parent depth + 1 for rule writes.
    pub depth: u32,
    pub occurred_at: DateTime<Utc>,
}

impl<R: Record> MutationEvent<R> {
    pub fn insert(after: R, origin: Origin, depth: u32) -> Self {
        Self {
            table: after.table(),
            kind: MutationKind::Insert,
            before: None,
            after: Some(after),
            cascaded: Vec::new(),
            origin,
            depth,
            occurred_at: Utc::now(),
        }
    }

    pub fn update(before: R, after: R, origin: Origin, depth: u32) -> Self {
        Self {
            table: after.table(),
            kind: MutationKind::Update,
            before: Some(before),
            after: Some(after),
            cascaded: Vec::new(),
            origin,
            depth,
            occurred_at: Utc::now(),
        }
    }

    pub fn delete(before: R, origin: Origin, depth: u32) -> Self {
        Self {
            table: before.table(),
            kind: MutationKind::Delete,
            before: Some(before),
            after: None,
            cascaded: Vec::new(),
            origin,
            depth,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_cascaded(mut self, cascaded: Vec<R>) -> Self {
        self.cascaded = cascaded;
        self
    }

    /// Stable event name (e.g. "inventory.update").
    pub fn event_type(&self) -> String {
        format!("{}.{}", self.table, self.kind)
    }

    /// The row as it is now, or as it was for deletes.
    pub fn row(&self) -> Option<&R> {
        self.after.as_ref().or(self.before.as_ref())
    }

    /// Cascaded rows belonging to `table`.
    pub fn cascaded_in(&self, table: R::Table) -> impl Iterator<Item = &R> + '_ {
        self.cascaded.iter().filter(move |r| r.table() == table)
    }

    pub fn has_cascaded(&self, table: R::Table) -> bool {
        self.cascaded_in(table).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Row {
        Bed(u32),
        Seed(u32),
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    enum Tbl {
        Bed,
        Seed,
    }

    impl core::fmt::Display for Tbl {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            match self {
                Tbl::Bed => f.write_str("bed"),
                Tbl::Seed => f.write_str("seed"),
            }
        }
    }

    impl Record for Row {
        type Table = Tbl;

        fn table(&self) -> Tbl {
            match self {
                Row::Bed(_) => Tbl::Bed,
                Row::Seed(_) => Tbl::Seed,
            }
        }
    }

    #[test]
    fn event_type_joins_table_and_kind() {
        let ev = MutationEvent::insert(Row::Bed(1), Origin::Client, 0);
        assert_eq!(ev.event_type(), "bed.insert");
        assert_eq!(ev.row(), Some(&Row::Bed(1)));
    }

    #[test]
    fn delete_keeps_before_image_and_filters_cascade_by_table() {
        let ev = MutationEvent::delete(Row::Bed(1), Origin::Rule("prune"), 2)
            .with_cascaded(vec![Row::Seed(3), Row::Seed(4), Row::Bed(9)]);

        assert_eq!(ev.kind, MutationKind::Delete);
        assert_eq!(ev.row(), Some(&Row::Bed(1)));
        assert_eq!(ev.cascaded_in(Tbl::Seed).count(), 2);
        assert!(ev.has_cascaded(Tbl::Bed));
        assert_eq!(ev.origin.to_string(), "rule:prune");
    }
}
