//! Rule engine for the nursery ledger.
//!
//! Keeps every derived field (zone stock, zone and employee productivity,
//! client bonus) consistent with base facts by running guard and
//! recomputation rules synchronously inside the writing transaction.
//!
//! - `rules`: the rules and the registry routing mutations to them
//! - `rule_dispatcher`: transaction pipeline and bounded cascade
//! - `consistency`: whole-ledger invariant scan
//! - `service`: the `Nursery` facade

pub mod config;
pub mod consistency;
pub mod error;
pub mod rule_dispatcher;
pub mod rules;
pub mod service;


pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use rule_dispatcher::{CommitReceipt, RuleDispatcher};
pub use rules::{Guard, Recompute, RuleEdge, RuleRegistry, Subscription, Write};
pub use service::{InMemoryNursery, Nursery};
