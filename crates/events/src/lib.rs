//! Mutation events and the post-commit change feed.
//!
//! - `MutationEvent`: a single applied row write (before/after images), raised
//!   inside the enclosing ledger transaction.
//! - `CommitEnvelope`: the serialized form of a mutation, published only after
//!   its transaction commits.
//! - `EventBus`: fan-out of commit envelopes to subscribers.

pub mod bus;
pub mod envelope;
pub mod in_memory_bus;
pub mod mutation;

pub use bus::{EventBus, Subscription};
pub use envelope::CommitEnvelope;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use mutation::{MutationEvent, MutationKind, Origin, Record};
