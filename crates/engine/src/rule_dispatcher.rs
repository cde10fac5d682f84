//! Transaction pipeline with synchronous rule cascades.
//!
//! ```text
//! writes (client or maintenance)
//!   ↓
//! 1. Begin a ledger transaction
//!   ↓
//! 2. For each write (depth 0):
//!      access check (client writes) + column validation
//!      guards on the candidate mutation      → may reject, may request effects
//!      apply to the transaction, journal it
//!      guard effects                          → applied at depth + 1
//!      recomputations on the applied event    → their writes at depth + 1
//!   ↓
//! 3. Optional full consistency scan
//!   ↓
//! 4. Commit
//!   ↓
//! 5. Publish the journal to the change feed (after commit only)
//! ```
//!
//! Any error in steps 1-4 drops the transaction, which rolls back every write of
//! the cascade. Nothing is published for an aborted transaction.

use tracing::{debug, error, info, info_span, warn};

use verdant_core::TransactionId;
use verdant_events::{CommitEnvelope, EventBus, MutationEvent, Origin};
use verdant_ledger::{LedgerStore, LedgerTx, Row, RowKey, StoreError, Transaction, check_client_write};

use crate::config::EngineConfig;
use crate::consistency;
use crate::error::{EngineError, EngineResult};
use crate::rules::{RuleRegistry, Write};

/// Outcome of a committed transaction.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub transaction_id: TransactionId,
    /// Every applied mutation, in application order (the published order).
    pub events: Vec<MutationEvent<Row>>,
}

impl CommitReceipt {
    /// Final committed image of a row touched by the transaction, `None` if the
    /// row was not touched or ended up deleted.
    pub fn latest(&self, key: RowKey) -> Option<&Row> {
        self.events
            .iter()
            .rev()
            .find(|e| e.row().is_some_and(|r| r.key() == key))
            .and_then(|e| e.after.as_ref())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Runs writes through the rule registry inside one ledger transaction.
///
/// - `S`: ledger store
/// - `B`: change-feed bus
#[derive(Debug)]
pub struct RuleDispatcher<S, B> {
    store: S,
    bus: B,
    rules: RuleRegistry,
    config: EngineConfig,
}

impl<S, B> RuleDispatcher<S, B> {
    pub fn new(store: S, bus: B, rules: RuleRegistry, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            bus,
            rules,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }
}

impl<S, B> RuleDispatcher<S, B>
where
    S: LedgerStore,
    B: EventBus<CommitEnvelope>,
{
    /// Apply client writes as one transaction.
    pub fn execute(&self, writes: Vec<Write>) -> EngineResult<CommitReceipt> {
        self.run(Origin::Client, move |_| Ok(writes))
    }

    /// Plan writes against the transaction's view, then apply them as one
    /// transaction. `origin` is recorded on the top-level writes; only client
    /// writes are subject to derived-column access control.
    pub fn run(
        &self,
        origin: Origin,
        plan: impl FnOnce(&dyn LedgerTx) -> EngineResult<Vec<Write>>,
    ) -> EngineResult<CommitReceipt> {
        let transaction_id = TransactionId::new();
        let span = info_span!("ledger_tx", %transaction_id, %origin);
        let _entered = span.enter();

        let events = match self.apply_and_commit(origin, plan) {
            Ok(events) => events,
            Err(err) if err.is_engine_fault() => {
                error!(error = %err, "transaction aborted by engine fault");
                return Err(err);
            }
            Err(err) => {
                warn!(error = %err, "transaction rejected");
                return Err(err);
            }
        };

        self.publish(transaction_id, &events);
        info!(mutations = events.len(), "transaction committed");

        Ok(CommitReceipt {
            transaction_id,
            events,
        })
    }

    /// Read-only access to a consistent snapshot.
    pub fn read<T>(&self, query: impl FnOnce(&dyn LedgerTx) -> EngineResult<T>) -> EngineResult<T> {
        let tx = self.store.begin()?;
        query(&tx)
    }

    fn apply_and_commit(
        &self,
        origin: Origin,
        plan: impl FnOnce(&dyn LedgerTx) -> EngineResult<Vec<Write>>,
    ) -> EngineResult<Vec<MutationEvent<Row>>> {
        let mut tx = self.store.begin()?;
        let writes = plan(&tx)?;

        let mut cascade = Cascade {
            tx: &mut tx,
            rules: &self.rules,
            limit: self.config.max_cascade_depth,
            journal: Vec::new(),
        };
        for write in writes {
            cascade.apply(write, origin, 0)?;
        }
        let journal = cascade.journal;

        if self.config.verify_consistency {
            consistency::verify(&tx)?;
        }
        tx.commit()?;
        Ok(journal)
    }

    fn publish(&self, transaction_id: TransactionId, events: &[MutationEvent<Row>]) {
        for (idx, event) in events.iter().enumerate() {
            let envelope = match CommitEnvelope::from_mutation(transaction_id, idx as u64 + 1, event) {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(event_type = %event.event_type(), error = %err, "failed to encode change-feed envelope");
                    continue;
                }
            };
            if let Err(err) = self.bus.publish(envelope) {
                warn!(event_type = %event.event_type(), error = ?err, "change-feed publish failed");
            }
        }
    }
}

/// One transaction's cascade: depth-first application of writes and the
/// writes their rules request.
struct Cascade<'t, 'r> {
    tx: &'t mut dyn LedgerTx,
    rules: &'r RuleRegistry,
    limit: u32,
    journal: Vec<MutationEvent<Row>>,
}

impl Cascade<'_, '_> {
    fn apply(&mut self, write: Write, origin: Origin, depth: u32) -> EngineResult<()> {
        if depth > self.limit {
            return Err(EngineError::CascadeLimitExceeded {
                depth,
                limit: self.limit,
                issued_by: origin.to_string(),
            });
        }

        let candidate = self.candidate(&write, origin, depth)?;
        if let Some(after) = candidate.after.as_ref() {
            if origin.is_client() {
                check_client_write(candidate.before.as_ref(), after)?;
            }
            after.validate()?;
        }

        let rules = self.rules;
        let mut effects = Vec::new();
        for guard in rules.guards_for(&candidate) {
            let writes = guard.check(&*self.tx, &candidate).inspect_err(|err| {
                debug!(rule = guard.name(), event_type = %candidate.event_type(), error = %err, "guard rejected write");
            })?;
            effects.extend(writes.into_iter().map(|w| (guard.name(), w)));
        }

        let event = self.write_through(write, candidate)?;
        debug!(
            event_type = %event.event_type(),
            %origin,
            depth,
            cascaded = event.cascaded.len(),
            "mutation applied"
        );
        self.journal.push(event.clone());

        for (rule, effect) in effects {
            self.apply(effect, Origin::Rule(rule), depth + 1)?;
        }
        for rule in rules.recomputes_for(&event) {
            for write in rule.recompute(&*self.tx, &event)? {
                self.apply(write, Origin::Rule(rule.name()), depth + 1)?;
            }
        }
        Ok(())
    }

    /// The mutation as it would look if applied; `cascaded` left empty.
    fn candidate(&self, write: &Write, origin: Origin, depth: u32) -> EngineResult<MutationEvent<Row>> {
        let stored = |key: RowKey| -> EngineResult<Row> {
            self.tx.get(key)?.ok_or(EngineError::Store(StoreError::NotFound(key)))
        };
        Ok(match write {
            Write::Insert(row) => MutationEvent::insert(row.clone(), origin, depth),
            Write::Update(row) => MutationEvent::update(stored(row.key())?, row.clone(), origin, depth),
            Write::Delete(key) => MutationEvent::delete(stored(*key)?, origin, depth),
        })
    }

    fn write_through(&mut self, write: Write, candidate: MutationEvent<Row>) -> EngineResult<MutationEvent<Row>> {
        match write {
            Write::Insert(row) => self.tx.insert(row)?,
            Write::Update(row) => {
                self.tx.update(row)?;
            }
            Write::Delete(key) => {
                let deleted = self.tx.delete(key)?;
                return Ok(candidate.with_cascaded(deleted.cascaded));
            }
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use verdant_events::InMemoryEventBus;
    use verdant_ledger::{InMemoryLedger, Product, Vivarium, Zone};

    use crate::rules::{Recompute, Subscription};

    type Bus = Arc<InMemoryEventBus<CommitEnvelope>>;

    fn dispatcher(rules: RuleRegistry, config: EngineConfig) -> RuleDispatcher<InMemoryLedger, Bus> {
        RuleDispatcher::new(InMemoryLedger::new(), Arc::new(InMemoryEventBus::new()), rules, config).unwrap()
    }

    #[test]
    fn zero_depth_limit_is_rejected_at_construction() {
        let err = RuleDispatcher::new(
            InMemoryLedger::new(),
            Arc::new(InMemoryEventBus::<CommitEnvelope>::new()),
            RuleRegistry::standard(),
            EngineConfig::default().with_max_cascade_depth(0),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn receipt_tracks_final_image() {
        let d = dispatcher(RuleRegistry::standard(), EngineConfig::default());
        let vivarium = Vivarium::new("Bog garden");
        let zone = Zone::new(vivarium.id, "Peat bed");
        let mut renamed = zone.clone();
        renamed.name = "Sphagnum bed".into();

        let receipt = d
            .execute(vec![
                Write::Insert(vivarium.into()),
                Write::Insert(zone.clone().into()),
                Write::Update(renamed.clone().into()),
            ])
            .unwrap();

        assert_eq!(receipt.len(), 3);
        assert_eq!(receipt.latest(RowKey::Zone(zone.id)), Some(&Row::from(renamed)));
    }

    #[test]
    fn updating_a_missing_row_is_not_found() {
        let d = dispatcher(RuleRegistry::standard(), EngineConfig::default());
        let product = Product::new("Ghost orchid", 1, 99_000);
        let err = d.execute(vec![Write::Update(product.clone().into())]).unwrap_err();
        assert_eq!(err, EngineError::Store(StoreError::NotFound(RowKey::Product(product.id))));
    }

    #[test]
    fn published_sequence_follows_application_order() {
        let d = dispatcher(RuleRegistry::new(), EngineConfig::default());
        let feed = d.bus().subscribe();
        let vivarium = Vivarium::new("Alpine house");

        let receipt = d
            .execute(vec![
                Write::Insert(vivarium.clone().into()),
                Write::Delete(RowKey::Vivarium(vivarium.id)),
            ])
            .unwrap();

        let published = feed.drain();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].sequence_number(), 1);
        assert_eq!(published[0].event_type(), "vivarium.insert");
        assert_eq!(published[1].sequence_number(), 2);
        assert_eq!(published[1].event_type(), "vivarium.delete");
        assert!(published.iter().all(|e| e.transaction_id() == receipt.transaction_id));
    }

    /// Renames a product every time a product changes.
    struct Echo;

    impl Recompute for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn subscriptions(&self) -> &'static [Subscription] {
            &[
                Subscription::Row(verdant_ledger::Table::Product, verdant_events::MutationKind::Insert),
                Subscription::Row(verdant_ledger::Table::Product, verdant_events::MutationKind::Update),
            ]
        }

        fn recompute(&self, _tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> EngineResult<Vec<Write>> {
            let Some(Row::Product(product)) = event.after.clone() else {
                return Ok(Vec::new());
            };
            let mut next = product;
            next.name.push('!');
            Ok(vec![Write::Update(next.into())])
        }
    }

    #[test]
    fn depth_bound_aborts_and_rolls_back() {
        let mut rules = RuleRegistry::new();
        rules.register_recompute(Echo);
        let d = dispatcher(rules, EngineConfig::default().with_max_cascade_depth(3));
        let feed = d.bus().subscribe();
        let product = Product::new("Fig", 5, 800);

        let err = d.execute(vec![Write::Insert(product.clone().into())]).unwrap_err();
        assert_eq!(
            err,
            EngineError::CascadeLimitExceeded {
                depth: 4,
                limit: 3,
                issued_by: "rule:echo".to_string(),
            }
        );
        assert!(d.read(|tx| Ok(tx.product(product.id)?)).unwrap().is_none());
        assert!(feed.drain().is_empty());
    }
}
