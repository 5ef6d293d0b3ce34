//! The refetch coordinator
//!
//! One slot per query key. Slots are created on first touch and never
//! removed; each carries a watch channel distributing the current
//! snapshot to subscribers plus the sequence bookkeeping that enforces
//! the ordering invariant.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use guichet_gateway::{GatewayError, MutationData, MutationSpec, QuerySpec, RemoteGateway};
use log::debug;
use tokio::sync::watch;

use crate::snapshot::QuerySnapshot;

struct CacheSlot {
    /// Snapshot distribution; view-models hold the receiver side
    tx: watch::Sender<QuerySnapshot>,
    /// Sequence number of the most recently issued request
    issued_seq: u64,
    /// Sequence number of the most recently applied completion
    applied_seq: u64,
    /// Completions at or below this sequence cannot clear staleness
    stale_before_seq: u64,
    /// Requests currently in flight for this key
    inflight: u32,
    /// Next fetch must re-execute
    stale: bool,
}

impl CacheSlot {
    fn new() -> Self {
        Self {
            tx: watch::channel(QuerySnapshot::default()).0,
            issued_seq: 0,
            applied_seq: 0,
            stale_before_seq: 0,
            inflight: 0,
            stale: false,
        }
    }

    fn snapshot(&self) -> QuerySnapshot {
        self.tx.borrow().clone()
    }

    /// A request issued after the last invalidation is in flight
    fn fresh_inflight(&self) -> bool {
        self.inflight > 0 && self.issued_seq > self.stale_before_seq
    }

    /// Reserve the next sequence number and mark the key loading
    fn issue(&mut self) -> u64 {
        self.issued_seq += 1;
        self.inflight += 1;
        self.tx.send_modify(|snapshot| snapshot.loading = true);
        self.issued_seq
    }

    fn watched(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

enum FetchPlan {
    Hit(QuerySnapshot),
    Attach(watch::Receiver<QuerySnapshot>),
    Issue(u64),
}

struct CacheInner {
    gateway: Arc<dyn RemoteGateway>,
    slots: DashMap<QuerySpec, CacheSlot>,
}

/// Query cache and refetch coordinator
///
/// Exclusively owns all cached results. Workflows and view-models read
/// snapshots and request invalidation; they never mutate entries. Cheap
/// to clone: all clones share one store, and invalidating a watched key
/// spawns its background refetch on a clone.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                gateway,
                slots: DashMap::new(),
            }),
        }
    }

    /// Latest snapshot for a key, without triggering execution
    pub fn peek(&self, spec: &QuerySpec) -> Option<QuerySnapshot> {
        self.inner.slots.get(spec).map(|slot| slot.snapshot())
    }

    /// Observe a key's snapshot; creates the slot if absent
    ///
    /// Holding the receiver marks the key as displayed: invalidation then
    /// refetches it in the background instead of deferring to the next
    /// fetch.
    pub fn subscribe(&self, spec: &QuerySpec) -> watch::Receiver<QuerySnapshot> {
        self.inner
            .slots
            .entry(spec.clone())
            .or_insert_with(CacheSlot::new)
            .tx
            .subscribe()
    }

    /// Serve the cached result if current, attach to an in-flight
    /// execution, or execute via the gateway
    ///
    /// At most one execution runs per key: a second fetch while one is in
    /// flight waits on the same completion rather than issuing a
    /// duplicate call.
    pub async fn fetch(&self, spec: QuerySpec) -> QuerySnapshot {
        let plan = {
            let mut slot = self
                .inner
                .slots
                .entry(spec.clone())
                .or_insert_with(CacheSlot::new);
            let snapshot = slot.snapshot();
            if slot.fresh_inflight() {
                FetchPlan::Attach(slot.tx.subscribe())
            } else if snapshot.is_settled() && !slot.stale {
                FetchPlan::Hit(snapshot)
            } else {
                FetchPlan::Issue(slot.issue())
            }
        };

        match plan {
            FetchPlan::Hit(snapshot) => snapshot,
            FetchPlan::Attach(mut rx) => {
                debug!("{}: attaching to in-flight execution", spec.operation_name());
                let settled = match rx.wait_for(|snapshot| !snapshot.loading).await {
                    Ok(snapshot) => Some(snapshot.clone()),
                    // Sender gone; fall back to whatever was seen last
                    Err(_) => None,
                };
                match settled {
                    Some(snapshot) => snapshot,
                    None => rx.borrow().clone(),
                }
            }
            FetchPlan::Issue(seq) => self.run(&spec, seq).await,
        }
    }

    /// Execute unconditionally, superseding any in-flight request
    ///
    /// Time-sensitive reads (the stats panel) and the filter-clear path
    /// use this instead of `fetch`.
    pub async fn refetch(&self, spec: QuerySpec) -> QuerySnapshot {
        let seq = self
            .inner
            .slots
            .entry(spec.clone())
            .or_insert_with(CacheSlot::new)
            .issue();
        self.run(&spec, seq).await
    }

    /// Mark a key stale
    ///
    /// Watched keys are refetched immediately in the background; others
    /// re-execute on their next fetch. A completion of a request issued
    /// before this call can still update the data (ordering rule) but
    /// cannot clear the staleness it records.
    pub fn invalidate(&self, spec: &QuerySpec) {
        let watched = match self.inner.slots.get_mut(spec) {
            None => return,
            Some(mut slot) => {
                slot.stale = true;
                slot.stale_before_seq = slot.issued_seq;
                slot.watched()
            }
        };
        debug!("{}: invalidated", spec.operation_name());
        if watched {
            let cache = self.clone();
            let spec = spec.clone();
            tokio::spawn(async move { cache.refresh_stale(spec).await });
        }
    }

    /// Run a mutation via the gateway; on success, invalidate every query
    /// the mutation declares
    pub async fn execute(&self, mutation: MutationSpec) -> Result<MutationData, GatewayError> {
        let data = self.inner.gateway.mutate(&mutation).await?;
        debug!("{}: succeeded", mutation.operation_name());
        for target in mutation.invalidates() {
            self.invalidate(&target);
        }
        Ok(data)
    }

    /// Background refetch of an invalidated watched key; skipped if the
    /// slot was refreshed (or a fresh request issued) in the meantime
    async fn refresh_stale(&self, spec: QuerySpec) {
        let seq = {
            let Some(mut slot) = self.inner.slots.get_mut(&spec) else {
                return;
            };
            if !slot.stale || slot.fresh_inflight() {
                return;
            }
            slot.issue()
        };
        self.run(&spec, seq).await;
    }

    async fn run(&self, spec: &QuerySpec, seq: u64) -> QuerySnapshot {
        debug!("{}: executing (seq {seq})", spec.operation_name());
        let outcome = self.inner.gateway.query(spec).await;

        let Some(mut slot) = self.inner.slots.get_mut(spec) else {
            // Slots are never removed; nothing to apply if one is missing
            return QuerySnapshot::default();
        };
        slot.inflight -= 1;
        let loading = slot.inflight > 0;

        if seq <= slot.applied_seq {
            debug!(
                "{}: discarding out-of-order completion (seq {seq} <= applied {})",
                spec.operation_name(),
                slot.applied_seq
            );
            slot.tx.send_modify(|snapshot| snapshot.loading = loading);
            return slot.snapshot();
        }

        slot.applied_seq = seq;
        if seq > slot.stale_before_seq {
            slot.stale = false;
        }
        let snapshot = match outcome {
            Ok(data) => QuerySnapshot {
                data: Some(data),
                error: None,
                loading,
                last_fetched_at: Some(Utc::now()),
            },
            Err(e) => QuerySnapshot {
                data: None,
                error: Some(e.to_string()),
                loading,
                last_fetched_at: Some(Utc::now()),
            },
        };
        // Full replacement of the prior value, never a field-wise merge
        slot.tx.send_replace(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use guichet_core::{Compte, CompteType};
    use guichet_gateway::{QueryData, Result as GatewayResult, TransactionRequest, TransportError};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::oneshot;

    fn compte(id: &str, solde: Decimal) -> Compte {
        Compte {
            id: id.to_string(),
            solde,
            date_creation: Utc::now(),
            compte_type: CompteType::Courant,
        }
    }

    /// Gateway answering every query with a list whose solde encodes the
    /// execution count, so distinct executions are distinguishable
    struct CountingGateway {
        queries: AtomicU32,
        mutations: AtomicU32,
    }

    impl CountingGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                queries: AtomicU32::new(0),
                mutations: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl RemoteGateway for CountingGateway {
        async fn query(&self, _spec: &QuerySpec) -> GatewayResult<QueryData> {
            let n = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(QueryData::Comptes(vec![compte("1", Decimal::from(n))]))
        }

        async fn mutate(&self, spec: &MutationSpec) -> GatewayResult<MutationData> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            match spec {
                MutationSpec::AddTransaction(transaction) => {
                    Ok(MutationData::Transaction(guichet_core::Transaction {
                        id: "t-1".into(),
                        montant: transaction.montant,
                        date: Utc::now(),
                        transaction_type: transaction.transaction_type,
                        compte: None,
                    }))
                }
                _ => Ok(MutationData::Compte(compte("1", dec!(0)))),
            }
        }
    }

    /// Gateway whose query completions are released by the test, one
    /// oneshot gate per call in arrival order
    struct GatedGateway {
        gates: Mutex<VecDeque<oneshot::Receiver<GatewayResult<QueryData>>>>,
        calls: AtomicU32,
    }

    impl GatedGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                gates: Mutex::new(VecDeque::new()),
                calls: AtomicU32::new(0),
            })
        }

        fn arm(&self) -> oneshot::Sender<GatewayResult<QueryData>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        async fn until_calls(&self, n: u32) {
            while self.calls.load(Ordering::SeqCst) < n {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl RemoteGateway for GatedGateway {
        async fn query(&self, _spec: &QuerySpec) -> GatewayResult<QueryData> {
            let gate = self
                .gates
                .lock()
                .unwrap()
                .pop_front()
                .expect("query arrived with no gate armed");
            self.calls.fetch_add(1, Ordering::SeqCst);
            gate.await.expect("gate dropped")
        }

        async fn mutate(&self, _spec: &MutationSpec) -> GatewayResult<MutationData> {
            panic!("no mutations expected")
        }
    }

    fn solde_of(snapshot: &QuerySnapshot) -> Decimal {
        snapshot.data.as_ref().unwrap().as_comptes().unwrap()[0].solde
    }

    #[tokio::test]
    async fn test_fetch_serves_cached_result() {
        let gateway = CountingGateway::new();
        let cache = QueryCache::new(gateway.clone());

        let first = cache.fetch(QuerySpec::AllComptes).await;
        let second = cache.fetch(QuerySpec::AllComptes).await;

        assert_eq!(gateway.queries.load(Ordering::SeqCst), 1);
        assert_eq!(solde_of(&first), dec!(1));
        assert_eq!(solde_of(&second), dec!(1));
        assert!(!second.loading);
        assert!(second.last_fetched_at.is_some());
    }

    #[tokio::test]
    async fn test_distinct_variables_are_distinct_keys() {
        let gateway = CountingGateway::new();
        let cache = QueryCache::new(gateway.clone());

        cache
            .fetch(QuerySpec::CompteTransactions { id: "1".into() })
            .await;
        cache
            .fetch(QuerySpec::CompteTransactions { id: "2".into() })
            .await;

        assert_eq!(gateway.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reexecution() {
        let gateway = CountingGateway::new();
        let cache = QueryCache::new(gateway.clone());

        cache.fetch(QuerySpec::AllComptes).await;
        cache.invalidate(&QuerySpec::AllComptes);
        let after = cache.fetch(QuerySpec::AllComptes).await;

        assert_eq!(gateway.queries.load(Ordering::SeqCst), 2);
        assert_eq!(solde_of(&after), dec!(2));
    }

    #[tokio::test]
    async fn test_refetch_bypasses_cache() {
        let gateway = CountingGateway::new();
        let cache = QueryCache::new(gateway.clone());

        cache.fetch(QuerySpec::TransactionStats).await;
        cache.refetch(QuerySpec::TransactionStats).await;

        assert_eq!(gateway.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_execution() {
        let gateway = GatedGateway::new();
        let cache = QueryCache::new(gateway.clone());
        let gate = gateway.arm();

        let first = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(QuerySpec::AllComptes).await }
        });
        gateway.until_calls(1).await;

        let second = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(QuerySpec::AllComptes).await }
        });
        tokio::task::yield_now().await;

        gate.send(Ok(QueryData::Comptes(vec![compte("1", dec!(7))])))
            .unwrap();

        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(solde_of(&first), dec!(7));
        assert_eq!(solde_of(&second), dec!(7));
    }

    #[tokio::test]
    async fn test_out_of_order_completion_is_discarded() {
        let gateway = GatedGateway::new();
        let cache = QueryCache::new(gateway.clone());
        let gate_r1 = gateway.arm();
        let gate_r2 = gateway.arm();

        // R1 via fetch, R2 via refetch before R1 completes
        let r1 = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(QuerySpec::AllComptes).await }
        });
        gateway.until_calls(1).await;

        let r2 = tokio::spawn({
            let cache = cache.clone();
            async move { cache.refetch(QuerySpec::AllComptes).await }
        });
        gateway.until_calls(2).await;

        // R2 completes first, then the stale R1
        gate_r2
            .send(Ok(QueryData::Comptes(vec![compte("1", dec!(200))])))
            .unwrap();
        let newer = r2.await.unwrap();
        assert_eq!(solde_of(&newer), dec!(200));

        gate_r1
            .send(Ok(QueryData::Comptes(vec![compte("1", dec!(100))])))
            .unwrap();
        let stale = r1.await.unwrap();

        // The stale completion was discarded; everyone sees R2's value
        assert_eq!(solde_of(&stale), dec!(200));
        let cached = cache.peek(&QuerySpec::AllComptes).unwrap();
        assert_eq!(solde_of(&cached), dec!(200));
        assert!(!cached.loading);
    }

    #[tokio::test]
    async fn test_mutation_invalidates_declared_targets() {
        let gateway = CountingGateway::new();
        let cache = QueryCache::new(gateway.clone());

        cache.fetch(QuerySpec::AllComptes).await;
        cache
            .fetch(QuerySpec::CompteTransactions { id: "1".into() })
            .await;
        assert_eq!(gateway.queries.load(Ordering::SeqCst), 2);

        cache
            .execute(MutationSpec::AddTransaction(TransactionRequest {
                compte_id: "1".into(),
                montant: dec!(50),
                transaction_type: guichet_core::TransactionType::Depot,
            }))
            .await
            .unwrap();
        assert_eq!(gateway.mutations.load(Ordering::SeqCst), 1);

        // Both declared targets re-execute; an unrelated key does not
        cache.fetch(QuerySpec::AllComptes).await;
        cache
            .fetch(QuerySpec::CompteTransactions { id: "1".into() })
            .await;
        assert_eq!(gateway.queries.load(Ordering::SeqCst), 4);
        cache.fetch(QuerySpec::TransactionStats).await;
        assert_eq!(gateway.queries.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_invalidated_watched_key_refetches_in_background() {
        let gateway = CountingGateway::new();
        let cache = QueryCache::new(gateway.clone());
        let mut rx = cache.subscribe(&QuerySpec::AllComptes);

        cache.fetch(QuerySpec::AllComptes).await;
        cache.invalidate(&QuerySpec::AllComptes);

        let refreshed = rx
            .wait_for(|snapshot| {
                snapshot
                    .data
                    .as_ref()
                    .and_then(QueryData::as_comptes)
                    .is_some_and(|comptes| comptes[0].solde == dec!(2))
            })
            .await
            .unwrap()
            .clone();

        assert_eq!(gateway.queries.load(Ordering::SeqCst), 2);
        assert_eq!(solde_of(&refreshed), dec!(2));
    }

    #[tokio::test]
    async fn test_failed_execution_replaces_data_fully() {
        let gateway = GatedGateway::new();
        let cache = QueryCache::new(gateway.clone());

        let gate = gateway.arm();
        let fetch = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(QuerySpec::AllComptes).await }
        });
        gateway.until_calls(1).await;
        gate.send(Ok(QueryData::Comptes(vec![compte("1", dec!(5))])))
            .unwrap();
        fetch.await.unwrap();

        cache.invalidate(&QuerySpec::AllComptes);
        let gate = gateway.arm();
        let fetch = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(QuerySpec::AllComptes).await }
        });
        gateway.until_calls(2).await;
        gate.send(Err(TransportError::Connect("connection refused".into()).into()))
            .unwrap();
        let failed = fetch.await.unwrap();

        // The error snapshot replaces the prior value wholesale
        assert!(failed.data.is_none());
        assert!(failed.error.as_deref().unwrap().contains("connection refused"));
        assert!(failed.is_settled());
    }
}
