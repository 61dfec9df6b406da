//! Property-based tests using proptest.
//!
//! These tests verify listing invariants for arbitrary registry layouts.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use carbon_registry::domain::{parse_amount, BatchId, Expiry};
use carbon_registry::infra::InMemoryLedgerBuilder;
use carbon_registry::{BatchAggregator, InMemoryLedger};

use common::*;

// ============================================================================
// Custom Strategies
// ============================================================================

/// A registry with `count` batches, some ids unresolvable and some holdings
#[derive(Debug, Clone)]
struct Layout {
    count: u64,
    unresolvable: BTreeSet<u64>,
    holdings: Vec<(u64, u64)>,
}

fn arb_layout() -> impl Strategy<Value = Layout> {
    (0u64..12).prop_flat_map(|count| {
        let ids = 1..count.max(1) + 1;
        (
            Just(count),
            prop::collection::btree_set(ids.clone(), 0..=(count as usize / 2)),
            prop::collection::vec((ids, 0u64..50), 0..8),
        )
            .prop_map(|(count, unresolvable, holdings)| Layout {
                count,
                unresolvable: unresolvable.into_iter().filter(|id| *id <= count).collect(),
                holdings: holdings.into_iter().filter(|(id, _)| *id <= count).collect(),
            })
    })
}

fn build(layout: &Layout) -> Arc<InMemoryLedger> {
    let mut builder: InMemoryLedgerBuilder = ledger_with_batches(layout.count);
    for (id, amount) in &layout.holdings {
        builder = builder.balance(holder(), BatchId(*id), tons(*amount));
    }
    for id in &layout.unresolvable {
        builder = builder.unresolvable(BatchId(*id));
    }
    Arc::new(builder.build())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Batch Listing Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_batch_listing_is_strictly_ascending(layout in arb_layout()) {
        let ledger = build(&layout);
        let batches = runtime()
            .block_on(BatchAggregator::new(ledger).list_all_batches())
            .unwrap();

        prop_assert!(batches.len() as u64 <= layout.count);
        prop_assert!(batches.windows(2).all(|pair| pair[0].id() < pair[1].id()));
        prop_assert!(batches
            .iter()
            .all(|b| b.id().as_u64() >= 1 && b.id().as_u64() <= layout.count));
    }

    #[test]
    fn prop_batch_listing_skips_exactly_unresolvable_ids(layout in arb_layout()) {
        let ledger = build(&layout);
        let batches = runtime()
            .block_on(BatchAggregator::new(ledger).list_all_batches())
            .unwrap();

        let listed: Vec<u64> = batches.iter().map(|b| b.id().as_u64()).collect();
        let expected: Vec<u64> = (1..=layout.count)
            .filter(|id| !layout.unresolvable.contains(id))
            .collect();
        prop_assert_eq!(listed, expected);
    }

    #[test]
    fn prop_fully_resolvable_registry_lists_every_batch(count in 0u64..20) {
        let ledger = Arc::new(ledger_with_batches(count).build());
        let batches = runtime()
            .block_on(BatchAggregator::new(ledger).list_all_batches())
            .unwrap();

        prop_assert_eq!(batches.len() as u64, count);
    }

    #[test]
    fn prop_balance_listing_has_no_zero_rows(layout in arb_layout()) {
        let ledger = build(&layout);
        let balances = runtime()
            .block_on(BatchAggregator::new(ledger.clone()).list_balances_for(holder()))
            .unwrap();

        prop_assert!(balances.iter().all(|b| !b.balance.is_zero()));
        prop_assert!(balances.windows(2).all(|pair| pair[0].batch_id < pair[1].batch_id));
        // One name read per positive balance seen
        let positive = (1..=layout.count)
            .filter(|id| !layout.unresolvable.contains(id))
            .filter(|id| layout.holdings.iter().any(|(h, amount)| h == id && *amount > 0))
            .count();
        prop_assert_eq!(balances.len(), positive);
        prop_assert_eq!(ledger.counts().get_batch(), positive as u64);
    }

    #[test]
    fn prop_listings_are_idempotent(layout in arb_layout()) {
        let ledger = build(&layout);
        let aggregator = BatchAggregator::new(ledger);
        let rt = runtime();

        let first = rt.block_on(aggregator.list_all_batches()).unwrap();
        let second = rt.block_on(aggregator.list_all_batches()).unwrap();
        prop_assert_eq!(first, second);

        let first = rt.block_on(aggregator.list_balances_for(holder())).unwrap();
        let second = rt.block_on(aggregator.list_balances_for(holder())).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ============================================================================
// Domain Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_batch_id_roundtrips_through_display(id in any::<u64>()) {
        let parsed: BatchId = BatchId(id).to_string().parse().unwrap();
        prop_assert_eq!(parsed, BatchId(id));
    }

    #[test]
    fn prop_range_below_covers_one_to_bound(bound in 0u64..500) {
        let ids: Vec<u64> = BatchId::range_below(BatchId(bound)).map(|id| id.as_u64()).collect();
        prop_assert_eq!(ids.len() as u64, bound.saturating_sub(1));
        prop_assert!(ids.iter().all(|id| *id >= 1 && *id < bound.max(1)));
    }

    #[test]
    fn prop_parse_amount_accepts_only_digits(raw in "\\PC{0,12}") {
        let parsed = parse_amount(&raw);
        let trimmed = raw.trim();
        let digits = !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit());
        prop_assert_eq!(parsed.is_some(), digits);
    }

    #[test]
    fn prop_zero_expiry_never_expires(now in 0i64..4_000_000_000) {
        let at = chrono::DateTime::from_timestamp(now, 0).unwrap();
        prop_assert!(!Expiry::from_unix(0).is_expired_at(at));
    }
}
