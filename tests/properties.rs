//! Property-based tests against a live `LocalCluster`, covering invariants
//! 1 (list round-trip), 2 (load table accounting), 6 (map linearity), and 7
//! (reduce as a left fold) from SPEC_FULL.md §8.

use std::sync::Arc;

use proptest::prelude::*;
use tokio::task::JoinHandle;

use shardmem::director::Director;
use shardmem::fabric::{Fabric, LocalCluster, LocalFabric};
use shardmem::transform::{Fold, Op};
use shardmem::wire::Value;
use shardmem::Shard;

fn spawn_cluster(shard_count: usize, max_per_shard: usize) -> (Director<LocalFabric>, Vec<JoinHandle<()>>) {
    let mut fabrics = LocalCluster::build(shard_count);
    let director_fabric = Arc::new(fabrics.remove(0));

    let tasks = fabrics
        .into_iter()
        .map(|fabric| {
            let shard = Shard::new(Arc::new(fabric));
            tokio::spawn(async move {
                shard.run().await.expect("shard must exit cleanly on QUIT");
            })
        })
        .collect();

    (Director::new(director_fabric, shard_count, max_per_shard), tasks)
}

async fn shutdown(director: &Director<LocalFabric>, tasks: Vec<JoinHandle<()>>) {
    director.quit().await.unwrap();
    for task in tasks {
        task.await.unwrap();
    }
}

fn run<F>(fut: F) -> Result<(), TestCaseError>
where
    F: std::future::Future<Output = Result<(), TestCaseError>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Invariant 1: for any live list handle, `read` concatenation equals
    /// the value that was added, no matter how it was striped.
    #[test]
    fn list_round_trips_through_add_and_read(
        shard_count in 1usize..=4,
        max_per_shard in 3usize..=12,
        len in 0usize..=30,
    ) {
        // A shard's load can never reach max_per_shard (strict-`<`
        // admission), so total safe capacity is shard_count * (max_per_shard - 1).
        prop_assume!(len <= shard_count * (max_per_shard - 1));

        run(async move {
            let (mut director, tasks) = spawn_cluster(shard_count, max_per_shard);
            let original: Vec<i64> = (0..len as i64).collect();

            let handle = director.add(Value::List(original.clone())).await.unwrap();
            let read_back = director.read(&handle).await.unwrap();

            prop_assert_eq!(read_back, Value::List(original));
            shutdown(&director, tasks).await;
            Ok(())
        })?;
    }

    /// Invariant 2: two allocations that together bring a single Shard's
    /// load to exactly `max_per_shard - 1` (the strict-`<` ceiling) must
    /// both succeed, and a third asking for just one more element must be
    /// rejected: the Load Table is tracking every prior `add` exactly,
    /// not approximately.
    #[test]
    fn load_table_tracks_every_prior_allocation(
        max_per_shard in 4usize..=20,
        first in 1usize..=10,
    ) {
        let first = first.min(max_per_shard.saturating_sub(1)).max(1);
        let second = (max_per_shard - 1) - first;

        run(async move {
            let (mut director, tasks) = spawn_cluster(1, max_per_shard);

            let _h1 = director.add(Value::List(vec![0; first])).await.unwrap();

            // Brings the shard's load to exactly max_per_shard - 1.
            if second > 0 {
                let _h2 = director.add(Value::List(vec![0; second])).await.unwrap();
            }

            // One more element than is left must now fail.
            let result = director.add(Value::Int(0)).await;
            prop_assert!(result.is_err());

            shutdown(&director, tasks).await;
            Ok(())
        })?;
    }

    /// Invariant 6: `map` is linear, applying `op` through the Director
    /// produces exactly the pointwise image of the pre-map value.
    #[test]
    fn map_matches_pointwise_application(
        values in prop::collection::vec(-50i64..50, 0..20),
        op_idx in 0usize..5,
    ) {
        let op = match op_idx {
            0 => Op::Square,
            1 => Op::Double,
            2 => Op::Negate,
            3 => Op::AddConstant(7),
            _ => Op::MulConstant(3),
        };

        run(async move {
            let (mut director, tasks) = spawn_cluster(2, 64);
            let handle = director.add(Value::List(values.clone())).await.unwrap();

            director.map(&handle, op).await.unwrap();
            let mapped = director.read(&handle).await.unwrap();

            let expected: Vec<i64> = values.into_iter().map(|x| op.apply(x)).collect();
            prop_assert_eq!(mapped, Value::List(expected));

            shutdown(&director, tasks).await;
            Ok(())
        })?;
    }

    /// Invariant 7: `reduce` equals the sequential left fold over
    /// `read(h)`, in stripe order.
    #[test]
    fn reduce_matches_sequential_left_fold(
        values in prop::collection::vec(-20i64..20, 0..25),
        shard_count in 1usize..=4,
    ) {
        run(async move {
            let (mut director, tasks) = spawn_cluster(shard_count, 64);
            let handle = director.add(Value::List(values.clone())).await.unwrap();

            let sum = director.reduce(&handle, Fold::Sum, 0).await.unwrap();
            let expected = values.iter().fold(0i64, |acc, &x| acc.wrapping_add(x));
            prop_assert_eq!(sum, expected);

            shutdown(&director, tasks).await;
            Ok(())
        })?;
    }
}
