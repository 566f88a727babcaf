//! End-to-end scenarios against an in-process `LocalCluster`, one Tokio
//! task per Shard, matching the Director/Shard protocol described in
//! SPEC_FULL.md §8.

use std::sync::Arc;

use assert_matches::assert_matches;
use tokio::task::JoinHandle;

use shardmem::director::Director;
use shardmem::fabric::{Fabric, LocalCluster, LocalFabric};
use shardmem::transform::{Fold, Op, Pred};
use shardmem::wire::Value;
use shardmem::{Error, Shard};

/// Spin up `shard_count` Shard tasks plus a Director over a fresh
/// `LocalCluster`, admitting at most `max_per_shard` elements per Shard.
fn spawn_cluster(
    shard_count: usize,
    max_per_shard: usize,
) -> (Director<LocalFabric>, Vec<JoinHandle<()>>) {
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

#[tokio::test]
async fn s1_add_read_free_int() {
    let (mut director, tasks) = spawn_cluster(1, 64);

    let mut handle = director.add(Value::Int(42)).await.unwrap();
    assert_eq!(director.read(&handle).await.unwrap(), Value::Int(42));

    let freed = director.free(&mut handle).await.unwrap();
    assert_eq!(freed, 1);
    assert!(!handle.is_live());

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn s2_small_list_lands_on_a_single_stripe() {
    let (mut director, tasks) = spawn_cluster(2, 10);

    let handle = director.add(Value::List(vec![1, 2, 3, 4])).await.unwrap();
    assert_eq!(handle.stripe_count(), 1);
    assert_eq!(handle.stripes()[0].local_name.owner().unwrap(), 1);
    assert_eq!(director.read(&handle).await.unwrap(), Value::List(vec![1, 2, 3, 4]));

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn s3_striped_list_splits_nine_and_six() {
    let (mut director, tasks) = spawn_cluster(2, 10);

    let handle = director.add(Value::List((0..15).collect())).await.unwrap();
    assert_eq!(handle.stripe_count(), 2);
    assert_eq!(handle.stripes()[0].len(), 9);
    assert_eq!(handle.stripes()[0].local_name.owner().unwrap(), 1);
    assert_eq!(handle.stripes()[1].len(), 6);
    assert_eq!(handle.stripes()[1].local_name.owner().unwrap(), 2);

    let read_back = director.read(&handle).await.unwrap();
    assert_eq!(read_back, Value::List((0..15).collect()));

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn s4_modify_at_index_12_of_the_striped_list() {
    let (mut director, tasks) = spawn_cluster(2, 10);

    let handle = director.add(Value::List((0..15).collect())).await.unwrap();

    let applied = director.modify(&handle, Some(12), 42).await.unwrap();
    assert!(applied);

    let read_back = director.read(&handle).await.unwrap();
    let Value::List(xs) = read_back else {
        panic!("expected a list");
    };
    let mut expected: Vec<i64> = (0..15).collect();
    expected[12] = 42;
    assert_eq!(xs, expected);

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn s5_map_filter_reduce_matches_product_of_odd_squares() {
    let (mut director, tasks) = spawn_cluster(1, 64);

    let mut handle = director.add(Value::List((0..10).collect())).await.unwrap();
    director.map(&handle, Op::Square).await.unwrap();
    director.filter(&mut handle, Pred::IsOdd).await.unwrap();

    let product = director.reduce(&handle, Fold::Product, 1).await.unwrap();
    assert_eq!(product, 893_025);

    let read_back = director.read(&handle).await.unwrap();
    assert_eq!(read_back, Value::List(vec![1, 9, 25, 49, 81]));

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn s6_free_then_double_free() {
    let (mut director, tasks) = spawn_cluster(1, 64);

    let mut handle = director.add(Value::Int(7)).await.unwrap();
    director.free(&mut handle).await.unwrap();

    let err = director.free(&mut handle).await.unwrap_err();
    assert_matches!(err, Error::DoubleFree);

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn s7_oversubscribe_fails_with_out_of_memory() {
    let (mut director, tasks) = spawn_cluster(2, 5);

    let err = director.add(Value::List((0..11).collect())).await.unwrap_err();
    assert_matches!(err, Error::OutOfMemory { .. });

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn filter_always_true_is_a_no_op_on_contents() {
    let (mut director, tasks) = spawn_cluster(2, 10);

    let mut handle = director.add(Value::List((0..15).collect())).await.unwrap();
    let before = director.read(&handle).await.unwrap();

    director.filter(&mut handle, Pred::Always(true)).await.unwrap();

    let after = director.read(&handle).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(handle.len(), 15);

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn filter_always_false_empties_the_handle() {
    let (mut director, tasks) = spawn_cluster(2, 10);

    let mut handle = director.add(Value::List((0..15).collect())).await.unwrap();
    director.filter(&mut handle, Pred::Always(false)).await.unwrap();

    assert!(!handle.is_live());
    assert_eq!(handle.len(), 0);

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn reduce_sum_matches_sequential_left_fold() {
    let (mut director, tasks) = spawn_cluster(2, 64);

    let handle = director.add(Value::List((1..=20).collect())).await.unwrap();
    let sum = director.reduce(&handle, Fold::Sum, 0).await.unwrap();

    let expected: i64 = (1..=20).sum();
    assert_eq!(sum, expected);

    shutdown(&director, tasks).await;
}

#[tokio::test]
async fn serially_issued_modifies_commit_in_program_order() {
    let (mut director, tasks) = spawn_cluster(1, 64);

    let handle = director.add(Value::Int(0)).await.unwrap();
    assert!(director.modify(&handle, None, 1).await.unwrap());
    assert!(director.modify(&handle, None, 2).await.unwrap());
    assert!(director.modify(&handle, None, 3).await.unwrap());

    assert_eq!(director.read(&handle).await.unwrap(), Value::Int(3));

    shutdown(&director, tasks).await;
}
