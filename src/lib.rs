//! shardmem - Distributed variable memory over a tagged message-passing fabric
//!
//! A small Director/Shard system: one Director (rank 0) exposes a
//! value-oriented API (allocate, read, modify, free, map, filter, reduce)
//! over a fixed set of Shards (rank ≥ 1) that physically store variables and
//! execute transformations on them locally. A variable is an `Int` or a
//! `List` of integers; large lists are striped across Shards.
//!
//! # Architecture
//!
//! ```text
//! Director (rank 0)  --tagged messages-->  Shard (rank 1..=N)
//!      ^ add/read/modify/free/map/filter/reduce    | owns a local Store
//! ```
//!
//! Ranks communicate exclusively through the [`fabric::Fabric`] trait, the
//! seam at which a real deployment would plug in MPI, gRPC, or raw sockets.
//! [`fabric::LocalFabric`] is the one concrete transport this crate ships:
//! an in-process implementation sufficient to run the full protocol inside
//! a single binary or test.
//!
//! # Modules
//!
//! - [`clock`] - Timestamps for `modify`'s last-writer-wins conflict resolution
//! - [`director`] - The Director coordinator and its public API
//! - [`error`] - Error types
//! - [`fabric`] - The tagged transport seam between ranks
//! - [`shard`] - The Shard dispatch loop and local store
//! - [`transform`] - Registered `map`/`filter`/`reduce` function identifiers
//! - [`wire`] - The message vocabulary shared across the fabric

pub mod clock;
pub mod director;
pub mod error;
pub mod fabric;
pub mod shard;
pub mod transform;
pub mod wire;

pub use director::{Director, Handle};
pub use error::{Error, Result};
pub use fabric::{Fabric, LocalCluster, LocalFabric};
pub use shard::Shard;
pub use wire::{Tag, Value, ValueKind};
