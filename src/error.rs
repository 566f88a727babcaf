//! Error types for the distributed variable memory.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the Director API or the Shard dispatcher.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
#[allow(dead_code)]
pub enum Error {
    /// `add` was given neither an `Int` nor a `List`, or `modify`'s
    /// `new_value` was not an `Int`.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// `add` could not place all elements within `max_per_shard` across
    /// any combination of Shards.
    #[error(
        "out of memory: could not place {requested} element(s) across {shard_count} shard(s) (max_per_shard={max_per_shard})"
    )]
    OutOfMemory {
        requested: usize,
        shard_count: usize,
        max_per_shard: usize,
    },

    /// A list `modify(index=...)` did not fall within any stripe.
    #[error("index {index} out of bounds for a list of length {len}")]
    OutOfBounds { index: i64, len: usize },

    /// `free` was called on an already-empty handle.
    #[error("double free: handle has no live stripes")]
    DoubleFree,

    /// A Shard received a tag it does not know how to dispatch. Fatal to
    /// that Shard's task.
    #[error("unknown tag {0} received by shard {1}")]
    UnknownTag(u8, crate::wire::Rank),

    /// A `LocalName` did not carry a parseable `"<rank>-<counter>"` prefix,
    /// so its owning rank could not be recovered. Surfaces as a normal
    /// `Err` from a Director API call; fatal to a Shard's task if hit
    /// while forwarding a `REDUCE` hop.
    #[error("malformed local name: {0}")]
    MalformedLocalName(String),

    /// `READ`/`MODIFY` referenced a `LocalName` absent from the owning
    /// Shard's Store.
    #[error("missing name: {0}")]
    MissingName(crate::wire::LocalName),

    /// A send or receive on the `Fabric` failed because the peer's
    /// channel was closed (the peer task ended or was never spawned).
    #[error("fabric channel closed for rank {0}")]
    FabricClosed(crate::wire::Rank),

    /// A reply arrived with a payload shape the caller did not expect.
    #[error("protocol error: {0}")]
    Protocol(String),
}
