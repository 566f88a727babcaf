//! The transport seam between ranks.
//!
//! The distilled spec treats "the bootstrap that initializes the messaging
//! fabric and assigns ranks" as out of scope (in the original it was
//! `mpi4py`'s `MPI.COMM_WORLD`). `Fabric` is the trait a real deployment
//! would implement against MPI, gRPC, or raw sockets; [`local::LocalFabric`]
//! is the one concrete instance this crate ships, sufficient to run the
//! full Director/Shard protocol inside a single process for demos and
//! tests.

mod local;

pub use local::{LocalCluster, LocalFabric};

use async_trait::async_trait;

use crate::error::Result;
use crate::wire::{Message, Payload, Rank, Tag};

/// A point-to-point, tagged, FIFO-per-channel transport between ranks.
///
/// `recv` is "any source, any tag" by design, mirroring
/// `MPI.ANY_SOURCE`/`MPI.ANY_TAG`: the Shard dispatcher and the Director's
/// reduce-reply wait both need to accept whichever message arrives next.
#[async_trait]
pub trait Fabric: Send + Sync {
    /// This endpoint's own rank.
    fn rank(&self) -> Rank;

    /// Total number of ranks in the fabric (Director + Shards).
    fn size(&self) -> usize;

    /// Send `payload` tagged `tag` to `dest`. Does not wait for a reply;
    /// callers that need one issue a matching `recv`.
    async fn send(&self, dest: Rank, tag: Tag, payload: Payload) -> Result<()>;

    /// Block until any message arrives from any source, for any tag.
    async fn recv(&self) -> Result<Message>;

    /// Block until a message from `source` arrives. Used where the
    /// Director must pair a send with a reply from a specific Shard.
    async fn recv_from(&self, source: Rank) -> Result<Message> {
        loop {
            let msg = self.recv().await?;
            if msg.source == source {
                return Ok(msg);
            }
            // A real Fabric would requeue; LocalFabric's per-source
            // channels make this branch unreachable (see `local.rs`).
            debug_assert!(false, "recv_from saw an out-of-order source");
        }
    }
}
