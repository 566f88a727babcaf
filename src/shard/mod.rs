//! The Shard dispatcher: a single-threaded loop serving tagged operations
//! against local storage (§4.3 of SPEC_FULL.md).

mod store;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, WallClock};
use crate::error::{Error, Result};
use crate::fabric::Fabric;
use crate::wire::{LocalName, Message, Payload, Tag};

use store::Store;

/// A single worker process owning a local `Store`. Runs on its own async
/// task, driven entirely by messages from its `Fabric`.
pub struct Shard<F: Fabric> {
    fabric: Arc<F>,
    store: Store,
    counter: AtomicU64,
    clock: WallClock,
}

impl<F: Fabric> Shard<F> {
    pub fn new(fabric: Arc<F>) -> Self {
        Self {
            fabric,
            store: Store::new(),
            counter: AtomicU64::new(0),
            clock: WallClock,
        }
    }

    /// Serve messages until a `QUIT` arrives or the fabric closes.
    #[instrument(skip(self), fields(rank = self.fabric.rank()))]
    pub async fn run(mut self) -> Result<()> {
        info!("shard starting");
        loop {
            let msg = self.fabric.recv().await?;
            if matches!(msg.tag, Tag::Quit) {
                info!("shard exiting on QUIT");
                return Ok(());
            }
            if let Err(err) = self.dispatch(msg).await {
                error!(%err, "shard terminating on unrecoverable error");
                return Err(err);
            }
        }
    }

    async fn dispatch(&mut self, msg: Message) -> Result<()> {
        let source = msg.source;
        match msg.payload {
            Payload::Alloc(value) => {
                let name = self.allocate(value);
                debug!(%name, "allocated");
                self.fabric
                    .send(source, Tag::Alloc, Payload::AllocReply(name))
                    .await
            }

            Payload::Read(name) => {
                let value = self
                    .store
                    .get(&name)
                    .ok_or_else(|| Error::MissingName(name.clone()))?;
                self.fabric
                    .send(source, Tag::Read, Payload::ReadReply(value))
                    .await
            }

            Payload::Modify {
                local_name,
                new_value,
                index,
                ts,
            } => {
                let ok = self
                    .store
                    .modify(&local_name, new_value, index, ts, self.clock.now());
                debug!(%local_name, ok, "modify");
                self.fabric
                    .send(source, Tag::Modify, Payload::ModifyReply(ok))
                    .await
            }

            Payload::Free(name) => {
                let count = self
                    .store
                    .remove(&name)
                    .ok_or_else(|| Error::MissingName(name.clone()))?;
                debug!(%name, count, "freed");
                self.fabric
                    .send(source, Tag::Free, Payload::FreeReply(count))
                    .await
            }

            Payload::Map { local_name, op } => {
                self.store.map(&local_name, op);
                debug!(%local_name, ?op, "mapped (fire-and-forget, no reply)");
                Ok(())
            }

            Payload::Filter { local_name, pred } => {
                let (removed, still_present) = self
                    .store
                    .filter(&local_name, pred)
                    .ok_or_else(|| Error::MissingName(local_name.clone()))?;
                debug!(%local_name, removed, still_present, "filtered");
                self.fabric
                    .send(
                        source,
                        Tag::Filter,
                        Payload::FilterReply {
                            removed,
                            still_present,
                        },
                    )
                    .await
            }

            Payload::Reduce {
                remaining,
                fold,
                acc,
            } => self.reduce(remaining, fold, acc).await,

            Payload::Quit | Payload::AllocReply(_) | Payload::ReadReply(_) | Payload::ModifyReply(_)
            | Payload::FreeReply(_) | Payload::FilterReply { .. } | Payload::ReduceReply(_) => {
                warn!(tag = %msg.tag, "shard received a reply-shaped payload, dropping");
                Err(Error::Protocol(format!(
                    "shard cannot dispatch payload for tag {}",
                    msg.tag
                )))
            }
        }
    }

    fn allocate(&mut self, value: crate::wire::Value) -> LocalName {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = LocalName::new(self.fabric.rank(), counter);
        self.store.insert(name.clone(), value);
        name
    }

    /// Fold the local value into `acc`, then forward to the next stripe's
    /// owner, or reply to the Director if this was the last stripe
    /// (§4.4 of SPEC_FULL.md).
    #[instrument(skip(self, fold), fields(rank = self.fabric.rank()))]
    async fn reduce(
        &mut self,
        remaining: Vec<LocalName>,
        fold: crate::transform::Fold,
        acc: i64,
    ) -> Result<()> {
        let (first, rest) = remaining
            .split_first()
            .ok_or_else(|| Error::Protocol("reduce received an empty stripe list".into()))?;

        let folded = self
            .store
            .reduce_local(first, fold, acc)
            .ok_or_else(|| Error::MissingName(first.clone()))?;

        if rest.is_empty() {
            debug!(acc = folded, "reduce pipeline complete, replying to director");
            self.fabric
                .send(0, Tag::Reduce, Payload::ReduceReply(folded))
                .await
        } else {
            let next = rest[0].owner()?;
            debug!(acc = folded, next, "forwarding reduce to next stripe owner");
            self.fabric
                .send(
                    next,
                    Tag::Reduce,
                    Payload::Reduce {
                        remaining: rest.to_vec(),
                        fold,
                        acc: folded,
                    },
                )
                .await
        }
    }
}
