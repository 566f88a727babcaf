//! The Director: the single stateful coordinator that exposes the public
//! value-oriented API over a `Fabric` of Shards (§2, §4.2 of SPEC_FULL.md).

mod handle;
mod placement;

pub use handle::Handle;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::clock::{Clock, WallClock};
use crate::error::{Error, Result};
use crate::fabric::Fabric;
use crate::transform::{Fold, Op, Pred};
use crate::wire::{LocalName, Payload, Rank, Tag, Value, ValueKind};

/// The Director's view of the cluster: the Load Table (per-Shard element
/// count) and a `Clock` for stamping `modify` timestamps. The Placement
/// Table and ListStripeIndex are not kept as separate maps (both live
/// inside each [`Handle`]'s stripe descriptors), and a `LocalName`'s rank
/// prefix recovers its owning Shard with no lookup at all.
pub struct Director<F: Fabric> {
    fabric: Arc<F>,
    shard_count: usize,
    max_per_shard: usize,
    load_table: HashMap<Rank, usize>,
    clock: Arc<dyn Clock>,
}

impl<F: Fabric> Director<F> {
    /// Build a Director over `shard_count` Shards (ranks `1..=shard_count`),
    /// each admitting at most `max_per_shard` elements, using the default
    /// physical wall-clock for `modify` timestamps.
    pub fn new(fabric: Arc<F>, shard_count: usize, max_per_shard: usize) -> Self {
        Self::with_clock(fabric, shard_count, max_per_shard, Arc::new(WallClock))
    }

    /// As [`Director::new`], but with an explicit `Clock`, e.g. a
    /// [`crate::clock::LamportClock`] in place of the wall-clock default.
    pub fn with_clock(
        fabric: Arc<F>,
        shard_count: usize,
        max_per_shard: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fabric,
            shard_count,
            max_per_shard,
            load_table: HashMap::new(),
            clock,
        }
    }

    /// Allocate `value`, placing it across one or more Shards per the
    /// whole-fit/split algorithm in `director::placement`, and return the
    /// opaque [`Handle`] that addresses it thereafter.
    #[instrument(skip(self, value))]
    pub async fn add(&mut self, value: Value) -> Result<Handle> {
        let kind = value.kind();
        let size = value.len();
        let plan = placement::plan_placement(size, self.shard_count, self.max_per_shard, &self.load_table)?;

        let mut stripes = Vec::with_capacity(plan.len());
        for (rank, amount, offset) in plan {
            let slice = value.slice(offset, amount);
            self.fabric.send(rank, Tag::Alloc, Payload::Alloc(slice)).await?;
            let reply = self.fabric.recv_from(rank).await?;
            let local_name = match reply.payload {
                Payload::AllocReply(name) => name,
                _ => return Err(Error::Protocol("expected AllocReply".into())),
            };

            *self.load_table.entry(rank).or_insert(0) += amount;
            stripes.push(crate::wire::StripeDescriptor {
                local_name,
                low: offset,
                high: offset + amount - 1,
            });
        }

        debug!(stripes = stripes.len(), size, "added");
        Ok(Handle::new(stripes, kind))
    }

    /// Read the full value a handle addresses, reassembling striped lists
    /// in stripe order.
    #[instrument(skip(self, handle))]
    pub async fn read(&self, handle: &Handle) -> Result<Value> {
        // A zero-stripe `List` handle is a legitimate empty list (§3: a
        // handle is truthy iff it has stripes); only a handle with no
        // `kind` at all (i.e. one that has been freed) is an error here.
        let kind = handle
            .kind()
            .ok_or_else(|| Error::Protocol("read on a freed handle".into()))?;

        let mut parts = Vec::with_capacity(handle.stripe_count());
        for stripe in handle.stripes() {
            let owner = stripe.local_name.owner()?;
            self.fabric
                .send(owner, Tag::Read, Payload::Read(stripe.local_name.clone()))
                .await?;
            let reply = self.fabric.recv_from(owner).await?;
            match reply.payload {
                Payload::ReadReply(value) => parts.push(value),
                _ => return Err(Error::Protocol("expected ReadReply".into())),
            }
        }

        match kind {
            ValueKind::Int => parts.into_iter().next().ok_or_else(|| {
                Error::Protocol("Int handle produced no stripe replies".into())
            }),
            ValueKind::List => {
                let mut out = Vec::with_capacity(handle.len());
                for part in parts {
                    match part {
                        Value::List(xs) => out.extend(xs),
                        Value::Int(_) => {
                            return Err(Error::Protocol("list handle stripe returned an Int".into()))
                        }
                    }
                }
                Ok(Value::List(out))
            }
        }
    }

    /// Overwrite a whole `Int` variable (`index` must be `None`), or one
    /// element of a `List` variable addressed by its global `index`.
    /// Returns whether the write was applied: rejected last-writer-wins
    /// conflicts and out-of-shape requests both return `Ok(false)`, never
    /// an `Err`, matching the distilled spec's dispatch contract.
    #[instrument(skip(self, handle))]
    pub async fn modify(&mut self, handle: &Handle, index: Option<i64>, new_value: i64) -> Result<bool> {
        let (stripe, local_index) = match (handle.kind(), index) {
            (Some(ValueKind::Int), None) => (
                handle
                    .stripes()
                    .first()
                    .ok_or_else(|| Error::Protocol("Int handle has no stripe".into()))?,
                None,
            ),
            (Some(ValueKind::List), Some(global_index)) => {
                let (stripe_idx, local_idx) = placement::translate_index(handle.stripes(), global_index)?;
                (&handle.stripes()[stripe_idx], Some(local_idx))
            }
            _ => return Err(Error::InvalidType("modify index shape does not match handle kind".into())),
        };

        let owner = stripe.local_name.owner()?;
        let ts = self.clock.now();
        self.fabric
            .send(
                owner,
                Tag::Modify,
                Payload::Modify {
                    local_name: stripe.local_name.clone(),
                    new_value,
                    index: local_index,
                    ts,
                },
            )
            .await?;
        let reply = self.fabric.recv_from(owner).await?;
        match reply.payload {
            Payload::ModifyReply(ok) => Ok(ok),
            _ => Err(Error::Protocol("expected ModifyReply".into())),
        }
    }

    /// Apply `op` pointwise across every stripe, fire-and-forget (no Shard
    /// reply for `MAP`, per §4.3).
    #[instrument(skip(self, handle))]
    pub async fn map(&self, handle: &Handle, op: Op) -> Result<()> {
        for stripe in handle.stripes() {
            let owner = stripe.local_name.owner()?;
            self.fabric
                .send(
                    owner,
                    Tag::Map,
                    Payload::Map {
                        local_name: stripe.local_name.clone(),
                        op,
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Apply `pred` to every element, dropping those that fail it, and
    /// re-index the handle's stripes in place so a subsequent indexed
    /// `modify` still lands correctly (§9 of SPEC_FULL.md).
    #[instrument(skip(self, handle))]
    pub async fn filter(&mut self, handle: &mut Handle, pred: Pred) -> Result<()> {
        let mut i = 0;
        while i < handle.stripe_count() {
            let local_name = handle.stripes()[i].local_name.clone();
            let owner = local_name.owner()?;
            self.fabric
                .send(owner, Tag::Filter, Payload::Filter { local_name, pred })
                .await?;
            let reply = self.fabric.recv_from(owner).await?;
            let (removed, still_present) = match reply.payload {
                Payload::FilterReply { removed, still_present } => (removed, still_present),
                _ => return Err(Error::Protocol("expected FilterReply".into())),
            };

            if removed > 0 {
                let load = self.load_table.entry(owner).or_insert(0);
                *load = load.saturating_sub(removed);
            }
            handle.apply_filter_result(i, removed, still_present);

            if still_present {
                i += 1;
            }
        }
        Ok(())
    }

    /// Fold `fold` left-to-right over every element, stripe by stripe,
    /// starting from `init`, by chaining the computation Shard-to-Shard
    /// and awaiting the final reply from the last stripe's owner.
    #[instrument(skip(self, handle))]
    pub async fn reduce(&self, handle: &Handle, fold: Fold, init: i64) -> Result<i64> {
        let remaining: Vec<LocalName> = handle.stripes().iter().map(|s| s.local_name.clone()).collect();
        let Some(first) = remaining.first() else {
            return Ok(init);
        };

        let last_owner = remaining
            .last()
            .expect("non-empty checked above")
            .owner()?;

        let first_owner = first.owner()?;
        self.fabric
            .send(
                first_owner,
                Tag::Reduce,
                Payload::Reduce {
                    remaining,
                    fold,
                    acc: init,
                },
            )
            .await?;

        let reply = self.fabric.recv_from(last_owner).await?;
        match reply.payload {
            Payload::ReduceReply(acc) => Ok(acc),
            _ => Err(Error::Protocol("expected ReduceReply".into())),
        }
    }

    /// Release every stripe a handle addresses, returning the total
    /// element count freed. Errors with [`Error::DoubleFree`] if the
    /// handle has already been freed.
    #[instrument(skip(self, handle))]
    pub async fn free(&mut self, handle: &mut Handle) -> Result<usize> {
        if !handle.is_live() {
            return Err(Error::DoubleFree);
        }

        let mut total = 0;
        for stripe in handle.stripes().to_vec() {
            let owner = stripe.local_name.owner()?;
            self.fabric
                .send(owner, Tag::Free, Payload::Free(stripe.local_name.clone()))
                .await?;
            let reply = self.fabric.recv_from(owner).await?;
            let count = match reply.payload {
                Payload::FreeReply(count) => count,
                _ => return Err(Error::Protocol("expected FreeReply".into())),
            };
            if let Some(load) = self.load_table.get_mut(&owner) {
                *load = load.saturating_sub(count);
            }
            total += count;
        }

        handle.clear();
        Ok(total)
    }

    /// Tell every Shard to exit its dispatch loop.
    #[instrument(skip(self))]
    pub async fn quit(&self) -> Result<()> {
        for rank in 1..=self.shard_count as Rank {
            self.fabric.send(rank, Tag::Quit, Payload::Quit).await?;
        }
        Ok(())
    }
}
