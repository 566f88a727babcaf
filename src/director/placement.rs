//! The `add` placement algorithm and the index-translation helper for
//! indexed `modify`, §4.2 and §9 of SPEC_FULL.md.

use crate::error::{Error, Result};
use crate::wire::{Rank, StripeDescriptor};

/// One planned stripe: `(shard, amount, offset_within_value)`.
pub(crate) type Plan = Vec<(Rank, usize, usize)>;

/// Plan where to place a variable of `size` elements across
/// `1..=shard_count`, given each shard's current `LoadTable` entry.
///
/// Whole-fit pass first (ranks in order, strict `<` admission); if no
/// single shard fits the whole variable, fall back to a split pass across
/// shards ordered by ascending current load, each taking up to
/// `max_per_shard - 1 - load` elements so a shard's load can never reach
/// `max_per_shard` by either pass. Matches
/// `distributed_memory.memory.Memory.add` in the original implementation.
pub(crate) fn plan_placement(
    size: usize,
    shard_count: usize,
    max_per_shard: usize,
    load_table: &std::collections::HashMap<Rank, usize>,
) -> Result<Plan> {
    if size == 0 {
        return Ok(Plan::new());
    }

    let load_of = |rank: Rank| *load_table.get(&rank).unwrap_or(&0);

    for rank in 1..=shard_count as Rank {
        if load_of(rank) + size < max_per_shard {
            return Ok(vec![(rank, size, 0)]);
        }
    }

    let mut ranks: Vec<Rank> = (1..=shard_count as Rank).collect();
    ranks.sort_by_key(|&r| load_of(r));

    let mut plan = Plan::new();
    let mut remaining = size;
    let mut offset = 0;

    for rank in ranks {
        if remaining == 0 {
            break;
        }
        // Keep the whole-fit pass's strict-`<` admission contract alive in
        // the split pass too: a shard's load must never reach
        // `max_per_shard`, only approach it, so capacity here is
        // `max_per_shard - 1 - load`, not `max_per_shard - load`.
        let capacity = max_per_shard.saturating_sub(1).saturating_sub(load_of(rank));
        if capacity == 0 {
            return Err(Error::OutOfMemory {
                requested: size,
                shard_count,
                max_per_shard,
            });
        }
        let amount = remaining.min(capacity);
        plan.push((rank, amount, offset));
        offset += amount;
        remaining -= amount;
    }

    if remaining > 0 {
        return Err(Error::OutOfMemory {
            requested: size,
            shard_count,
            max_per_shard,
        });
    }

    Ok(plan)
}

/// Translate a global list index into `(stripe_index, local_index)` by
/// summing each stripe's actual element count, the first-principles
/// resolution of the `-1`/accumulator ambiguity the distilled spec flags
/// as an open question (§9 of SPEC_FULL.md), rather than reproducing the
/// original's `index - accumulated - 1`.
pub(crate) fn translate_index(stripes: &[StripeDescriptor], index: i64) -> Result<(usize, usize)> {
    let total_len: usize = stripes.iter().map(StripeDescriptor::len).sum();

    if index < 0 {
        return Err(Error::OutOfBounds {
            index,
            len: total_len,
        });
    }

    let mut accumulated: i64 = 0;
    for (i, stripe) in stripes.iter().enumerate() {
        let len = stripe.len() as i64;
        if index < accumulated + len {
            return Ok((i, (index - accumulated) as usize));
        }
        accumulated += len;
    }

    Err(Error::OutOfBounds {
        index,
        len: total_len,
    })
}
