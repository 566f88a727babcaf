//! The Director-side opaque handle: an ordered sequence of stripes plus
//! the variable's kind. Stripe order defines the logical list ordering
//! (§3 of SPEC_FULL.md).

use crate::wire::{StripeDescriptor, ValueKind};

/// An opaque reference to a distributed variable. Truthy iff `stripes` is
/// non-empty; a freed handle is empty.
#[derive(Debug, Clone, Default)]
pub struct Handle {
    pub(crate) stripes: Vec<StripeDescriptor>,
    pub(crate) kind: Option<ValueKind>,
}

impl Handle {
    pub(crate) fn new(stripes: Vec<StripeDescriptor>, kind: ValueKind) -> Self {
        Self {
            stripes,
            kind: Some(kind),
        }
    }

    pub fn is_live(&self) -> bool {
        !self.stripes.is_empty()
    }

    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    pub fn stripes(&self) -> &[StripeDescriptor] {
        &self.stripes
    }

    /// Total number of elements the handle currently spans, by summing
    /// stripe lengths (kept accurate across `filter` via
    /// [`Handle::apply_filter_result`]).
    pub fn len(&self) -> usize {
        self.stripes.iter().map(StripeDescriptor::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold a `filter` reply for the stripe at `stripe_idx` into the
    /// handle: shrink (or drop) that stripe, then shift every later
    /// stripe's recorded global range down by `removed` so a subsequent
    /// indexed `modify` still lands correctly. This is the crate's
    /// resolution of the "filter + indexed modify" open question in §9 of
    /// SPEC_FULL.md (option b: re-index on the fly).
    pub(crate) fn apply_filter_result(&mut self, stripe_idx: usize, removed: usize, still_present: bool) {
        if removed == 0 {
            return;
        }

        if still_present {
            self.stripes[stripe_idx].high -= removed;
        } else {
            self.stripes.remove(stripe_idx);
        }

        let shift_from = if still_present { stripe_idx + 1 } else { stripe_idx };
        for stripe in &mut self.stripes[shift_from..] {
            stripe.low -= removed;
            stripe.high -= removed;
        }
    }

    /// Empty the handle, as `free` does on success.
    pub(crate) fn clear(&mut self) {
        self.stripes.clear();
        self.kind = None;
    }
}
