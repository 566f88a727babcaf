//! Registered-function identifiers shipped in place of opaque closures.
//!
//! `map`, `filter`, and `reduce` need to carry a user transformation across
//! the `Fabric`. Rust cannot ship an arbitrary closure as a wire payload the
//! way `dill.dumps` does in the original implementation, so this module
//! takes the fallback the distilled spec calls out explicitly: a closed,
//! serializable enum of named operations that every Shard resolves to a
//! native closure locally. Nothing but the tag and its constant arguments
//! crosses the `Fabric`.

use serde::{Deserialize, Serialize};

/// A unary transform applied pointwise by `map`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Square,
    Double,
    Negate,
    AddConstant(i64),
    MulConstant(i64),
}

impl Op {
    pub fn apply(self, x: i64) -> i64 {
        match self {
            Op::Square => x.wrapping_mul(x),
            Op::Double => x.wrapping_mul(2),
            Op::Negate => x.wrapping_neg(),
            Op::AddConstant(c) => x.wrapping_add(c),
            Op::MulConstant(c) => x.wrapping_mul(c),
        }
    }
}

/// A predicate evaluated pointwise by `filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pred {
    IsEven,
    IsOdd,
    GreaterThan(i64),
    LessThan(i64),
    Always(bool),
}

impl Pred {
    pub fn eval(self, x: i64) -> bool {
        match self {
            Pred::IsEven => x % 2 == 0,
            Pred::IsOdd => x % 2 != 0,
            Pred::GreaterThan(c) => x > c,
            Pred::LessThan(c) => x < c,
            Pred::Always(b) => b,
        }
    }
}

/// A binary fold consumed by `reduce`, applied as `acc = fold(acc, x)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fold {
    Sum,
    Product,
    Max,
    Min,
}

impl Fold {
    pub fn apply(self, acc: i64, x: i64) -> i64 {
        match self {
            Fold::Sum => acc.wrapping_add(x),
            Fold::Product => acc.wrapping_mul(x),
            Fold::Max => acc.max(x),
            Fold::Min => acc.min(x),
        }
    }
}
