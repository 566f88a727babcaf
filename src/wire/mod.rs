//! The wire vocabulary shared by the Director and every Shard: the closed
//! tag enumeration, the `Value` tagged union, stripe/handle bookkeeping,
//! and the payload shapes each tag carries (§4.1, §4.3 of SPEC_FULL.md).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::error::{Error, Result};
use crate::transform::{Fold, Op, Pred};

/// A process rank in the fabric. Rank 0 is always the Director.
pub type Rank = u32;

/// A Shard-unique identifier, `"<rank>-<counter>"`. The rank prefix lets
/// the Director route any name to its owning Shard with no extra lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalName(String);

impl LocalName {
    pub fn new(rank: Rank, counter: u64) -> Self {
        Self(format!("{rank}-{counter}"))
    }

    /// The rank that owns this name, recovered from its prefix. Errors
    /// with `Error::MalformedLocalName` instead of panicking, so a
    /// corrupted value arriving over a future byte-oriented `Fabric`
    /// degrades the same way `Tag::decode` does for an unrecognized tag.
    pub fn owner(&self) -> Result<Rank> {
        self.0
            .split('-')
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::MalformedLocalName(self.0.clone()))
    }
}

impl fmt::Display for LocalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of a logical variable, tracked on the handle so replies can be
/// reassembled without re-deriving it from the stripes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    List,
}

/// A variable's value: a single integer, or a sequence of integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    List(Vec<i64>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::List(_) => ValueKind::List,
        }
    }

    /// Number of elements: 1 for `Int`, the list length otherwise.
    pub fn len(&self) -> usize {
        match self {
            Value::Int(_) => 1,
            Value::List(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::List(_) => Err(Error::InvalidType("expected Int, found List".into())),
        }
    }

    /// Slice out `[offset, offset+amount)` from a `List`, or the whole
    /// value if it is an `Int` (`offset` must be 0, `amount` must be 1).
    pub fn slice(&self, offset: usize, amount: usize) -> Value {
        match self {
            Value::Int(i) => {
                debug_assert_eq!((offset, amount), (0, 1));
                Value::Int(*i)
            }
            Value::List(v) => Value::List(v[offset..offset + amount].to_vec()),
        }
    }
}

/// `(local_name, low_index, high_index)`, the inclusive range of
/// positions this stripe covers within its logical list. Bounds are
/// unused (`0..=0`) for an `Int` variable, which always has exactly one
/// descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeDescriptor {
    pub local_name: LocalName,
    pub low: usize,
    pub high: usize,
}

impl StripeDescriptor {
    pub fn len(&self) -> usize {
        self.high - self.low + 1
    }
}

/// The closed wire tag enumeration. Numeric values match the original
/// implementation's `Tags` class so unknown-tag diagnostics read the same;
/// `4` (`sort`) is deliberately unassigned, since the bucket-sort demo is
/// out of scope per §1 of SPEC_FULL.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tag {
    Alloc = 0,
    Read = 1,
    Modify = 2,
    Free = 3,
    Quit = 5,
    Map = 6,
    Reduce = 7,
    Filter = 8,
}

impl Tag {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a tag byte as it would arrive over a byte-oriented transport
    /// (a socket or gRPC `Fabric`, say). `LocalFabric` never calls this
    /// (it passes typed `Message`s directly), but any `Fabric` that
    /// deserializes off the wire needs a way to report a tag its Shard
    /// doesn't recognize, which is fatal to that Shard per §7.
    pub fn decode(byte: u8, rank: Rank) -> Result<Tag> {
        Tag::try_from(byte).map_err(|unknown| Error::UnknownTag(unknown, rank))
    }
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(Tag::Alloc),
            1 => Ok(Tag::Read),
            2 => Ok(Tag::Modify),
            3 => Ok(Tag::Free),
            5 => Ok(Tag::Quit),
            6 => Ok(Tag::Map),
            7 => Ok(Tag::Reduce),
            8 => Ok(Tag::Filter),
            other => Err(other),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::Alloc => "alloc",
            Tag::Read => "read",
            Tag::Modify => "modify",
            Tag::Free => "free",
            Tag::Quit => "quit",
            Tag::Map => "map",
            Tag::Reduce => "reduce",
            Tag::Filter => "filter",
        };
        write!(f, "{name}")
    }
}

/// Payload shapes per tag, §4.3 of SPEC_FULL.md. Requests and replies for
/// the same operation share a tag but carry different `Payload` variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    Alloc(Value),
    AllocReply(LocalName),

    Read(LocalName),
    ReadReply(Value),

    Modify {
        local_name: LocalName,
        new_value: i64,
        /// `Some(local_index)` for a `List` stripe element, `None` to
        /// replace an `Int` variable wholesale. Already translated from
        /// the handle's global index by `director::placement`.
        index: Option<usize>,
        ts: Timestamp,
    },
    ModifyReply(bool),

    Free(LocalName),
    FreeReply(usize),

    Map {
        local_name: LocalName,
        op: Op,
    },

    Filter {
        local_name: LocalName,
        pred: Pred,
    },
    FilterReply {
        removed: usize,
        still_present: bool,
    },

    Reduce {
        remaining: Vec<LocalName>,
        fold: Fold,
        acc: i64,
    },
    ReduceReply(i64),

    Quit,
}

/// An envelope `(source, tag, payload)` as it travels across the `Fabric`.
#[derive(Debug, Clone)]
pub struct Message {
    pub source: Rank,
    pub tag: Tag,
    pub payload: Payload,
}

impl Message {
    pub fn new(source: Rank, tag: Tag, payload: Payload) -> Self {
        Self {
            source,
            tag,
            payload,
        }
    }
}
