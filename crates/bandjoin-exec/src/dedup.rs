//! Emitted-pair identity set.

use std::mem;

use bandjoin_types::{Row, RowValues, Value};
use hashbrown::HashSet;

use crate::config::PairIdentity;
use crate::metrics::EstimateSize;

/// Remembers which (left, right) pairs have already been emitted.
#[derive(Debug)]
pub enum EmittedPairs {
    Ordinal(HashSet<(u64, u64)>),
    Content(HashSet<(RowValues, RowValues)>),
}

impl EmittedPairs {
    #[must_use]
    pub fn new(identity: PairIdentity) -> Self {
        match identity {
            PairIdentity::Ordinal => Self::Ordinal(HashSet::new()),
            PairIdentity::Content => Self::Content(HashSet::new()),
        }
    }

    #[must_use]
    pub const fn identity(&self) -> PairIdentity {
        match self {
            Self::Ordinal(_) => PairIdentity::Ordinal,
            Self::Content(_) => PairIdentity::Content,
        }
    }

    /// Record the pair. Returns `true` if it was not seen before.
    pub fn insert(&mut self, left: &Row, right: &Row) -> bool {
        match self {
            Self::Ordinal(seen) => seen.insert((left.ordinal(), right.ordinal())),
            Self::Content(seen) => {
                let key = (
                    left.values().iter().cloned().collect(),
                    right.values().iter().cloned().collect(),
                );
                seen.insert(key)
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Ordinal(seen) => seen.len(),
            Self::Content(seen) => seen.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EstimateSize for EmittedPairs {
    fn estimated_bytes(&self) -> usize {
        match self {
            Self::Ordinal(seen) => {
                mem::size_of::<Self>() + seen.capacity() * (mem::size_of::<(u64, u64)>() + 1)
            }
            Self::Content(seen) => {
                let slots = seen.capacity() * (mem::size_of::<(RowValues, RowValues)>() + 1);
                let heap: usize = seen
                    .iter()
                    .flat_map(|(l, r)| l.iter().chain(r.iter()))
                    .map(|v| v.estimated_bytes() - mem::size_of::<Value>())
                    .sum();
                mem::size_of::<Self>() + slots + heap
            }
        }
    }
}
