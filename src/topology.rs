//! Addressing of participants in a logical ring.

use crate::error::{Result, RingError};

/// Ordinal identifier of a participant, `0 <= rank < size`.
pub type Rank = usize;

/// Rank of the participant that seeds and decrements the token.
pub const COORDINATOR: Rank = 0;

/// One member of the ring and its two neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    rank: Rank,
    size: usize,
    next: Rank,
    prev: Rank,
}

impl Participant {
    /// Establishes the `next`/`prev` addresses of `rank` in a ring of `size`.
    pub fn initialize(size: usize, rank: Rank) -> Result<Self> {
        if size < 1 {
            return Err(RingError::InvalidRingSize(size));
        }
        if rank >= size {
            return Err(RingError::InvalidRank { rank, size });
        }

        Ok(Self {
            rank,
            size,
            next: (rank + 1) % size,
            prev: (rank + size - 1) % size,
        })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn next(&self) -> Rank {
        self.next
    }

    pub fn prev(&self) -> Rank {
        self.prev
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }
}

/// Every participant of a ring of `size`, ordered by rank.
pub fn ring(size: usize) -> Result<Vec<Participant>> {
    if size < 1 {
        return Err(RingError::InvalidRingSize(size));
    }
    (0..size).map(|rank| Participant::initialize(size, rank)).collect()
}
