//! All Nearest Smaller Values.
//!
//! For every position `i` of a sequence, the nearest smaller value to the
//! left (right) is the closest position before (after) `i` whose value
//! qualifies under a [`Policy`]. Positions without such a partner get
//! `None`.
//!
//! [`ansv_sequential`] works on one slice; [`ansv`] computes the same
//! answers for a sequence split across the ranks of a communicator.

mod check;
mod distributed;
mod sequential;

pub use check::check_nsv;
pub use distributed::ansv;
pub use sequential::{ansv_sequential, nsv_sequential};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("expected {expected} answers, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("{direction:?} answer at index {index} is wrong: {reason}")]
    Check {
        direction: Direction,
        index: usize,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Local position visited at `step` of a scan over `n` elements.
    #[inline]
    pub(crate) fn position(self, step: usize, n: usize) -> usize {
        match self {
            Self::Left => step,
            Self::Right => n - 1 - step,
        }
    }
}

/// Which element counts as the nearest smaller value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Policy {
    /// Nearest strictly smaller value.
    NearestSmaller,
    /// Nearest value that is smaller or equal.
    NearestEqual,
    /// Among the equal values met before the nearest strictly smaller one,
    /// the furthest; the nearest strictly smaller value if there are none.
    FurthestEqual,
}

pub const ALL_POLICIES: [Policy; 3] = [
    Policy::NearestSmaller,
    Policy::NearestEqual,
    Policy::FurthestEqual,
];

impl Policy {
    /// Whether `candidate` may be the partner of `value`.
    #[inline]
    pub fn accepts<T: Ord>(self, candidate: &T, value: &T) -> bool {
        match self {
            Self::NearestSmaller => candidate < value,
            Self::NearestEqual | Self::FurthestEqual => candidate <= value,
        }
    }

    /// Whether `top` leaves the scan stack when `value` arrives.
    #[inline]
    pub(crate) fn beaten<T: Ord>(self, top: &T, value: &T) -> bool {
        match self {
            Self::NearestSmaller => top >= value,
            Self::NearestEqual | Self::FurthestEqual => top > value,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NearestSmaller => "nearest_sm",
            Self::NearestEqual => "nearest_eq",
            Self::FurthestEqual => "furthest_eq",
        }
    }
}

/// Left and right answers for a slice, as global indices.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Nsv {
    pub left: Vec<Option<usize>>,
    pub right: Vec<Option<usize>>,
}
