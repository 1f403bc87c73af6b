//! Target selection
//!
//! The distributor picks the target of every task by index into the
//! configured target list. Selection is uniform with repeats allowed.
//!
//! # Example
//!
//! ```
//! use httpulse::distribution::{Distribution, uniform::UniformDistribution};
//!
//! let targets = ["http://a/", "http://b/"];
//! let mut dist = UniformDistribution::with_seed(7);
//! let index = dist.next_index(targets.len());
//! assert!(index < targets.len());
//! ```

pub mod uniform;

/// Index generator for target selection
///
/// Must be `Send` so the distributor task can own it across await points.
pub trait Distribution: Send {
    /// Next index in the range [0, len); returns 0 when `len` is 0
    fn next_index(&mut self, len: usize) -> usize;

    /// Pick an element of `items`, or None if empty
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            return None;
        }
        items.get(self.next_index(items.len()))
    }
}
