use once_cell::sync::Lazy;

use crate::base::utils::read_uint_from_env;
use crate::utils::stack::Stack;

use super::mark::MarkStackEntry;

/// Tunables of a [`GCMarker`](super::mark::GCMarker).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MarkerConfig {
    /// Maximum number of mark stack entries. Pushes beyond it go to the
    /// delayed-marking list. Zero means unbounded.
    pub mark_stack_limit: usize,
    /// Entries per stack segment.
    pub segment_size: usize,
    /// Empty segments kept around for reuse.
    pub max_cache_segments: usize,
    /// Work items per slice when draining incrementally. Zero means a slice
    /// runs to completion.
    pub slice_budget: usize,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            mark_stack_limit: 1 << 20,
            segment_size: Stack::<MarkStackEntry>::DEFAULT_SEGMENT_SIZE,
            max_cache_segments: 4,
            slice_budget: 0,
        }
    }
}

impl MarkerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.mark_stack_limit = match read_uint_from_env("GC_MARK_STACK_LIMIT") {
            Some(limit) => limit,
            _ => config.mark_stack_limit,
        };

        config.segment_size = match read_uint_from_env("GC_MARK_STACK_SEGMENT") {
            Some(size) if size > 0 => size,
            _ => config.segment_size,
        };

        config.max_cache_segments = match read_uint_from_env("GC_MARK_STACK_CACHE") {
            Some(count) => count,
            _ => config.max_cache_segments,
        };

        config.slice_budget = match read_uint_from_env("GC_MARK_SLICE_BUDGET") {
            Some(budget) => budget,
            _ => config.slice_budget,
        };

        config
    }

    pub fn slice_budget(&self) -> SliceBudget {
        if self.slice_budget == 0 {
            SliceBudget::unlimited()
        } else {
            SliceBudget::work(self.slice_budget)
        }
    }
}

/// Process-wide configuration, read from the environment on first use.
pub static DEFAULT_MARKER_CONFIG: Lazy<MarkerConfig> = Lazy::new(|| {
    let config = MarkerConfig::from_env();
    log::debug!(target: "gc", "Marker config: {:?}", config);
    config
});

/// Amount of work one marking slice may do before yielding to its caller.
/// One unit is one processed stack entry, one object scanned in place, or one
/// delayed thing traced.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SliceBudget {
    remaining: Option<usize>,
}

impl SliceBudget {
    pub const fn unlimited() -> Self {
        Self { remaining: None }
    }

    pub const fn work(items: usize) -> Self {
        Self {
            remaining: Some(items),
        }
    }

    #[inline]
    pub fn step(&mut self, items: usize) {
        if let Some(remaining) = &mut self.remaining {
            *remaining = remaining.saturating_sub(items);
        }
    }

    #[inline]
    pub fn is_over_budget(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn is_unlimited(&self) -> bool {
        self.remaining.is_none()
    }
}
