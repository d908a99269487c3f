use std::mem::{replace, size_of};

/// Segmented LIFO stack with an upper bound on the number of elements.
///
/// Elements live in fixed-size segments. Retired segments are kept in a small
/// cache so that a stack which repeatedly grows and shrinks around a segment
/// boundary does not hit the allocator every time. Unlike `Vec`, a full stack
/// refuses the push instead of growing: callers decide what to do with the
/// item (the marker parks the owning thing on its delayed list).
pub struct Stack<E> {
    seg_size: usize,
    max_size: usize,
    max_cache_size: usize,
    cur_seg: Vec<E>,
    full_segs: Vec<Vec<E>>,
    cache: Vec<Vec<E>>,
    peak: usize,
}

impl<E> Stack<E> {
    pub const DEFAULT_SEGMENT_SIZE: usize = {
        let size = if size_of::<E>() == 0 { 1 } else { size_of::<E>() };
        let count = (4096 - 2 * size_of::<usize>()) / size;
        if count == 0 {
            1
        } else {
            count
        }
    };

    pub fn is_empty(&self) -> bool {
        self.cur_seg.is_empty() && self.full_segs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.size() >= self.max_size
    }

    pub fn size(&self) -> usize {
        self.full_segs.len() * self.seg_size + self.cur_seg.len()
    }

    pub const fn segment_size(&self) -> usize {
        self.seg_size
    }

    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    pub const fn max_cache_size(&self) -> usize {
        self.max_cache_size
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Largest size observed since construction or the last `reset_peak`.
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn reset_peak(&mut self) {
        self.peak = self.size();
    }

    fn adjust_max_size(max_size: usize) -> usize {
        if max_size == 0 {
            usize::MAX
        } else {
            max_size
        }
    }

    /// Creates a stack. A `max_size` of zero means the stack is unbounded.
    pub fn new(segment_size: usize, max_cache_size: usize, max_size: usize) -> Self {
        assert!(segment_size > 0, "segment size must be positive");
        Self {
            seg_size: segment_size,
            max_cache_size,
            max_size: Self::adjust_max_size(max_size),
            cur_seg: Vec::new(),
            full_segs: Vec::new(),
            cache: Vec::new(),
            peak: 0,
        }
    }

    /// Changes the bound. Elements already above the new bound stay on the
    /// stack; only later pushes are refused.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = Self::adjust_max_size(max_size);
    }

    fn fresh_segment(&mut self) -> Vec<E> {
        match self.cache.pop() {
            Some(seg) => seg,
            None => Vec::with_capacity(self.seg_size),
        }
    }

    #[inline(never)]
    #[cold]
    fn push_segment(&mut self) {
        let next = self.fresh_segment();
        let full = replace(&mut self.cur_seg, next);
        self.full_segs.push(full);
    }

    #[inline(never)]
    #[cold]
    fn pop_segment(&mut self) {
        let prev = self
            .full_segs
            .pop()
            .expect("pop_segment called without a full segment");
        let retired = replace(&mut self.cur_seg, prev);

        if self.cache.len() < self.max_cache_size {
            self.cache.push(retired);
        }
    }

    /// Pushes `item`, handing it back when the stack is at its bound.
    pub fn push(&mut self, item: E) -> Result<(), E> {
        if self.is_full() {
            return Err(item);
        }

        if self.cur_seg.len() == self.seg_size {
            self.push_segment();
        } else if self.cur_seg.capacity() == 0 {
            self.cur_seg = self.fresh_segment();
        }

        self.cur_seg.push(item);

        let size = self.size();
        if size > self.peak {
            self.peak = size;
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Option<E> {
        if self.cur_seg.is_empty() {
            if self.full_segs.is_empty() {
                return None;
            }
            self.pop_segment();
        }

        self.cur_seg.pop()
    }

    pub fn top(&self) -> Option<&E> {
        match self.cur_seg.last() {
            Some(item) => Some(item),
            None => self.full_segs.last().and_then(|seg| seg.last()),
        }
    }

    pub fn clear(&mut self, reset_cache: bool) {
        self.cur_seg.clear();
        while let Some(mut seg) = self.full_segs.pop() {
            if !reset_cache && self.cache.len() < self.max_cache_size {
                seg.clear();
                self.cache.push(seg);
            }
        }

        if reset_cache {
            self.cache.clear();
            self.cur_seg = Vec::new();
        }
    }
}
