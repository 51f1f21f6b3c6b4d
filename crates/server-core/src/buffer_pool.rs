//! Four-size-class buffer pool, grounded on `internal/pool.go`. The source's
//! `PutBuffer` keys on exact capacity equality against 8/512/2048/65536,
//! which silently drops any buffer grown past its class by an unpack helper
//! (§9 Design Notes). This pool instead buckets by "closest class ≤ cap",
//! so a buffer that grew still finds a home.

use std::sync::Mutex;

const CLASSES: [usize; 4] = [8, 512, 2048, 65536];

struct Class {
    size: usize,
    free: Mutex<Vec<Vec<u8>>>,
}

pub struct BufferPool {
    classes: [Class; 4],
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        BufferPool {
            classes: CLASSES.map(|size| Class { size, free: Mutex::new(Vec::new()) }),
        }
    }

    fn class_index_for_request(&self, size: usize) -> usize {
        CLASSES
            .iter()
            .position(|&class_size| size <= class_size)
            .unwrap_or(CLASSES.len() - 1)
    }

    /// Returns a buffer with length `size` and capacity at least `size`,
    /// drawn from the smallest class that fits (or freshly allocated).
    pub fn get(&self, size: usize) -> Vec<u8> {
        let idx = self.class_index_for_request(size);
        let mut free = self.classes[idx].free.lock().unwrap();
        let mut buf = free.pop().unwrap_or_else(|| Vec::with_capacity(self.classes[idx].size));
        buf.clear();
        buf.resize(size, 0);
        buf
    }

    /// Returns `buf` to the largest class whose size is `<= buf.capacity()`,
    /// or drops it if it's smaller than every class (shouldn't happen since
    /// `get` always allocates at least the smallest class's capacity).
    pub fn put(&self, mut buf: Vec<u8>) {
        buf.clear();
        let cap = buf.capacity();
        if let Some(idx) = CLASSES.iter().rposition(|&class_size| class_size <= cap) {
            self.classes[idx].free.lock().unwrap().push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_buffer_of_requested_length() {
        let pool = BufferPool::new();
        let buf = pool.get(100);
        assert_eq!(buf.len(), 100);
    }

    #[test]
    fn put_recycles_into_the_matching_class_for_reuse() {
        let pool = BufferPool::new();
        let buf = pool.get(10);
        let ptr = buf.as_ptr();
        pool.put(buf);
        let reused = pool.get(10);
        assert_eq!(reused.as_ptr(), ptr, "pooled buffer should be reused, not freshly allocated");
    }

    #[test]
    fn grown_buffer_still_finds_a_home_on_put() {
        // Simulate a buffer grown past the 8-byte class by an unpack helper:
        // the original source's exact-equality PutBuffer would drop this.
        let pool = BufferPool::new();
        let mut buf = pool.get(8);
        buf.reserve(600);
        let cap = buf.capacity();
        pool.put(buf);
        let idx = CLASSES.iter().rposition(|&c| c <= cap).unwrap();
        assert!(pool.classes[idx].free.lock().unwrap().len() == 1);
    }

    #[test]
    fn oversized_request_falls_into_the_largest_class() {
        let pool = BufferPool::new();
        let buf = pool.get(100_000);
        assert_eq!(buf.len(), 100_000);
    }
}
