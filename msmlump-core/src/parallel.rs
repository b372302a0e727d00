//! Thread-parallel execution over index ranges.
//!
//! Uses `std::thread::scope`, so closures may borrow from the caller and no
//! runtime or pool is kept alive between calls.

fn chunking(start: usize, end: usize, max_threads: usize) -> (usize, usize) {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let num_threads = available.min(max_threads.max(1));
    let total = end - start;
    (num_threads, total.div_ceil(num_threads))
}

/// Execute `f(chunk_start, chunk_end)` over `[start, end)` split across at
/// most `max_threads` threads.
pub fn parallel_for_chunks<F>(start: usize, end: usize, max_threads: usize, f: F)
where
    F: Fn(usize, usize) + Sync,
{
    if start >= end {
        return;
    }
    let (num_threads, chunk_size) = chunking(start, end, max_threads);
    if num_threads <= 1 || end - start <= chunk_size {
        f(start, end);
        return;
    }

    let f = &f;
    std::thread::scope(|s| {
        for chunk_start in (start..end).step_by(chunk_size) {
            let chunk_end = (chunk_start + chunk_size).min(end);
            s.spawn(move || f(chunk_start, chunk_end));
        }
    });
}

/// Like [`parallel_for_chunks`] but collects one result per chunk, in range
/// order.
pub fn parallel_map_chunks<F, R>(start: usize, end: usize, max_threads: usize, f: F) -> Vec<R>
where
    F: Fn(usize, usize) -> R + Sync,
    R: Send,
{
    if start >= end {
        return Vec::new();
    }
    let (num_threads, chunk_size) = chunking(start, end, max_threads);
    if num_threads <= 1 || end - start <= chunk_size {
        return vec![f(start, end)];
    }

    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = (start..end)
            .step_by(chunk_size)
            .map(|chunk_start| {
                let chunk_end = (chunk_start + chunk_size).min(end);
                s.spawn(move || f(chunk_start, chunk_end))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(r) => r,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parallel_for_chunks_covers_range() {
        let counter = AtomicUsize::new(0);
        parallel_for_chunks(0, 1000, 8, |start, end| {
            counter.fetch_add(end - start, Ordering::Relaxed);
        });
        assert_eq!(counter.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn test_parallel_map_chunks_ordered() {
        let results = parallel_map_chunks(0, 100, 8, |start, end| (start..end).collect::<Vec<_>>());
        let flat: Vec<usize> = results.into_iter().flatten().collect();
        assert_eq!(flat, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_thread_runs_inline() {
        let results = parallel_map_chunks(3, 10, 1, |start, end| (start, end));
        assert_eq!(results, vec![(3, 10)]);
    }

    #[test]
    fn test_empty_range() {
        let counter = AtomicUsize::new(0);
        parallel_for_chunks(5, 5, 4, |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert!(parallel_map_chunks(5, 5, 4, |s, e| e - s).is_empty());
    }
}
