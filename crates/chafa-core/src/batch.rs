//! Splits a tall row range into row-ordered batches and runs them across a
//! thread pool, the way upstream's `chafa_process_batches` does. Used by
//! the Sixel encoder's two scaling/quantization passes and by cell
//! analysis when a caller opts into multithreaded canvases.
//!
//! Workers run in parallel (or inline, for `n_batches == 1`) and results are
//! handed back to `post` strictly in row order, so callers building a single
//! output buffer never need to reorder partial results themselves.

use std::sync::atomic::{AtomicI64, Ordering};

use rayon::prelude::*;

static THREAD_BUDGET: AtomicI64 = AtomicI64::new(0);

/// The row range assigned to one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInfo {
    pub first_row: u32,
    pub n_rows: u32,
}

/// Reserves up to `max_threads` worker slots from the process-wide budget,
/// backing off geometrically until the reservation fits (or bottoms out at
/// 1, which always succeeds since a single thread is the calling thread
/// itself and costs nothing extra).
fn allocate_threads(max_threads: usize, n_batches: usize) -> usize {
    let mut prev_n_threads: i64 = 0;
    let mut n_threads = max_threads.min(n_batches).max(1) as i64;

    loop {
        let prior_global = THREAD_BUDGET.fetch_add(n_threads - prev_n_threads, Ordering::SeqCst);
        let next_global = n_threads + prior_global;
        if next_global <= max_threads as i64 || n_threads == 1 {
            break;
        }
        prev_n_threads = n_threads;
        n_threads /= 2;
    }

    n_threads.max(1) as usize
}

fn deallocate_threads(n_threads: usize) {
    THREAD_BUDGET.fetch_sub(n_threads as i64, Ordering::SeqCst);
}

/// Returns the number of threads rayon's global pool was built with, used
/// as this process's `max_threads` ceiling the way upstream calls
/// `chafa_get_n_actual_threads()`.
pub fn n_actual_threads() -> usize {
    rayon::current_num_threads().max(1)
}

fn plan_batches(n_rows: u32, n_batches: usize, batch_unit: u32) -> Vec<BatchInfo> {
    if n_rows == 0 {
        return Vec::new();
    }
    let n_batches = n_batches.max(1);
    let batch_unit = batch_unit.max(1);
    let n_units = (n_rows + batch_unit - 1) / batch_unit;
    let units_per_batch = n_units as f64 / n_batches as f64;

    let mut batches = Vec::with_capacity(n_batches);
    let mut ofs = 0.0f64;

    for i in 0..n_batches {
        let row_ofs0 = ofs;
        let mut row_ofs1;
        loop {
            ofs += units_per_batch;
            row_ofs1 = ofs;
            if (row_ofs0 as u32) != (row_ofs1 as u32) {
                break;
            }
        }

        let mut first_row = (row_ofs0 as u32) * batch_unit;
        let mut last_row = (row_ofs1 as u32) * batch_unit;

        if last_row > n_rows || i == n_batches - 1 {
            ofs = n_rows as f64 + 0.5;
            last_row = n_rows;
        }

        if first_row >= last_row {
            break;
        }
        if first_row > n_rows {
            first_row = n_rows;
        }

        batches.push(BatchInfo { first_row, n_rows: last_row - first_row });
    }

    batches
}

/// Runs `worker` over every batch in `[0, n_rows)`, split into `n_batches`
/// row ranges that are multiples of `batch_unit` rows (except possibly the
/// last), then feeds each batch's result to `post` in row order.
///
/// `n_batches == 1` forces strictly single-threaded, in-order execution:
/// callers doing inherently sequential work (Floyd-Steinberg dithering)
/// pass 1 here rather than trying to parallelize row-independent batches.
pub fn process_batches<T, W, P>(n_rows: u32, n_batches: usize, batch_unit: u32, worker: W, mut post: P)
where
    T: Send,
    W: Fn(BatchInfo) -> T + Sync,
    P: FnMut(BatchInfo, T),
{
    let batches = plan_batches(n_rows, n_batches, batch_unit);
    if batches.is_empty() {
        return;
    }

    let max_threads = n_actual_threads();
    let n_threads = allocate_threads(max_threads, batches.len());

    let results: Vec<T> = if n_threads >= 2 {
        batches.par_iter().map(|&b| worker(b)).collect()
    } else {
        batches.iter().map(|&b| worker(b)).collect()
    };

    deallocate_threads(n_threads);

    for (batch, result) in batches.into_iter().zip(results) {
        post(batch, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn single_batch_covers_all_rows() {
        let batches = plan_batches(100, 1, 6);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], BatchInfo { first_row: 0, n_rows: 100 });
    }

    #[test]
    fn batches_are_multiples_of_batch_unit_except_last() {
        let batches = plan_batches(100, 4, 6);
        for b in &batches[..batches.len() - 1] {
            assert_eq!(b.n_rows % 6, 0);
        }
        let total: u32 = batches.iter().map(|b| b.n_rows).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn zero_rows_yields_no_batches() {
        assert!(plan_batches(0, 4, 6).is_empty());
    }

    #[test]
    fn process_batches_calls_post_in_row_order() {
        let seen = Mutex::new(Vec::new());
        process_batches(
            37,
            4,
            6,
            |b| b.first_row,
            |b, r| {
                assert_eq!(b.first_row, r);
                seen.lock().unwrap().push(b.first_row);
            },
        );
        let seen = seen.into_inner().unwrap();
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        assert_eq!(seen, sorted);
    }

    #[test]
    fn batch_budget_returns_to_zero_after_run() {
        process_batches(50, 3, 1, |_| (), |_, _| {});
        assert_eq!(THREAD_BUDGET.load(Ordering::SeqCst), 0);
    }
}
