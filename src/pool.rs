// Copyright (C) 2020-2026 Andy Kurnia.

use std::sync::atomic::{AtomicUsize, Ordering};

// 0 means one worker per cpu.
pub fn num_threads(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get()
    } else {
        requested
    }
}

// Fires at most once per distinct whole second.
pub struct Periods(pub u64);

impl Periods {
    #[inline(always)]
    pub fn update(&mut self, elapsed_secs: u64) -> bool {
        if elapsed_secs > self.0 {
            self.0 = elapsed_secs;
            true
        } else {
            false
        }
    }
}

pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

// Applies f to every item on a fixed pool of threads that pull indexes from a
// shared counter. Each worker only reads items and sends its own results, so
// there is no locking. Results come back in input order. A panic while
// processing one item becomes an Err for that item only.
pub fn map<T, R, F>(items: &[T], num_threads: usize, label: &str, f: F) -> Vec<Result<R, String>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let num_threads = num_threads.clamp(1, items.len().max(1));
    let next_index = AtomicUsize::new(0);
    let mut results = (0..items.len()).map(|_| None).collect::<Vec<_>>();
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::scope(|s| {
        for _ in 0..num_threads {
            let tx = tx.clone();
            let next_index = &next_index;
            let f = &f;
            s.spawn(move || {
                loop {
                    let idx = next_index.fetch_add(1, Ordering::Relaxed);
                    if idx >= items.len() {
                        break;
                    }
                    let result =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&items[idx])))
                            .map_err(|e| panic_message(&*e));
                    if tx.send((idx, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let t0 = std::time::Instant::now();
        let mut tick_periods = Periods(0);
        let mut completed = 0usize;
        for (idx, result) in rx.iter() {
            results[idx] = Some(result);
            completed += 1;
            if tick_periods.update(t0.elapsed().as_secs()) {
                log::info!(
                    "{}: {}/{} done after {} seconds",
                    label,
                    completed,
                    items.len(),
                    tick_periods.0
                );
            }
        }
    });
    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|| Err("no result from worker".to_string())))
        .collect()
}
