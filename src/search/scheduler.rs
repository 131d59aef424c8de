//! Bounded-parallel execution of the resolver over the full key list.
//!
//! A dedicated rayon pool fans the keys out across workers. Each key's
//! result lands in its input-order slot (rayon's indexed `collect` keeps the
//! mapping), so the output is byte-identical for any pool size, including 1.
//!
//! Progress ticks travel over an mpsc channel to a single reporting thread
//! driving the bar, so rendering never blocks classification. The only
//! cross-worker mutable state is the used-keys set behind one mutex, updated
//! once per used key.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::search::resolver::Resolver;
use crate::usage::KeyUsage;

/// Cap on workers: each one drives an external search process, and more
/// than this many concurrent subprocesses stops helping.
const MAX_WORKERS: usize = 8;
const MIN_WORKERS: usize = 2;

/// Pool size: explicit override, else host parallelism clamped to [2, 8].
pub fn worker_count(parallelism: Option<usize>) -> usize {
    match parallelism {
        Some(n) if n > 0 => n,
        _ => thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(MIN_WORKERS)
            .clamp(MIN_WORKERS, MAX_WORKERS),
    }
}

/// Run the resolver over `keys` and return results in key order, plus the
/// set of keys found used. Empty keys are skipped, consuming a progress
/// tick but producing no record.
pub fn analyze_keys(
    keys: &[String],
    resolver: &Resolver<'_>,
    parallelism: Option<usize>,
    show_progress: bool,
) -> Result<(Vec<KeyUsage>, HashSet<String>)> {
    let workers = worker_count(parallelism);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("failed to build worker pool")?;

    let used_keys: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
    let (tx, rx) = mpsc::channel::<String>();

    let progress = show_progress.then(|| {
        let total = keys.len() as u64;
        thread::spawn(move || {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template("[{bar:50.green}] {pos}/{len} {msg}")
                    .expect("progress template is valid")
                    .progress_chars("=> "),
            );
            for key in rx {
                bar.set_message(key);
                bar.inc(1);
            }
            bar.finish_with_message("done");
        })
    });

    let results: Result<Vec<Option<KeyUsage>>> = pool.install(|| {
        keys.par_iter()
            .map(|key| {
                if key.is_empty() {
                    let _ = tx.send(String::new());
                    return Ok(None);
                }
                let usage = resolver.resolve(key)?;
                if usage.is_used {
                    let mut used = used_keys.lock().expect("used-keys mutex poisoned");
                    used.insert(key.clone());
                }
                let _ = tx.send(key.clone());
                Ok(Some(usage))
            })
            .collect()
    });

    // Closing the sender ends the progress thread's loop.
    drop(tx);
    if let Some(handle) = progress {
        let _ = handle.join();
    }

    let usages: Vec<KeyUsage> = results?.into_iter().flatten().collect();
    let used_keys = used_keys.into_inner().expect("used-keys mutex poisoned");
    Ok((usages, used_keys))
}
