use crate::cli::{BatchArgs, EngineArgs};
use crate::commands::align::run_engine;
use crate::engine::{align_chromatograms, ChromAlignment};
use crate::utils::{read_manifest, Chromatogram, PairEntry, Result};
use crate::writers::AlignmentWriter;
use crossbeam_channel::{bounded, Sender};
use rayon::{
    iter::{ParallelBridge, ParallelIterator},
    ThreadPoolBuilder,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

const CHANNEL_BUFFER_SIZE: usize = 256;

/// Alignment of one manifest pair, ready for the writer thread.
struct PairResult {
    id: String,
    time_a: Vec<f64>,
    time_b: Vec<f64>,
    alignment: ChromAlignment,
}

pub fn batch(args: BatchArgs) -> Result<()> {
    let entries = read_manifest(&args.manifest)?;
    let num_pairs = entries.len();
    log::info!("Aligning {} chromatogram pairs", num_pairs);

    let mut writer = AlignmentWriter::new(args.output.as_deref(), true)?;

    let (sender_pair, receiver_pair) = bounded(CHANNEL_BUFFER_SIZE);
    let pair_stream_thread = thread::spawn(move || {
        for entry in entries {
            if sender_pair.send(entry).is_err() {
                return Err("Pair receiver closed early".to_string());
            }
        }
        Ok(())
    });

    let (sender_result, receiver_result) = bounded::<PairResult>(CHANNEL_BUFFER_SIZE);
    let writer_thread = thread::spawn(move || -> Result<()> {
        for result in &receiver_result {
            writer.write(
                &result.id,
                &result.alignment,
                &result.time_a,
                &result.time_b,
            )?;
        }
        writer.finish()?;
        Ok(())
    });

    log::debug!(
        "Initializing thread pool with {} threads...",
        args.num_threads
    );
    let failures = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(args.engine);
    let pool = initialize_thread_pool(args.num_threads)?;
    pool.install(|| {
        receiver_pair
            .into_iter()
            .par_bridge()
            .for_each_with(&sender_result, |s, entry| {
                if let Err(err) = process_pair(&entry, &engine, s) {
                    log::error!("Pair {}: {}", entry.id, err);
                    failures.fetch_add(1, Ordering::Relaxed);
                }
            });
    });

    // Clean-up
    drop(sender_result);
    writer_thread
        .join()
        .map_err(|_| "Writer thread panicked".to_string())??;
    log::trace!("Writer thread finished");
    match pair_stream_thread.join() {
        Ok(Ok(())) => log::trace!("Pair stream thread finished"),
        Ok(Err(e)) => log::error!("Pair streaming failed: {}", e),
        Err(_) => return Err("Pair stream thread panicked".into()),
    }

    let failed = failures.load(Ordering::Relaxed);
    if failed > 0 {
        return Err(format!("{} of {} pairs failed to align", failed, num_pairs));
    }
    Ok(())
}

fn process_pair(
    entry: &PairEntry,
    engine: &EngineArgs,
    sender_result: &Sender<PairResult>,
) -> Result<()> {
    let chrom_a = Chromatogram::from_path(&entry.path_a)?;
    let chrom_b = Chromatogram::from_path(&entry.path_b)?;
    let alignment = run_engine(
        &chrom_a,
        &chrom_b,
        entry.prediction,
        engine,
        align_chromatograms,
    )?;
    log::debug!(
        "Pair {} aligned into {} steps with {} gaps",
        entry.id,
        alignment.indices.len(),
        alignment.n_gaps
    );
    sender_result
        .send(PairResult {
            id: entry.id.clone(),
            time_a: chrom_a.time,
            time_b: chrom_b.time,
            alignment,
        })
        .map_err(|e| format!("Failed to send pair result to writer thread: {}", e))
}

fn initialize_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("chromalign-{}", i))
        .start_handler(|_thread_index| {
            log::trace!("Initialized thread {:?}", std::thread::current().id());
        })
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))
}
