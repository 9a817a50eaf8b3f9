use crate::cli::{AlignArgs, EngineArgs};
use crate::engine::{
    align_chromatograms, no_beef_from_adaptive_rt, AlignParams, AlignResult, AlignType,
    Constraint,
};
use crate::utils::{Chromatogram, Result};
use crate::writers::AlignmentWriter;

pub fn align(args: AlignArgs) -> Result<()> {
    let chrom_a = Chromatogram::from_path(&args.chrom_a)?;
    let chrom_b = Chromatogram::from_path(&args.chrom_b)?;
    log::debug!(
        "Loaded {} x {} time points over {} channels",
        chrom_a.len(),
        chrom_b.len(),
        chrom_a.channels.len()
    );

    let prediction = args.b1p.zip(args.b2p);
    let alignment = run_engine(&chrom_a, &chrom_b, prediction, &args.engine, align_chromatograms)?;
    log::info!(
        "Aligned into {} steps with {} gaps, final score {:.4}",
        alignment.indices.len(),
        alignment.n_gaps,
        alignment.score.last().copied().unwrap_or(0.0)
    );

    let mut writer = AlignmentWriter::new(args.output.as_deref(), false)?;
    writer.write("", &alignment, &chrom_a.time, &chrom_b.time)?;
    writer.finish()?;
    Ok(())
}

/// Resolves the engine options of one chromatogram pair and hands the signals
/// to `f`. Hybrid alignment without predicted times degrades to global.
pub(crate) fn run_engine<T, F>(
    chrom_a: &Chromatogram,
    chrom_b: &Chromatogram,
    prediction: Option<(f64, f64)>,
    engine: &EngineArgs,
    f: F,
) -> Result<T>
where
    F: FnOnce(&[Vec<f64>], &[Vec<f64>], &AlignParams, Option<&Constraint>) -> AlignResult<T>,
{
    let mut params = engine.align_params();
    let constraint = match (params.align_type, prediction) {
        (AlignType::Hybrid, Some((b1p, b2p))) => Some(Constraint {
            t_a: &chrom_a.time,
            t_b: &chrom_b.time,
            b1p,
            b2p,
            no_beef: no_beef(engine, &chrom_a.time)?,
            hard_constrain: engine.hard_constrain,
        }),
        (AlignType::Hybrid, None) => {
            log::warn!("No predicted retention times given, using global alignment");
            params.align_type = AlignType::Global;
            None
        }
        (AlignType::Global, _) => None,
    };
    f(
        &chrom_a.channels,
        &chrom_b.channels,
        &params,
        constraint.as_ref(),
    )
    .map_err(|e| e.to_string())
}

fn no_beef(engine: &EngineArgs, t_a: &[f64]) -> Result<usize> {
    match (engine.no_beef, engine.adaptive_rt) {
        (Some(samples), _) => Ok(samples),
        (None, Some(adaptive_rt)) => {
            no_beef_from_adaptive_rt(t_a, adaptive_rt).map_err(|e| e.to_string())
        }
        (None, None) => Ok(0),
    }
}
