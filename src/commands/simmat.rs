use crate::cli::SimmatArgs;
use crate::commands::align::run_engine;
use crate::engine::constrained_similarity;
use crate::utils::{create_writer, Chromatogram, Result};
use crate::writers::write_similarity_matrix;

pub fn simmat(args: SimmatArgs) -> Result<()> {
    let chrom_a = Chromatogram::from_path(&args.chrom_a)?;
    let chrom_b = Chromatogram::from_path(&args.chrom_b)?;
    let prediction = args.b1p.zip(args.b2p);
    let prepared = run_engine(
        &chrom_a,
        &chrom_b,
        prediction,
        &args.engine,
        constrained_similarity,
    )?;
    log::info!(
        "Similarity matrix {}x{}, base gap penalty {:.6}, masked: {}",
        prepared.s.n_row(),
        prepared.s.n_col(),
        prepared.base_gap_penalty,
        prepared.masked
    );

    let mut writer = create_writer(args.output.as_deref())?;
    write_similarity_matrix(&mut writer, &prepared.s, &chrom_a.time, &chrom_b.time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use std::fs;

    #[test]
    fn test_simmat_writes_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let chrom = "time\tion_1\tion_2\n1.0\t1.0\t0.0\n2.0\t3.0\t0.5\n3.0\t2.0\t1.0\n";
        let path_a = dir.path().join("a.tsv");
        fs::write(&path_a, chrom).unwrap();
        let output = dir.path().join("sim.tsv");
        let cli = Cli::try_parse_from([
            "chromalign",
            "simmat",
            "-a",
            path_a.to_str().unwrap(),
            "-b",
            path_a.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--align-type",
            "global",
            "--sim-type",
            "dotProduct",
            "--normalization",
            "none",
        ])
        .unwrap();
        let Command::Simmat(args) = cli.command else {
            panic!("expected the simmat subcommand");
        };
        simmat(args).unwrap();

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "time\t1\t2\t3");
        assert_eq!(lines[2], "2\t3.000000\t9.250000\t6.500000");
    }
}
