//! Defines the `AlignmentWriter` struct for writing aligned retention times as TSV.
//!
use crate::cli;
use crate::engine::ChromAlignment;
use crate::utils::{create_writer, Result};
use std::{
    env,
    io::{BufWriter, Write},
};

const NA: &str = "NA";

/// Writes one row per aligned step: `idx_a idx_b time_a time_b score`,
/// optionally prefixed by a pair id.
pub struct AlignmentWriter<W: Write> {
    /// Destination of the rows.
    writer: W,
    /// Whether rows carry a leading pair id column.
    with_id: bool,
}

impl AlignmentWriter<BufWriter<Box<dyn Write + Send>>> {
    /// Constructs a new `AlignmentWriter` on a file, or on stdout when
    /// `output_path` is `None`.
    ///
    /// # Arguments
    /// * `output_path` - Path of the output TSV file.
    /// * `with_id` - Prefix every row with the pair id.
    pub fn new(output_path: Option<&str>, with_id: bool) -> Result<Self> {
        Self::from_writer(create_writer(output_path)?, with_id)
    }
}

impl<W: Write> AlignmentWriter<W> {
    /// Wraps `writer` and emits the provenance comment and column header.
    pub fn from_writer(mut writer: W, with_id: bool) -> Result<Self> {
        let command_line = env::args().collect::<Vec<_>>().join(" ");
        writeln!(
            writer,
            "#{}-{} {}",
            env!("CARGO_PKG_NAME"),
            *cli::FULL_VERSION,
            command_line
        )
        .map_err(|e| e.to_string())?;
        let columns = "idx_a\tidx_b\ttime_a\ttime_b\tscore";
        let header = if with_id {
            format!("id\t{}", columns)
        } else {
            columns.to_string()
        };
        writeln!(writer, "{}", header).map_err(|e| e.to_string())?;
        Ok(Self { writer, with_id })
    }

    /// Writes every step of `alignment`, mapping indices through the
    /// retention times of both runs.
    ///
    /// # Arguments
    /// * `id` - Pair id, written only when the writer was built `with_id`.
    /// * `alignment` - Alignment to write.
    /// * `t_a` - Retention times of run A.
    /// * `t_b` - Retention times of run B.
    pub fn write(
        &mut self,
        id: &str,
        alignment: &ChromAlignment,
        t_a: &[f64],
        t_b: &[f64],
    ) -> Result<()> {
        let times = alignment.aligned_times(t_a, t_b);
        let rows = alignment.indices.pairs().zip(&times).zip(&alignment.score);
        for (((idx_a, idx_b), (time_a, time_b)), score) in rows {
            if self.with_id {
                write!(self.writer, "{}\t", id).map_err(|e| e.to_string())?;
            }
            writeln!(
                self.writer,
                "{}\t{}\t{}\t{}\t{:.6}",
                idx_a,
                idx_b,
                format_time(*time_a),
                format_time(*time_b),
                score
            )
            .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().map_err(|e| e.to_string())?;
        Ok(self.writer)
    }
}

fn format_time(time: Option<f64>) -> String {
    time.map_or_else(|| NA.to_string(), |t| t.to_string())
}
