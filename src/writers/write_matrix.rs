use crate::engine::SimMatrix;
use crate::utils::Result;
use std::io::Write;

/// Writes `s` as a TSV table: a header of B retention times, then one row per
/// A time point led by its retention time.
pub fn write_similarity_matrix<W: Write>(
    writer: &mut W,
    s: &SimMatrix,
    t_a: &[f64],
    t_b: &[f64],
) -> Result<()> {
    if s.shape() != (t_a.len(), t_b.len()) {
        return Err(format!(
            "Similarity matrix is {}x{} but runs have {} and {} time points",
            s.n_row(),
            s.n_col(),
            t_a.len(),
            t_b.len()
        ));
    }
    let header = t_b.iter().map(|t| t.to_string()).collect::<Vec<_>>().join("\t");
    writeln!(writer, "time\t{}", header).map_err(|e| e.to_string())?;
    for (time, row) in t_a.iter().zip(s.rows()) {
        let values = row
            .iter()
            .map(|v| format!("{:.6}", v))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(writer, "{}\t{}", time, values).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_similarity_matrix() {
        let s = SimMatrix::from_rows(&[vec![1.0, 0.5], vec![-0.25, 2.0]]).unwrap();
        let mut out = Vec::new();
        write_similarity_matrix(&mut out, &s, &[1.5, 2.5], &[3.0, 4.0]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "time\t3\t4\n1.5\t1.000000\t0.500000\n2.5\t-0.250000\t2.000000\n"
        );
    }

    #[test]
    fn test_write_similarity_matrix_shape_mismatch() {
        let s = SimMatrix::filled(2, 2, 0.0);
        let mut out = Vec::new();
        assert!(write_similarity_matrix(&mut out, &s, &[1.0], &[1.0, 2.0]).is_err());
    }
}
