use crate::utils::Result;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

/// Buffered writer to `output_path`, or to stdout when no path is given.
pub fn create_writer(output_path: Option<&str>) -> Result<BufWriter<Box<dyn Write + Send>>> {
    let sink: Box<dyn Write + Send> = match output_path {
        Some(path) => Box::new(
            File::create(path).map_err(|e| format!("Failed to create {}: {}", path, e))?,
        ),
        None => Box::new(io::stdout()),
    };
    Ok(BufWriter::new(sink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_writer_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let path_str = path.to_str().unwrap();
        {
            let mut writer = create_writer(Some(path_str)).unwrap();
            writeln!(writer, "idx_a\tidx_b").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "idx_a\tidx_b\n");
    }

    #[test]
    fn test_create_writer_bad_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.tsv");
        assert!(create_writer(path.to_str()).is_err());
    }
}
