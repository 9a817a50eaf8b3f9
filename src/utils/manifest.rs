use crate::utils::{open_text_reader, Result};
use std::{
    collections::HashSet,
    io::BufRead,
    path::{Path, PathBuf},
};

/// One pair of chromatogram files to align.
#[derive(Debug, PartialEq, Clone)]
pub struct PairEntry {
    pub id: String,
    pub path_a: PathBuf,
    pub path_b: PathBuf,
    /// Predicted B retention times of the first and last A time points.
    pub prediction: Option<(f64, f64)>,
}

pub fn read_manifest(path: &Path) -> Result<Vec<PairEntry>> {
    let reader = open_text_reader(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_manifest(reader, base_dir).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Parses `id path_a path_b [b1p b2p]` lines. Relative paths are resolved
/// against `base_dir`.
pub fn parse_manifest<R: BufRead>(reader: R, base_dir: &Path) -> Result<Vec<PairEntry>> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let prediction = match fields.len() {
            3 => None,
            5 => {
                let parse = |field: &str| {
                    field.parse::<f64>().map_err(|e| {
                        format!(
                            "Invalid predicted time '{}' at line {}: {}",
                            field,
                            line_number + 1,
                            e
                        )
                    })
                };
                Some((parse(fields[3])?, parse(fields[4])?))
            }
            n => {
                return Err(format!(
                    "Expected 3 or 5 fields at line {}, found {}",
                    line_number + 1,
                    n
                ))
            }
        };

        let id = fields[0].to_string();
        if !seen.insert(id.clone()) {
            return Err(format!(
                "Duplicate pair id at line {}: {}",
                line_number + 1,
                id
            ));
        }
        entries.push(PairEntry {
            id,
            path_a: base_dir.join(fields[1]),
            path_b: base_dir.join(fields[2]),
            prediction,
        });
    }

    if entries.is_empty() {
        return Err("Manifest lists no chromatogram pairs".into());
    }
    Ok(entries)
}
