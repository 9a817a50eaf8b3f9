use crate::utils::{open_text_reader, Result};
use std::{io::BufRead, path::Path};

/// A group of extracted-ion chromatograms sharing one retention-time axis.
#[derive(Debug, PartialEq, Clone)]
pub struct Chromatogram {
    pub time: Vec<f64>,
    pub channels: Vec<Vec<f64>>,
    pub names: Vec<String>,
}

impl Chromatogram {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_text_reader(path)?;
        Self::from_reader(reader).map_err(|e| format!("{}: {}", path.display(), e))
    }

    /// Parses a tab- or space-separated table: a header naming the time
    /// column and every channel, then one row per time point. Blank lines and
    /// lines starting with `#` are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut names: Option<Vec<String>> = None;
        let mut time = Vec::new();
        let mut channels: Vec<Vec<f64>> = Vec::new();

        for (line_number, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if names.is_none() {
                let header: Vec<String> = line.split_whitespace().map(str::to_string).collect();
                if header.len() < 2 {
                    return Err(format!(
                        "Header at line {} needs a time column and at least one channel",
                        line_number + 1
                    ));
                }
                channels = vec![Vec::new(); header.len() - 1];
                names = Some(header[1..].to_vec());
                continue;
            }

            let values = line
                .split_whitespace()
                .map(|field| {
                    field.parse::<f64>().map_err(|e| {
                        format!("Invalid value '{}' at line {}: {}", field, line_number + 1, e)
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            if values.len() != channels.len() + 1 {
                return Err(format!(
                    "Expected {} columns at line {}, found {}",
                    channels.len() + 1,
                    line_number + 1,
                    values.len()
                ));
            }
            if let Some(&last) = time.last() {
                if values[0] <= last {
                    return Err(format!(
                        "Retention time must increase, line {} has {} after {}",
                        line_number + 1,
                        values[0],
                        last
                    ));
                }
            }
            time.push(values[0]);
            for (channel, value) in channels.iter_mut().zip(&values[1..]) {
                channel.push(*value);
            }
        }

        let names = names.ok_or("Chromatogram has no header")?;
        if time.is_empty() {
            return Err("Chromatogram has no time points".into());
        }
        Ok(Self {
            time,
            channels,
            names,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}
