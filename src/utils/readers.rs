use super::Result;
use flate2::bufread::MultiGzDecoder;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub type TextReader = Box<dyn BufRead>;

/// Opens a chromatogram or manifest file. Gzip input is recognised by its
/// magic bytes; a `.gz` name on a file without them is an error.
pub fn open_text_reader(path: &Path) -> Result<TextReader> {
    let file = File::open(path).map_err(|e| format!("File {}: {}", path.display(), e))?;
    let mut reader = BufReader::new(file);
    let is_gzipped = reader
        .fill_buf()
        .map_err(|e| format!("File {}: {}", path.display(), e))?
        .starts_with(&GZIP_MAGIC);

    if is_gzipped {
        return Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))));
    }
    let named_gz = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if named_gz {
        return Err(format!("{} is not gzip-compressed", path.display()));
    }
    Ok(Box::new(reader))
}
