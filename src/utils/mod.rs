mod chromatogram;
mod io_utils;
mod manifest;
mod math;
mod readers;
mod util;

pub use chromatogram::Chromatogram;
pub use io_utils::create_writer;
pub use manifest::{parse_manifest, read_manifest, PairEntry};
pub use math::{l2_norm, mean, quantile};
pub use readers::open_text_reader;
pub use util::{handle_error_and_exit, Result};
