//! CSV output of sweep results.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::DataPoint;

/// Header row of the results file.
pub const CSV_HEADER: &str = "Committee size, avg waiting time (ticks)";

/// Write one row per data point.
pub fn write_csv<W: Write>(mut out: W, points: &[DataPoint]) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for point in points {
        writeln!(out, "{}, {}", point.committee_count, point.avg_waiting_ticks)?;
    }
    out.flush()
}

/// Write the results file at `path`, replacing any existing file.
pub fn write_csv_file(path: impl AsRef<Path>, points: &[DataPoint]) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), points)
}
