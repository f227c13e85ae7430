/// Writes report rows as comma separated values
use std::{io, path::Path};

use anyhow::Context;
use csv::WriterBuilder;

use crate::records::ReportRow;

/// Writes the header and `rows` into the file at `path`, replacing it
/// A failure midway leaves a partial file behind
pub fn write_report<P: AsRef<Path>, R: ReportRow>(path: P, rows: &[R]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;

    write_rows(file, rows).with_context(|| format!("Cannot write {}", path.display()))
}

/// The header is written even when there are no rows
pub fn write_rows<W: io::Write, R: ReportRow>(writer: W, rows: &[R]) -> anyhow::Result<()> {
    // headers come from `R::COLUMNS`, serde would skip them for an empty report
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    csv_writer.write_record(R::COLUMNS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;

    Ok(())
}
