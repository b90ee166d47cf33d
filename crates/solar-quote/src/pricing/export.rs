use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::catalog::FlatVariant;

#[derive(Debug)]
pub enum CatalogExportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for CatalogExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogExportError::Io(err) => write!(f, "failed to write catalog export: {}", err),
            CatalogExportError::Csv(err) => write!(f, "failed to encode catalog export: {}", err),
        }
    }
}

impl std::error::Error for CatalogExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogExportError::Io(err) => Some(err),
            CatalogExportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CatalogExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Write flat option records as CSV with a camelCase header row.
pub fn write_csv<W: Write>(writer: W, records: &[FlatVariant]) -> Result<(), CatalogExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_to_path<P: AsRef<Path>>(
    path: P,
    records: &[FlatVariant],
) -> Result<usize, CatalogExportError> {
    let file = File::create(path)?;
    write_csv(file, records)?;
    Ok(records.len())
}
