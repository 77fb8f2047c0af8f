//! Tab-separated export of stored tables.
//!
//! Downstream tools that cannot read the columnar store take a TSV dump of a
//! table: a header row with the column names, then one line per row in
//! stored order. Every cell is written in its canonical text form, so an
//! exported category or merged text column reads exactly as it was scanned.

use crate::error::{Result, TableError};
use crate::store::TableStore;
use csv::WriterBuilder;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Options for [`export_tsv`].
#[derive(Clone, Debug, Default)]
pub struct TsvOptions {
    /// Prepend a 0-based row index column named `index`.
    pub index: bool,
    /// Gzip the output. Also implied by a `.gz` output path.
    pub compress: bool,
}

/// Export one table of a published store as TSV. Returns the number of data rows.
///
/// The table is read one row group at a time.
///
/// # Errors
/// Returns an error if the store or table cannot be read, or the output
/// cannot be written.
pub fn export_tsv(
    store_path: impl AsRef<Path>,
    table: &str,
    out: impl AsRef<Path>,
    options: &TsvOptions,
) -> Result<u64> {
    let store = TableStore::open_read(store_path)?;
    if !store.contains(table) {
        return Err(TableError::InvalidArgument(format!(
            "no table `{table}` in store {}",
            store.path().display()
        )));
    }
    let out = out.as_ref();
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(|e| TableError::io(parent, e))?;
    }
    let file = File::create(out).map_err(|e| TableError::io(out, e))?;
    let compress = options.compress || super::compression::is_gzip_path(out);

    let rows = if compress {
        write_gzip(&store, table, file, options, out)?
    } else {
        let (mut file, rows) = write_rows(&store, table, file, options, out)?;
        file.flush().map_err(|e| TableError::io(out, e))?;
        rows
    };
    info!(table, rows, out = %out.display(), "exported table");
    Ok(rows)
}

#[cfg(feature = "compression-gzip")]
fn write_gzip(
    store: &TableStore,
    table: &str,
    file: File,
    options: &TsvOptions,
    out: &Path,
) -> Result<u64> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    let (encoder, rows) = write_rows(
        store,
        table,
        GzEncoder::new(file, Compression::default()),
        options,
        out,
    )?;
    encoder.finish().map_err(|e| TableError::io(out, e))?;
    Ok(rows)
}

#[cfg(not(feature = "compression-gzip"))]
fn write_gzip(
    _store: &TableStore,
    _table: &str,
    _file: File,
    _options: &TsvOptions,
    out: &Path,
) -> Result<u64> {
    Err(TableError::InvalidArgument(format!(
        "cannot gzip {}: the `compression-gzip` feature is disabled",
        out.display()
    )))
}

fn write_rows<W: Write>(
    store: &TableStore,
    table: &str,
    sink: W,
    options: &TsvOptions,
    out: &Path,
) -> Result<(W, u64)> {
    let schema = store
        .schema(table)
        .ok_or_else(|| TableError::InvalidArgument(format!("no table `{table}` in store")))?;
    let groups = store.entry(table).map_or(0, |e| e.row_groups.len());

    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(sink);
    let mut header: Vec<&str> = Vec::with_capacity(schema.columns.len() + 1);
    if options.index {
        header.push("index");
    }
    header.extend(schema.names());
    wtr.write_record(&header)?;

    let mut row: u64 = 0;
    for index in 0..groups {
        let chunk = store.read_row_group(table, index)?;
        let columns = schema
            .columns
            .iter()
            .map(|c| chunk.column_text(&c.name))
            .collect::<Result<Vec<_>>>()?;
        for i in 0..chunk.num_rows() {
            if options.index {
                wtr.write_field(row.to_string())?;
            }
            for column in &columns {
                wtr.write_field(&column[i])?;
            }
            wtr.write_record(None::<&[u8]>)?;
            row += 1;
        }
    }
    let sink = wtr
        .into_inner()
        .map_err(|e| TableError::io(out, e.into_error()))?;
    Ok((sink, row))
}
