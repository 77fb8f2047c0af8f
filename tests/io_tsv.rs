#![cfg(feature = "io-tsv")]

use anyhow::Result;
use irontable::testing::*;
use irontable::*;
use std::fs;

#[test]
fn export_writes_header_and_canonical_cells() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = tmp.path().join("calls.store");
    convert_to_store(
        &sample_variants(),
        &presets::variant_table("snvs"),
        &store,
        &ConvertOptions::default().chunk_size(2),
    )?;

    let out = tmp.path().join("snvs.tsv");
    let rows = export_tsv(&store, "snvs", &out, &TsvOptions::default())?;
    assert_eq!(rows, 4);
    let text = fs::read_to_string(&out)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "chrom\tcoord\tref\talt\tscore",
            "1\t100\tA\tT\t30.0",
            "1\t200\tG\tC\t12.5",
            "1\t200\tG\tG\t12.5",
            "1\t300\tC\tA\t99.0",
        ]
    );
    Ok(())
}

#[test]
fn export_with_index_column() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = tmp.path().join("libs.store");
    convert_to_store(
        &sample_breakpoint_libraries(),
        &presets::breakpoint_library_table("libraries"),
        &store,
        &ConvertOptions::default().chunk_size(1),
    )?;

    let out = tmp.path().join("out/libraries.tsv");
    let options = TsvOptions {
        index: true,
        ..TsvOptions::default()
    };
    export_tsv(&store, "libraries", &out, &options)?;
    let text = fs::read_to_string(&out)?;
    let first_cells: Vec<&str> = text
        .lines()
        .map(|l| l.split('\t').next().unwrap_or_default())
        .collect();
    assert_eq!(first_cells, vec!["index", "0", "1", "2"]);
    Ok(())
}

#[test]
fn unknown_table_is_an_error() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = tmp.path().join("calls.store");
    convert_to_store(
        &sample_variants(),
        &presets::variant_table("snvs"),
        &store,
        &ConvertOptions::default(),
    )?;
    let err = export_tsv(&store, "nope", tmp.path().join("x.tsv"), &TsvOptions::default())
        .unwrap_err();
    assert!(matches!(err, TableError::InvalidArgument(_)), "{err}");
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_export_by_extension() -> Result<()> {
    use std::io::Read;

    let tmp = tempfile::tempdir()?;
    let store = tmp.path().join("calls.store");
    convert_to_store(
        &sample_variants(),
        &presets::variant_table("snvs"),
        &store,
        &ConvertOptions::default(),
    )?;
    let out = tmp.path().join("snvs.tsv.gz");
    export_tsv(&store, "snvs", &out, &TsvOptions::default())?;

    let mut text = String::new();
    flate2::read::GzDecoder::new(fs::File::open(&out)?).read_to_string(&mut text)?;
    assert_eq!(text.lines().count(), 5);
    assert!(text.starts_with("chrom\tcoord"));
    Ok(())
}
