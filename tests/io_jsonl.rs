#![cfg(feature = "io-jsonl")]

use anyhow::Result;
use irontable::testing::*;
use irontable::*;
use std::fs;

#[test]
fn jsonl_file_converts_like_in_memory_records() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("calls.jsonl");
    let n = write_jsonl_records(&input, &sample_variant_records())?;
    assert_eq!(n, 3);

    let from_file = tmp.path().join("file.store");
    let from_memory = tmp.path().join("memory.store");
    let spec = presets::variant_table("snvs");
    let options = ConvertOptions::default().chunk_size(2);
    convert_to_store(&JsonlSource::new(&input), &spec, &from_file, &options)?;
    convert_to_store(&sample_variants(), &spec, &from_memory, &options)?;

    let a = TableStore::open_read(&from_file)?;
    let b = TableStore::open_read(&from_memory)?;
    assert_eq!(a.schema("snvs"), b.schema("snvs"));
    assert_eq!(a.read("snvs")?.batch(), b.read("snvs")?.batch());
    Ok(())
}

#[test]
fn blank_lines_are_skipped() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("m.jsonl");
    fs::write(
        &input,
        "\n{\"chrom\":\"1\",\"coord\":5,\"mappability\":1}\n   \n{\"chrom\":\"2\",\"coord\":6,\"mappability\":0.5}\n",
    )?;
    let out = tmp.path().join("m.store");
    let report = convert_to_store(
        &JsonlSource::new(&input),
        &presets::mappability_table("map"),
        &out,
        &ConvertOptions::default(),
    )?;
    assert_eq!(report.records, 2);
    // An integral number in a float column is stored as float.
    assert_table_column(&out, "map", "mappability", &["1.0", "0.5"]);
    Ok(())
}

#[test]
fn malformed_line_aborts_without_output() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("bad.jsonl");
    fs::write(&input, "{\"chrom\":\"1\",\"coord\":5,\"mappability\":1}\n{oops\n")?;
    let out = tmp.path().join("bad.store");
    let err = convert_to_store(
        &JsonlSource::new(&input),
        &presets::mappability_table("map"),
        &out,
        &ConvertOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, TableError::Record(_)), "{err}");
    assert!(!out.exists());
    Ok(())
}

#[test]
fn null_quality_converts_to_nan_score() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("calls.jsonl");
    fs::write(
        &input,
        "{\"chrom\":\"1\",\"coord\":100,\"ref\":\"A\",\"alt\":[\"T\"],\"qual\":null}\n\
         {\"chrom\":\"1\",\"coord\":200,\"ref\":\"G\",\"alt\":[\"C\"],\"qual\":7.5}\n",
    )?;
    let out = tmp.path().join("calls.store");
    let report = convert_to_store(
        &JsonlSource::new(&input),
        &presets::variant_table("snvs"),
        &out,
        &ConvertOptions::default(),
    )?;
    assert_eq!(report.rows, 2);
    assert_table_column(&out, "snvs", "score", &["NaN", "7.5"]);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzipped_jsonl_is_read_transparently() -> Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let tmp = tempfile::tempdir()?;
    let plain = tmp.path().join("calls.jsonl");
    write_jsonl_records(&plain, &sample_variant_records())?;
    let gz = tmp.path().join("calls.jsonl.gz");
    let mut enc = GzEncoder::new(fs::File::create(&gz)?, Compression::default());
    enc.write_all(&fs::read(&plain)?)?;
    enc.finish()?;

    let out = tmp.path().join("gz.store");
    let report = convert_to_store(
        &JsonlSource::new(&gz),
        &presets::variant_table("snvs"),
        &out,
        &ConvertOptions::default(),
    )?;
    assert_eq!(report.rows, 4);
    Ok(())
}
