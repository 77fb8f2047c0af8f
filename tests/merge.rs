use anyhow::Result;
use irontable::io::glob::{expand_glob, expand_glob_required};
use irontable::testing::*;
use irontable::*;
use std::path::{Path, PathBuf};

fn build(dir: &Path, name: &str, spec: &TableSpec, records: Vec<Record>) -> Result<PathBuf> {
    let out = dir.join(format!("{name}.store"));
    convert_to_store(&VecSource::new(records), spec, &out, &ConvertOptions::default())?;
    Ok(out)
}

fn chrom_score(chrom: ColumnSpec) -> TableSpec {
    TableSpec::new("T", vec![chrom, ColumnSpec::float("score")])
}

fn row(chrom: &str, score: f64) -> Record {
    Record::new().with("chrom", chrom).with("score", score)
}

#[test]
fn merge_widens_text_to_longest_input() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let spec = chrom_score(ColumnSpec::text("chrom"));
    let a = build(tmp.path(), "a", &spec, vec![row("X", 0.5)])?;
    let b = build(tmp.path(), "b", &spec, vec![row("chr1", 1.2)])?;

    let registry = reconcile_widths(&[&a, &b])?;
    assert_eq!(registry.get("T", "chrom"), Some(4));
    assert_eq!(registry.get("T", "score"), None);

    let out = tmp.path().join("merged.store");
    let report = concatenate_stores(&[&a, &b], &out, &registry)?;
    assert_eq!(report.inputs, 2);
    assert_eq!(report.tables.get("T"), Some(&2));

    assert_table_column(&out, "T", "chrom", &["X", "chr1"]);
    assert_table_column(&out, "T", "score", &["0.5", "1.2"]);
    let store = TableStore::open_read(&out)?;
    assert_eq!(
        store.schema("T").expect("table").column("chrom").expect("column").layout,
        ColumnLayout::Text { width: 4 }
    );
    Ok(())
}

#[test]
fn category_and_text_columns_merge_as_text() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let a = build(
        tmp.path(),
        "a",
        &chrom_score(ColumnSpec::category("chrom")),
        vec![row("1", 1.0), row("22", 2.0)],
    )?;
    let b = build(
        tmp.path(),
        "b",
        &chrom_score(ColumnSpec::text("chrom")),
        vec![row("MT", 3.0)],
    )?;

    let out = tmp.path().join("merged.store");
    merge_stores(&[&a, &b], &out)?;
    assert_table_column(&out, "T", "chrom", &["1", "22", "MT"]);
    let store = TableStore::open_read(&out)?;
    assert_eq!(
        store.schema("T").expect("table").column("chrom").expect("column").layout,
        ColumnLayout::Text { width: 2 }
    );
    Ok(())
}

#[test]
fn integer_and_float_columns_merge_as_float() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let a = build(
        tmp.path(),
        "a",
        &TableSpec::new("T", vec![ColumnSpec::int("depth")]),
        vec![Record::new().with("depth", 7i64)],
    )?;
    let b = build(
        tmp.path(),
        "b",
        &TableSpec::new("T", vec![ColumnSpec::float("depth")]),
        vec![Record::new().with("depth", 2.5)],
    )?;

    let out = tmp.path().join("merged.store");
    merge_stores(&[&a, &b], &out)?;
    let table = TableStore::open_read(&out)?.read("T")?;
    assert_eq!(table.values("depth")?, vec![Value::Float(7.0), Value::Float(2.5)]);
    Ok(())
}

#[test]
fn merge_keeps_input_then_row_order_and_row_groups() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let spec = presets::variant_table("snvs");
    let mut stores = Vec::new();
    for chrom in ["2", "10", "1"] {
        let out = tmp.path().join(format!("{chrom}.store"));
        convert_to_store(
            &variants_on(&[chrom], 3),
            &spec,
            &out,
            &ConvertOptions::default().chunk_size(2),
        )?;
        stores.push((chrom.parse::<u32>()?, out));
    }

    let inputs = sorted_inputs(stores);
    let out = tmp.path().join("merged.store");
    let report = merge_stores(&inputs, &out)?;
    assert_eq!(report.tables.get("snvs"), Some(&9));

    assert_table_column(
        &out,
        "snvs",
        "chrom",
        &["1", "1", "1", "2", "2", "2", "10", "10", "10"],
    );
    assert_table_column(
        &out,
        "snvs",
        "coord",
        &["10", "20", "30", "10", "20", "30", "10", "20", "30"],
    );
    assert_row_groups(&out, "snvs", &[2, 1, 2, 1, 2, 1]);
    Ok(())
}

#[test]
fn tables_missing_from_some_inputs_are_still_merged() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let a = build(
        tmp.path(),
        "a",
        &chrom_score(ColumnSpec::text("chrom")),
        vec![row("1", 1.0)],
    )?;
    let b = build(
        tmp.path(),
        "b",
        &presets::mappability_table("map"),
        vec![
            Record::new()
                .with("chrom", "1")
                .with("coord", 5i64)
                .with("mappability", 0.25),
        ],
    )?;

    let out = tmp.path().join("merged.store");
    merge_stores(&[&a, &b], &out)?;
    let store = TableStore::open_read(&out)?;
    assert_eq!(store.list_tables(), vec!["T".to_string(), "map".to_string()]);
    assert_eq!(store.num_rows("T"), Some(1));
    assert_eq!(store.num_rows("map"), Some(1));
    Ok(())
}

#[test]
fn tables_empty_everywhere_get_zero_width() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let spec = chrom_score(ColumnSpec::text("chrom"));
    let a = build(tmp.path(), "a", &spec, Vec::new())?;
    let b = build(tmp.path(), "b", &spec, Vec::new())?;

    let registry = reconcile_widths(&[&a, &b])?;
    assert_eq!(registry.get("T", "chrom"), Some(0));

    let out = tmp.path().join("merged.store");
    let report = concatenate_stores(&[&a, &b], &out, &registry)?;
    assert_eq!(report.tables.get("T"), Some(&0));
    let store = TableStore::open_read(&out)?;
    assert_eq!(store.num_rows("T"), Some(0));
    Ok(())
}

#[test]
fn differing_column_sets_are_a_schema_mismatch() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let a = build(
        tmp.path(),
        "a",
        &chrom_score(ColumnSpec::text("chrom")),
        vec![row("1", 1.0)],
    )?;
    let b = build(
        tmp.path(),
        "b",
        &TableSpec::new("T", vec![ColumnSpec::text("chrom")]),
        vec![Record::new().with("chrom", "2")],
    )?;

    let out = tmp.path().join("merged.store");
    let err = merge_stores(&[&a, &b], &out).unwrap_err();
    assert!(matches!(err, TableError::SchemaMismatch { .. }), "{err}");
    assert!(!out.exists());
    Ok(())
}

#[test]
fn undersized_registry_is_a_width_overflow() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let spec = chrom_score(ColumnSpec::text("chrom"));
    let a = build(tmp.path(), "a", &spec, vec![row("X", 0.5)])?;
    let b = build(tmp.path(), "b", &spec, vec![row("chr1", 1.2)])?;

    // Widths measured on the first input only.
    let registry = reconcile_widths(&[&a])?;
    let out = tmp.path().join("merged.store");
    let err = concatenate_stores(&[&a, &b], &out, &registry).unwrap_err();
    assert!(
        matches!(&err, TableError::WidthOverflow { width: 1, len: 4, .. }),
        "{err}"
    );
    assert!(!out.exists());
    Ok(())
}

#[test]
fn missing_registry_entry_is_a_schema_mismatch() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let spec = chrom_score(ColumnSpec::text("chrom"));
    let a = build(tmp.path(), "a", &spec, vec![row("X", 0.5)])?;

    let out = tmp.path().join("merged.store");
    let err = concatenate_stores(&[&a], &out, &WidthRegistry::new()).unwrap_err();
    assert!(matches!(err, TableError::SchemaMismatch { .. }), "{err}");
    Ok(())
}

#[test]
fn merged_store_replaces_existing_output() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let spec = chrom_score(ColumnSpec::text("chrom"));
    let a = build(tmp.path(), "a", &spec, vec![row("X", 0.5)])?;
    let b = build(tmp.path(), "b", &spec, vec![row("Y", 1.5)])?;

    let out = tmp.path().join("merged.store");
    merge_stores(&[&a], &out)?;
    merge_stores(&[&a, &b], &out)?;
    assert_table_column(&out, "T", "chrom", &["X", "Y"]);
    Ok(())
}

#[test]
fn glob_finds_published_stores_only() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let spec = chrom_score(ColumnSpec::text("chrom"));
    build(tmp.path(), "part_b", &spec, vec![row("2", 1.0)])?;
    build(tmp.path(), "part_a", &spec, vec![row("1", 1.0)])?;
    std::fs::create_dir(tmp.path().join("part_c.store"))?;
    std::fs::write(tmp.path().join("part_d.store"), b"not a store")?;

    let pattern = format!("{}/part_*.store", tmp.path().display());
    let found = expand_glob(&pattern)?;
    assert_eq!(
        found,
        vec![tmp.path().join("part_a.store"), tmp.path().join("part_b.store")]
    );

    let out = tmp.path().join("merged.store");
    merge_stores(&found, &out)?;
    assert_table_column(&out, "T", "chrom", &["1", "2"]);

    let none = format!("{}/nothing_*.store", tmp.path().display());
    assert!(expand_glob_required(&none).is_err());
    Ok(())
}
