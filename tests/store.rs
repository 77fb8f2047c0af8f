use anyhow::Result;
use irontable::testing::*;
use irontable::*;
use std::sync::Arc;

fn text_schema(width: usize) -> Arc<TableSchema> {
    Arc::new(TableSchema::new(vec![
        StoredColumn {
            name: "id".into(),
            layout: ColumnLayout::Text { width },
        },
        StoredColumn {
            name: "n".into(),
            layout: ColumnLayout::Numeric {
                numeric: NumericType::Int64,
            },
        },
    ]))
}

fn group(schema: &Arc<TableSchema>, ids: &[&str], ns: &[i64]) -> Result<RowGroup> {
    Ok(RowGroup::try_new(
        "t",
        Arc::clone(schema),
        vec![
            ColumnValues::Text(ids.iter().map(ToString::to_string).collect()),
            ColumnValues::Int(ns.to_vec()),
        ],
    )?)
}

#[test]
fn append_reports_first_row_and_reads_back_by_group() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("s.store");
    let schema = text_schema(3);

    let mut store = TableStore::create(&path)?;
    assert_eq!(store.append("t", &group(&schema, &["a", "bb"], &[1, 2])?)?, 0);
    assert_eq!(store.append("t", &group(&schema, &["ccc"], &[3])?)?, 2);
    assert!(!path.exists(), "nothing is visible before close");
    store.close()?;

    let store = TableStore::open_read(&path)?;
    assert_eq!(store.num_rows("t"), Some(3));
    let second = store.read_row_group("t", 1)?;
    assert_eq!(second.column_text("id")?, vec!["ccc".to_string()]);
    assert!(store.read_row_group("t", 2).is_err());

    let all = store.read("t")?;
    assert_eq!(all.row_group_sizes(), &[2, 1]);
    assert_eq!(all.values("n")?, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    Ok(())
}

#[test]
fn append_checks_columns_and_widths() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let mut store = TableStore::create(tmp.path().join("s.store"))?;
    store.append("t", &group(&text_schema(2), &["ab"], &[1])?)?;

    // Wider schema is accepted, but each value must fit the stored width.
    let wide = text_schema(5);
    let err = store.append("t", &group(&wide, &["abcde"], &[2])?).unwrap_err();
    assert!(matches!(err, TableError::WidthOverflow { width: 2, .. }), "{err}");
    store.append("t", &group(&wide, &["cd"], &[3])?)?;

    let other = Arc::new(TableSchema::new(vec![StoredColumn {
        name: "id".into(),
        layout: ColumnLayout::Text { width: 2 },
    }]));
    let only_id = RowGroup::try_new("t", other, vec![ColumnValues::Text(vec!["x".into()])])?;
    let err = store.append("t", &only_id).unwrap_err();
    assert!(matches!(err, TableError::SchemaMismatch { .. }), "{err}");
    Ok(())
}

#[test]
fn row_group_rejects_overlong_text_and_bad_codes() {
    let err = RowGroup::try_new(
        "t",
        text_schema(1),
        vec![
            ColumnValues::Text(vec!["xy".into()]),
            ColumnValues::Int(vec![1]),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, TableError::WidthOverflow { len: 2, .. }));

    let schema = Arc::new(TableSchema::new(vec![StoredColumn {
        name: "chrom".into(),
        layout: ColumnLayout::Category {
            domain: CategoryDomain::from_values(["1", "2"]),
        },
    }]));
    let err = RowGroup::try_new("t", schema, vec![ColumnValues::Codes(vec![0, 2])]).unwrap_err();
    assert!(matches!(err, TableError::DomainViolation { .. }));
}

#[test]
fn read_only_stores_refuse_appends() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("s.store");
    convert_to_store(
        &sample_variants(),
        &presets::variant_table("snvs"),
        &path,
        &ConvertOptions::default(),
    )?;
    let mut store = TableStore::open_read(&path)?;
    let schema = text_schema(1);
    let err = store.append("t", &group(&schema, &["a"], &[1])?).unwrap_err();
    assert!(matches!(err, TableError::InvalidArgument(_)));
    drop(store);
    assert!(path.exists(), "dropping a reader keeps the store");
    Ok(())
}

#[test]
fn dropping_an_unclosed_store_publishes_nothing() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("s.store");
    let mut store = TableStore::create(&path)?;
    store.append("t", &group(&text_schema(1), &["a"], &[1])?)?;
    drop(store);
    assert!(!path.exists());
    assert!(!store::staging_path_of(&path).expect("staging").exists());
    Ok(())
}

#[test]
fn append_mode_extends_published_tables() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("s.store");
    let schema = text_schema(3);

    let mut store = TableStore::create(&path)?;
    store.append("t", &group(&schema, &["a"], &[1])?)?;
    store.append("u", &group(&schema, &["u"], &[9])?)?;
    store.close()?;

    let mut store = TableStore::open(&path, OpenMode::Append)?;
    assert_eq!(store.num_rows("t"), Some(1));
    assert_eq!(store.append("t", &group(&schema, &["b", "c"], &[2, 3])?)?, 1);
    // Tables this session does not touch stay readable.
    assert_eq!(store.read("u")?.num_rows(), 1);
    store.close()?;

    let store = TableStore::open_read(&path)?;
    let t = store.read("t")?;
    assert_eq!(t.column_text("id")?, vec!["a", "b", "c"]);
    assert_eq!(t.row_group_sizes(), &[1, 2]);
    assert_eq!(store.num_rows("u"), Some(1));
    Ok(())
}

#[test]
fn manifest_records_layouts() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("s.store");
    convert_to_store(
        &sample_variants(),
        &presets::variant_table("snvs"),
        &path,
        &ConvertOptions::default(),
    )?;
    let text = std::fs::read_to_string(path.join(store::MANIFEST_FILE))?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    let chrom = &json["tables"]["snvs"]["schema"]["columns"][0];
    assert_eq!(chrom["name"], "chrom");
    assert_eq!(chrom["kind"], "category");
    assert_eq!(chrom["domain"], serde_json::json!(["1"]));
    Ok(())
}
