use std::fs;
use std::path::Path;

use doctree_catalog::{
    assemble_catalogue, collect_records, CatalogError, CatalogueOptions, MandatoryMapping,
    MetadataSource, RecordFilter, RecordSource, SnapshotSource, Value,
};
use serde_json::json;

fn write(path: &Path, value: serde_json::Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn snapshot(root: &Path) {
    write(
        &root.join("doctypes.json"),
        json!([
            {"name": "Contract", "module": "Contracts", "istable": 0},
            {"name": "Medição do Contrato", "module": "Contracts", "istable": 0},
            {"name": "Contract Item", "module": "Contracts", "istable": 1},
            {"name": "Ledger", "module": "Accounts", "istable": 0}
        ]),
    );
    write(
        &root.join("fields/contract.json"),
        json!([
            {"fieldname": "amount", "label": "Amount", "fieldtype": "Currency", "hidden": 0},
            {"fieldname": "tab_main", "label": "Main", "fieldtype": "Tab Break", "hidden": 0},
            {"fieldname": "items", "label": "Items", "fieldtype": "Table", "options": "Contract Item", "hidden": 0}
        ]),
    );
    write(
        &root.join("fields/medicao_do_contrato.json"),
        json!([{"fieldname": "contract", "label": "Contract", "fieldtype": "Link", "options": "Contract"}]),
    );
    write(
        &root.join("fields/contract_item.json"),
        json!([{"fieldname": "qty", "label": "Qty", "fieldtype": "Int", "hidden": 0}]),
    );
    write(
        &root.join("records/contract.json"),
        json!([
            {"name": "CT-1", "creation": "2024-01-01 00:00:00", "amount": 10, "items": [{"name": "I-1", "qty": 2}]},
            {"name": "CT-2", "creation": "2024-01-02 00:00:00", "amount": 20, "items": []}
        ]),
    );
    write(
        &root.join("records/medicao_do_contrato.json"),
        json!([
            {"name": "M-1", "contract": "CT-1"},
            {"name": "M-2", "contract": "CT-2"}
        ]),
    );
}

#[test]
fn lists_types_by_module_and_child_flag() {
    let dir = tempfile::tempdir().unwrap();
    snapshot(dir.path());
    let source = SnapshotSource::open(dir.path()).unwrap();

    let parents = source.list_entity_types(Some("Contracts"), false).unwrap();
    let names: Vec<_> = parents.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Contract", "Medição do Contrato"]);

    let children = source.list_entity_types(None, true).unwrap();
    assert_eq!(children.len(), 1);
    assert!(children[0].istable);
}

#[test]
fn field_files_use_normalized_names() {
    let dir = tempfile::tempdir().unwrap();
    snapshot(dir.path());
    let source = SnapshotSource::open(dir.path()).unwrap();

    let fields = source.list_fields("Medição do Contrato", false).unwrap();
    assert_eq!(fields[0].fieldname, "contract");
    assert_eq!(fields[0].parent, None);

    let err = source.list_fields("Ledger", false).unwrap_err();
    assert!(matches!(err, CatalogError::DataUnavailable { .. }));
}

#[test]
fn keys_honour_equality_filters() {
    let dir = tempfile::tempdir().unwrap();
    snapshot(dir.path());
    let source = SnapshotSource::open(dir.path()).unwrap();

    let all = source.list_keys("Medição do Contrato", &[]).unwrap();
    assert_eq!(all, ["M-1", "M-2"]);

    let filtered = source
        .list_keys(
            "Medição do Contrato",
            &[RecordFilter {
                field: "contract".into(),
                value: json!("CT-2"),
            }],
        )
        .unwrap();
    assert_eq!(filtered, ["M-2"]);

    assert!(source.list_keys("Contract Item", &[]).unwrap().is_empty());
    assert!(source.get_record("Contract", "CT-9").is_err());
}

#[test]
fn assembles_catalogue_and_store_from_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    snapshot(dir.path());
    let source = SnapshotSource::open(dir.path()).unwrap();
    let options = CatalogueOptions {
        module: Some("Contracts".into()),
        ignored_entity_types: vec![],
    };

    let mut lines: Vec<String> = Vec::new();
    let catalogue = assemble_catalogue(&source, &options, &mut lines).unwrap();
    let names: Vec<_> = catalogue.names().collect();
    assert_eq!(names, ["Contract", "Medição do Contrato", "Contract Item"]);
    assert_eq!(catalogue.fields("Contract").unwrap().len(), 2);

    let mappings = vec![MandatoryMapping::new("Medição do Contrato", "Contract")];
    let store = collect_records(&source, &catalogue, &mappings, &mut lines).unwrap();
    assert_eq!(store.get("Contract").len(), 2);
    assert_eq!(store.get("Contract")[0].table("items").len(), 1);
    assert_eq!(store.get("Medição do Contrato").len(), 2);
    assert!(lines.iter().any(|l| l == "fetched 2 records of Contract"));
}

#[test]
fn missing_directory_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = SnapshotSource::open(dir.path().join("absent")).unwrap_err();
    assert!(err.is_retryable());
}

#[test]
fn records_are_looked_up_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<_> = (0..500)
        .map(|i| json!({"name": format!("L-{i}"), "amount": i}))
        .chain([
            json!({"name": "L-7", "amount": -1}),
            json!({"amount": 99}),
        ])
        .collect();
    write(&dir.path().join("records/ledger.json"), json!(rows));
    let source = SnapshotSource::open(dir.path()).unwrap();

    let keys = source.list_keys("Ledger", &[]).unwrap();
    assert_eq!(keys.len(), 500);
    assert_eq!(keys[0], "L-0");
    assert_eq!(keys[499], "L-499");

    let record = source.get_record("Ledger", "L-7").unwrap();
    assert_eq!(record.value_of("amount"), Value::Int(7));
    assert_eq!(
        source.get_record("Ledger", "L-499").unwrap().value_of("amount"),
        Value::Int(499)
    );
    assert!(source.get_record("Ledger", "L-500").is_err());
}
