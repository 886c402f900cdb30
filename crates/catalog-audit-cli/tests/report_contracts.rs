use std::fs;
use std::path::{Path, PathBuf};

use catalog_audit_core::{build_report, parse_rfc3339_utc, validate_products, DefectKind};
use catalog_audit_fetch::{FixtureProductSource, ProductSource};
use jsonschema::JSONSchema;
use serde_json::Value;

const LINK_BASE: &str = "https://fakestoreapi.com/products";

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .unwrap_or_else(|err| panic!("failed to canonicalize repo root: {err}"))
}

fn read_json(path: &Path) -> Value {
    let body = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    serde_json::from_str(&body)
        .unwrap_or_else(|err| panic!("failed to parse {}: {err}", path.display()))
}

fn assert_schema(schema_path: &Path, value: &Value) {
    let schema = read_json(schema_path);
    let compiled = JSONSchema::compile(&schema)
        .unwrap_or_else(|err| panic!("failed to compile {}: {err}", schema_path.display()));
    if let Some(errors) = compiled
        .validate(value)
        .err()
        .map(|iter| iter.map(|err| err.to_string()).collect::<Vec<_>>())
    {
        panic!(
            "schema validation failed for {}:\n{}",
            schema_path.display(),
            errors.join("\n")
        );
    }
}

#[test]
fn defect_report_fixture_validates_against_schema() {
    let repo = repo_root();
    let schema_path = repo.join("contracts/defect_report/v1/schemas/defect-report.schema.json");
    let fixture = read_json(&repo.join("contracts/defect_report/v1/fixtures/defect-report.sample.json"));

    assert_schema(&schema_path, &fixture);

    let defects_len = fixture["defects"].as_array().map_or(0, Vec::len);
    assert_eq!(
        fixture["test_summary"]["defective_products"],
        serde_json::json!(defects_len)
    );
}

#[test]
fn generated_report_matches_schema_and_sample_catalog() {
    let repo = repo_root();
    let source = FixtureProductSource::from_json_file(&repo.join("fixtures/catalog.sample.json"))
        .unwrap_or_else(|err| panic!("failed to load sample catalog: {err}"));
    let products = source
        .fetch_products()
        .unwrap_or_else(|err| panic!("fixture fetch failed: {err}"));

    let defects = validate_products(&products, LINK_BASE);
    let generated_at = parse_rfc3339_utc("2026-08-23T00:00:00Z")
        .unwrap_or_else(|err| panic!("bad fixture timestamp: {err}"));
    let report = build_report(products.len(), defects, generated_at)
        .unwrap_or_else(|err| panic!("failed to build report: {err}"));

    assert_eq!(report.test_summary.total_products, 5);
    assert_eq!(report.test_summary.defective_products, 2);
    assert_eq!(report.defects[0].product_id, Some(3));
    assert_eq!(report.defects[0].defects, vec![DefectKind::EmptyTitle]);
    assert_eq!(report.defects[1].product_id, Some(4));
    assert_eq!(
        report.defects[1].defects,
        vec![DefectKind::InvalidPrice, DefectKind::InvalidRating]
    );

    let value = serde_json::to_value(&report)
        .unwrap_or_else(|err| panic!("failed to serialize report: {err}"));
    assert_schema(
        &repo.join("contracts/defect_report/v1/schemas/defect-report.schema.json"),
        &value,
    );

    // The checked-in sample is the same report with a pinned timestamp.
    let fixture = read_json(&repo.join("contracts/defect_report/v1/fixtures/defect-report.sample.json"));
    assert_eq!(value, fixture);
}
