use std::path::Path;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum AuditError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("report error: {0}")]
    Report(String),
}

/// One product record as returned by the catalog endpoint.
///
/// Every field is optional: the validator treats absent fields as
/// violations, so decoding must not reject records with missing keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Product {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub rating: Option<Rating>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Rating {
    #[serde(default)]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum DefectKind {
    #[serde(rename = "Empty title")]
    EmptyTitle,
    #[serde(rename = "Invalid price")]
    InvalidPrice,
    #[serde(rename = "Invalid rating")]
    InvalidRating,
}

impl DefectKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyTitle => "Empty title",
            Self::InvalidPrice => "Invalid price",
            Self::InvalidRating => "Invalid rating",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Empty title" => Some(Self::EmptyTitle),
            "Invalid price" => Some(Self::InvalidPrice),
            "Invalid rating" => Some(Self::InvalidRating),
            _ => None,
        }
    }
}

/// Per-record defect grouping produced by the validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefectEntry {
    pub product_id: Option<i64>,
    pub title: Option<String>,
    pub defects: Vec<DefectKind>,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ReportSummary {
    pub total_products: usize,
    pub defective_products: usize,
    pub test_timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefectReport {
    pub test_summary: ReportSummary,
    pub defects: Vec<DefectEntry>,
}

/// Evaluates the three catalog predicates for a single record.
///
/// Violations are data, not errors: the returned list is empty for a
/// clean record. Label order is stable (title, price, rating).
#[must_use]
pub fn validate_product(product: &Product) -> Vec<DefectKind> {
    let mut defects = Vec::new();

    match product.title.as_deref() {
        Some(title) if !title.is_empty() => {}
        _ => defects.push(DefectKind::EmptyTitle),
    }

    match product.price {
        Some(price) if price >= 0.0 => {}
        _ => defects.push(DefectKind::InvalidPrice),
    }

    // No lower bound on the rate: negative ratings pass. Current behavior,
    // kept as-is.
    match product.rating.as_ref().and_then(|rating| rating.rate) {
        Some(rate) if rate <= 5.0 => {}
        _ => defects.push(DefectKind::InvalidRating),
    }

    defects
}

/// Runs the validator over a fetched record sequence.
///
/// Each record with at least one violated predicate yields one
/// [`DefectEntry`] carrying all of its labels; clean records yield nothing.
#[must_use]
pub fn validate_products(products: &[Product], link_base: &str) -> Vec<DefectEntry> {
    products
        .iter()
        .filter_map(|product| {
            let defects = validate_product(product);
            if defects.is_empty() {
                return None;
            }
            Some(DefectEntry {
                product_id: product.id,
                title: product.title.clone(),
                defects,
                link: product_link(link_base, product.id),
            })
        })
        .collect()
}

/// Builds the per-product hyperlink carried in the defect report.
#[must_use]
pub fn product_link(link_base: &str, id: Option<i64>) -> String {
    let base = link_base.trim_end_matches('/');
    match id {
        Some(id) => format!("{base}/{id}"),
        None => format!("{base}/unknown"),
    }
}

/// Assembles the defect report from the validator output.
///
/// The summary counts are derived from the inputs, so
/// `defective_products == defects.len()` holds by construction. The
/// timestamp is captured at report-generation time, not fetch time.
///
/// # Errors
/// Returns [`AuditError::Report`] when the timestamp cannot be formatted.
pub fn build_report(
    total_products: usize,
    defects: Vec<DefectEntry>,
    generated_at: OffsetDateTime,
) -> Result<DefectReport, AuditError> {
    Ok(DefectReport {
        test_summary: ReportSummary {
            total_products,
            defective_products: defects.len(),
            test_timestamp: format_rfc3339(generated_at)?,
        },
        defects,
    })
}

/// Serializes the report as pretty JSON, overwriting any prior file.
///
/// # Errors
/// Returns [`AuditError::Report`] when serialization or the write fails.
pub fn write_report(report: &DefectReport, path: &Path) -> Result<(), AuditError> {
    let serialized = serde_json::to_string_pretty(report)
        .map_err(|err| AuditError::Report(format!("failed to serialize defect report: {err}")))?;
    std::fs::write(path, serialized).map_err(|err| {
        AuditError::Report(format!(
            "failed to write defect report to {}: {err}",
            path.display()
        ))
    })
}

/// Parses an RFC3339 timestamp and requires UTC (`Z`) offset.
///
/// # Errors
/// Returns [`AuditError::Decode`] when parsing fails or the input
/// timestamp is not UTC.
pub fn parse_rfc3339_utc(value: &str) -> Result<OffsetDateTime, AuditError> {
    let parsed = OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .map_err(|err| AuditError::Decode(format!("invalid RFC3339 timestamp: {err}")))?;

    if parsed.offset() != UtcOffset::UTC {
        return Err(AuditError::Decode(
            "timestamp MUST use UTC offset Z".to_string(),
        ));
    }

    Ok(parsed)
}

/// Formats a timestamp as RFC3339 after normalizing to UTC.
///
/// # Errors
/// Returns [`AuditError::Report`] when formatting fails.
pub fn format_rfc3339(value: OffsetDateTime) -> Result<String, AuditError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|err| AuditError::Report(format!("failed to format RFC3339 timestamp: {err}")))
}

#[must_use]
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(UtcOffset::UTC)
}
