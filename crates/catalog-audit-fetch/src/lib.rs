//! Product data sources for the catalog audit.
//!
//! The pipeline consumes products through [`ProductSource`] so the live
//! HTTP endpoint can be swapped for a recorded fixture in tests.

use std::path::Path;

use catalog_audit_core::{AuditError, Product};
use tracing::{error, info};

pub trait ProductSource {
    /// Retrieves the full product collection in one attempt.
    ///
    /// # Errors
    /// Returns [`AuditError::Transport`] for network or non-success status
    /// failures and [`AuditError::Decode`] when the payload is not a JSON
    /// product array.
    fn fetch_products(&self) -> Result<Vec<Product>, AuditError>;
}

/// Live HTTP source: one blocking GET, no retry, no pagination.
#[derive(Debug, Clone)]
pub struct HttpProductSource {
    endpoint: String,
}

impl HttpProductSource {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ProductSource for HttpProductSource {
    fn fetch_products(&self) -> Result<Vec<Product>, AuditError> {
        info!(endpoint = %self.endpoint, "fetching products");

        let response = ureq::get(&self.endpoint).call().map_err(|err| {
            let mapped = transport_error(&self.endpoint, &err);
            error!(endpoint = %self.endpoint, "product fetch failed: {mapped}");
            mapped
        })?;

        let products: Vec<Product> = response
            .into_json()
            .map_err(|err| AuditError::Decode(format!("invalid product payload: {err}")))?;

        info!(count = products.len(), "fetched products");
        Ok(products)
    }
}

fn transport_error(endpoint: &str, err: &ureq::Error) -> AuditError {
    match err {
        ureq::Error::Status(code, _) => {
            AuditError::Transport(format!("http status {code} from {endpoint}"))
        }
        ureq::Error::Transport(transport) => {
            AuditError::Transport(format!("http transport failure: {transport}"))
        }
    }
}

/// Recorded source backed by an in-memory product list.
#[derive(Debug, Clone, Default)]
pub struct FixtureProductSource {
    products: Vec<Product>,
}

impl FixtureProductSource {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Loads a recorded catalog from a JSON array file.
    ///
    /// # Errors
    /// Returns [`AuditError::Report`] when the file cannot be read and
    /// [`AuditError::Decode`] when it is not a JSON product array.
    pub fn from_json_file(path: &Path) -> Result<Self, AuditError> {
        let body = std::fs::read_to_string(path).map_err(|err| {
            AuditError::Report(format!(
                "failed to read catalog fixture {}: {err}",
                path.display()
            ))
        })?;
        let products: Vec<Product> = serde_json::from_str(&body)
            .map_err(|err| AuditError::Decode(format!("invalid catalog fixture: {err}")))?;
        Ok(Self { products })
    }
}

impl ProductSource for FixtureProductSource {
    fn fetch_products(&self) -> Result<Vec<Product>, AuditError> {
        info!(count = self.products.len(), "serving recorded products");
        Ok(self.products.clone())
    }
}
