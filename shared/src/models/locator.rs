//! Canonical identity of a metric series.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Separator between the tenant id and the metric path.
pub const LOCATOR_DELIMITER: char = '.';

/// A tenant-scoped metric series key.
///
/// Two locators are equal when their canonical strings are equal.
///
/// # Example
///
/// ```
/// use shared::models::Locator;
///
/// let locator = Locator::new("acme", "api.requests.count");
/// assert_eq!(locator.to_string(), "acme.api.requests.count");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "LocatorParts", into = "LocatorParts")]
pub struct Locator {
    tenant_id: String,
    metric_name: String,
    canonical: String,
}

#[derive(Serialize, Deserialize)]
struct LocatorParts {
    tenant_id: String,
    metric_name: String,
}

impl From<LocatorParts> for Locator {
    fn from(parts: LocatorParts) -> Self {
        Self::new(parts.tenant_id, parts.metric_name)
    }
}

impl From<Locator> for LocatorParts {
    fn from(locator: Locator) -> Self {
        Self {
            tenant_id: locator.tenant_id,
            metric_name: locator.metric_name,
        }
    }
}

impl Locator {
    /// Builds a locator from its path components.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, metric_name: impl Into<String>) -> Self {
        let tenant_id = tenant_id.into();
        let metric_name = metric_name.into();
        let canonical = format!("{tenant_id}{LOCATOR_DELIMITER}{metric_name}");
        Self {
            tenant_id,
            metric_name,
            canonical,
        }
    }

    /// The tenant owning this series.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The metric path within the tenant.
    #[must_use]
    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    /// The canonical string used as the store key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Locator {}

impl Hash for Locator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}
