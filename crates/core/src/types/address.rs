//! Structured postal address.

use serde::{Deserialize, Serialize};

use super::postal_code::{PostalCode, RegionCode};

/// A validated delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub postal_code: PostalCode,
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub region: RegionCode,
}

impl Address {
    /// Single-line form, e.g. `Av. Paulista, 1000 - Bela Vista, São Paulo/SP 01310-100`.
    #[must_use]
    pub fn one_line(&self) -> String {
        let complement = self
            .complement
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        format!(
            "{}, {}{complement} - {}, {}/{} {}",
            self.street, self.number, self.neighborhood, self.city, self.region, self.postal_code
        )
    }
}
