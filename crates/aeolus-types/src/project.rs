//! Per-project analysis context

use serde::{Deserialize, Serialize};

/// Read-only project input shared by every rule evaluation in a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Brand the project tracks
    pub brand_name: String,
    /// Attributes the brand wants associated with it
    pub key_brand_attributes: Vec<String>,
    /// Competitor brand names
    pub competitors: Vec<String>,
}

impl ProjectContext {
    pub fn new(brand_name: impl Into<String>) -> Self {
        Self {
            brand_name: brand_name.into(),
            ..Default::default()
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.key_brand_attributes = attributes;
        self
    }

    pub fn with_competitors(mut self, competitors: Vec<String>) -> Self {
        self.competitors = competitors;
        self
    }
}
