//! Region codes and the static table of observation sources.
//!
//! Each source is one state-wide observation bundle published under a
//! product id (e.g. `IDN60910` for New South Wales). Requests select sources
//! by state code, by product id, by an alias (`ACT` is served from the NSW
//! bundle), or with `ALL`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ObsError, ObsResult};

/// One configured observation source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDef {
    /// State code used as the stable source identifier (e.g. "NSW").
    pub code: String,
    /// Remote product id (e.g. "IDN60910").
    pub product_id: String,
}

impl SourceDef {
    pub fn new(code: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            product_id: product_id.into(),
        }
    }

    /// Remote and local file name of the bundle.
    pub fn file_name(&self) -> String {
        format!("{}.tgz", self.product_id)
    }
}

/// Parsed value of the `state` request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSelection {
    /// Every configured source.
    All,
    /// A single source, by state code.
    State(String),
}

/// Static mapping of state codes to product ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTable {
    pub sources: Vec<SourceDef>,
    /// Extra codes served from another state's bundle.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for SourceTable {
    fn default() -> Self {
        let sources = [
            ("NSW", "IDN60910"),
            ("VIC", "IDV60910"),
            ("QLD", "IDQ60910"),
            ("WA", "IDW60910"),
            ("SA", "IDS60910"),
            ("TAS", "IDT60910"),
            ("NT", "IDD60910"),
        ]
        .into_iter()
        .map(|(code, product)| SourceDef::new(code, product))
        .collect();

        let mut aliases = HashMap::new();
        aliases.insert("ACT".to_string(), "NSW".to_string());

        Self { sources, aliases }
    }
}

impl SourceTable {
    /// Check codes are unique and every alias targets a configured code.
    pub fn validate(&self) -> ObsResult<()> {
        if self.sources.is_empty() {
            return Err(ObsError::Config("no sources configured".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if source.code.is_empty() || source.product_id.is_empty() {
                return Err(ObsError::Config(format!(
                    "source entry has an empty code or product id: {:?}",
                    source
                )));
            }
            if !seen.insert(source.code.to_uppercase()) {
                return Err(ObsError::Config(format!(
                    "duplicate source code: {}",
                    source.code
                )));
            }
        }

        for (alias, target) in &self.aliases {
            if self.find_code(target).is_none() {
                return Err(ObsError::Config(format!(
                    "alias {} points at unknown source {}",
                    alias, target
                )));
            }
        }

        Ok(())
    }

    /// Look up a source by state code (case-insensitive).
    pub fn find_code(&self, code: &str) -> Option<&SourceDef> {
        self.sources
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(code))
    }

    /// Look up a source by product id (case-insensitive).
    pub fn find_product(&self, product_id: &str) -> Option<&SourceDef> {
        self.sources
            .iter()
            .find(|s| s.product_id.eq_ignore_ascii_case(product_id))
    }

    /// Parse the `state` parameter. A missing value means `ALL`; an empty
    /// one is rejected like any other unknown region.
    pub fn parse_selection(&self, raw: Option<&str>) -> ObsResult<RegionSelection> {
        let Some(raw) = raw else {
            return Ok(RegionSelection::All);
        };
        let value = raw.trim().to_uppercase();

        if value == "ALL" {
            return Ok(RegionSelection::All);
        }

        if let Some(source) = self.find_code(&value) {
            return Ok(RegionSelection::State(source.code.clone()));
        }

        if let Some((_, target)) = self
            .aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(&value))
        {
            return Ok(RegionSelection::State(target.clone()));
        }

        if let Some(source) = self.find_product(&value) {
            return Ok(RegionSelection::State(source.code.clone()));
        }

        Err(ObsError::InvalidRegion(value))
    }

    /// Sources covered by a selection, in table order.
    pub fn select(&self, selection: &RegionSelection) -> Vec<&SourceDef> {
        match selection {
            RegionSelection::All => self.sources.iter().collect(),
            RegionSelection::State(code) => self.find_code(code).into_iter().collect(),
        }
    }
}
