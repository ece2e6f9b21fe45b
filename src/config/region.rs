//! Region configuration
//!
//! A region is a small record of the commands and variables that differ
//! between the dev environments (AU vs EU): which SSH alias reaches the
//! box, which sync alias pushes code to it, plus free-form template
//! variables and environment exports for the remote shell.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Commands and variables for one region.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Command that opens a shell on the region's dev box
    pub ssh: String,

    /// Command that syncs the working copy to the dev box
    pub sync: String,

    /// Free-form variables available to command templates as
    /// `{{ region.vars.* }}`
    #[serde(default)]
    pub vars: HashMap<String, String>,

    /// Environment variables written into the remote shell as literal
    /// `export KEY=VALUE` statements. Ordered map so the statements are
    /// sent deterministically.
    #[serde(default)]
    pub exports: BTreeMap<String, String>,
}

impl RegionConfig {
    /// The literal `export` statements for this region, in key order.
    pub fn export_statements(&self) -> Vec<String> {
        self.exports
            .iter()
            .map(|(key, value)| format!("export {key}={value}"))
            .collect()
    }
}

/// The two regions shipped by default. User and project config can
/// override or extend these.
pub fn builtin_regions() -> HashMap<String, RegionConfig> {
    let mut regions = HashMap::new();

    regions.insert(
        "au".to_string(),
        RegionConfig {
            description: "Australian dev box".into(),
            ssh: "tssh".into(),
            sync: "tsr".into(),
            vars: HashMap::from([("host".to_string(), "dev.au.internal".to_string())]),
            exports: BTreeMap::from([("CREDENTIALS_TYPE".to_string(), "sso".to_string())]),
        },
    );

    regions.insert(
        "eu".to_string(),
        RegionConfig {
            description: "European dev box".into(),
            ssh: "eutssh".into(),
            sync: "eutsr".into(),
            vars: HashMap::from([("host".to_string(), "dev.eu.internal".to_string())]),
            exports: BTreeMap::from([("CREDENTIALS_TYPE".to_string(), "sso".to_string())]),
        },
    );

    regions
}
