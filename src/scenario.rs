//! Scenario loading, parsing, and validation.
//!
//! Contains the configuration structure describing one simulation run
//! and provides functions for loading scenarios from JSON files,
//! validating them, and computing the informational node couples
//! grouping printed at startup.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for scenario loading failures.
#[derive(Debug)]
pub enum ScenarioLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            ScenarioLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            ScenarioLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ScenarioLoadError {}

/// Root structure describing one simulation run.
///
/// Every field defaults to the stock two-node out-of-range run, so a
/// scenario file only needs to name the fields it overrides and
/// `Scenario::default()` needs no file at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Ids of the simulated nodes, in boot order.
    pub nodes: Vec<u32>,
    /// Path to the noise trace file (one integer sample per line).
    pub noise_trace: PathBuf,
    /// Path of the simulation log that all debug channels write into.
    pub log_path: PathBuf,
    /// Debug channels to bind to the simulation log.
    pub channels: Vec<String>,
    /// Link gain in dBm applied to every directed radio link.
    pub link_gain_dbm: f32,
    /// Simulated time at which every node boots.
    pub boot_time: u64,
    /// Events to run before the power-off step.
    pub phase_one_events: u32,
    /// Events to run after the power-off step.
    pub phase_two_events: u32,
    /// Node to power off between the two phases, if any.
    pub power_off_node: Option<u32>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            nodes: vec![1, 2],
            noise_trace: PathBuf::from("meyer-heavy.txt"),
            log_path: PathBuf::from("../logs/simulation_log_out_of_range.txt"),
            channels: vec![
                "boot".to_string(),
                "radio".to_string(),
                "display".to_string(),
                "alarm".to_string(),
            ],
            link_gain_dbm: -60.0,
            boot_time: 0,
            phase_one_events: 2500,
            phase_two_events: 2500,
            power_off_node: Some(2),
        }
    }
}

/// Load and parse a scenario from a file.
///
/// # Parameters
///
/// * `path` - Path to the scenario JSON file
///
/// # Returns
///
/// Parsed and validated Scenario or an error.
pub fn load_scenario(path: &Path) -> Result<Scenario, ScenarioLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| ScenarioLoadError::FileReadError(e.to_string()))?;

    let scenario: Scenario = serde_json::from_str(&data)
        .context("Invalid JSON format")
        .map_err(|e| ScenarioLoadError::ParseError(e.to_string()))?;

    // Validate the scenario
    validate_scenario(&scenario).map_err(ScenarioLoadError::ValidationError)?;

    Ok(scenario)
}

/// Validate a scenario configuration.
///
/// # Parameters
///
/// * `scenario` - The parsed scenario to validate
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scenario(scenario: &Scenario) -> Result<(), String> {
    const MAX_NODES: usize = 1000;
    const MIN_LINK_GAIN_DBM: f32 = -120.0;
    const MAX_LINK_GAIN_DBM: f32 = 10.0;

    // Check node count
    if scenario.nodes.is_empty() {
        return Err("Scenario must contain at least one node".to_string());
    }
    if scenario.nodes.len() > MAX_NODES {
        return Err(format!(
            "Node count {} exceeds maximum of {}",
            scenario.nodes.len(),
            MAX_NODES
        ));
    }

    // Check for duplicate or unaddressable node ids
    let mut node_ids = HashSet::new();
    for &node_id in &scenario.nodes {
        if node_id == 0 {
            return Err("Node id 0 is not addressable, ids start at 1".to_string());
        }
        if !node_ids.insert(node_id) {
            return Err(format!("Duplicate node id found: {}", node_id));
        }
    }

    // Check link gain is realistic
    if scenario.link_gain_dbm < MIN_LINK_GAIN_DBM || scenario.link_gain_dbm > MAX_LINK_GAIN_DBM {
        return Err(format!(
            "Link gain {} dBm outside realistic range ({} to {} dBm)",
            scenario.link_gain_dbm, MIN_LINK_GAIN_DBM, MAX_LINK_GAIN_DBM
        ));
    }

    // Check for blank or duplicate debug channel names
    let mut channel_names = HashSet::new();
    for name in &scenario.channels {
        if name.trim().is_empty() {
            return Err("Debug channel names must be non-empty".to_string());
        }
        if !channel_names.insert(name.as_str()) {
            return Err(format!("Duplicate debug channel: {}", name));
        }
    }

    // The power-off target must be one of the configured nodes
    if let Some(target) = scenario.power_off_node {
        if !node_ids.contains(&target) {
            return Err(format!(
                "Power-off target {} is not a configured node",
                target
            ));
        }
    }

    Ok(())
}

/// Compute the informational couples grouping of node ids.
///
/// Ids are deduplicated and visited in ascending order. An odd id always
/// opens a new group. An even id joins the previous group when it is
/// exactly the successor of that group's first member, and opens its own
/// group otherwise. The grouping is printed at startup and feeds nothing
/// else in the run.
pub fn couple_nodes(nodes: &[u32]) -> Vec<Vec<u32>> {
    let mut sorted: Vec<u32> = nodes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut couples: Vec<Vec<u32>> = Vec::new();
    for node_id in sorted {
        match couples.last_mut() {
            Some(group) if node_id % 2 == 0 && node_id == group[0] + 1 => group.push(node_id),
            _ => couples.push(vec![node_id]),
        }
    }
    couples
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_scenario_is_the_stock_run() {
        let scenario = Scenario::default();
        assert_eq!(scenario.nodes, vec![1, 2]);
        assert_eq!(scenario.noise_trace, PathBuf::from("meyer-heavy.txt"));
        assert_eq!(
            scenario.log_path,
            PathBuf::from("../logs/simulation_log_out_of_range.txt")
        );
        assert_eq!(scenario.channels, vec!["boot", "radio", "display", "alarm"]);
        assert_eq!(scenario.link_gain_dbm, -60.0);
        assert_eq!(scenario.boot_time, 0);
        assert_eq!(scenario.phase_one_events, 2500);
        assert_eq!(scenario.phase_two_events, 2500);
        assert_eq!(scenario.power_off_node, Some(2));
        assert!(validate_scenario(&scenario).is_ok());
    }

    #[test]
    fn test_load_scenario_fills_missing_fields_from_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(
            &path,
            r#"{ "nodes": [1, 2, 3, 4], "phase_one_events": 10, "power_off_node": 3 }"#,
        )
        .unwrap();

        let scenario = load_scenario(&path).unwrap();
        assert_eq!(scenario.nodes, vec![1, 2, 3, 4]);
        assert_eq!(scenario.phase_one_events, 10);
        assert_eq!(scenario.phase_two_events, 2500);
        assert_eq!(scenario.power_off_node, Some(3));
        assert_eq!(scenario.link_gain_dbm, -60.0);
    }

    #[test]
    fn test_load_scenario_null_disables_power_off() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, r#"{ "power_off_node": null }"#).unwrap();

        let scenario = load_scenario(&path).unwrap();
        assert_eq!(scenario.power_off_node, None);
    }

    #[test]
    fn test_load_scenario_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_scenario(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ScenarioLoadError::FileReadError(_)));
    }

    #[test]
    fn test_load_scenario_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, "{ nodes: oops").unwrap();

        let err = load_scenario(&path).unwrap_err();
        assert!(matches!(err, ScenarioLoadError::ParseError(_)));
    }

    #[test]
    fn test_validate_rejects_empty_node_list() {
        let scenario = Scenario {
            nodes: vec![],
            ..Scenario::default()
        };
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.contains("at least one node"));
    }

    #[test]
    fn test_validate_rejects_duplicate_node_ids() {
        let scenario = Scenario {
            nodes: vec![1, 2, 1],
            ..Scenario::default()
        };
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.contains("Duplicate node id"));
    }

    #[test]
    fn test_validate_rejects_node_id_zero() {
        let scenario = Scenario {
            nodes: vec![0, 1],
            power_off_node: Some(1),
            ..Scenario::default()
        };
        assert!(validate_scenario(&scenario).is_err());
    }

    #[test]
    fn test_validate_rejects_unrealistic_link_gain() {
        let scenario = Scenario {
            link_gain_dbm: -300.0,
            ..Scenario::default()
        };
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.contains("outside realistic range"));
    }

    #[test]
    fn test_validate_rejects_duplicate_channels() {
        let scenario = Scenario {
            channels: vec!["boot".to_string(), "radio".to_string(), "boot".to_string()],
            ..Scenario::default()
        };
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.contains("Duplicate debug channel"));
    }

    #[test]
    fn test_validate_rejects_blank_channel_name() {
        let scenario = Scenario {
            channels: vec!["boot".to_string(), "  ".to_string()],
            ..Scenario::default()
        };
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.contains("non-empty"));
    }

    #[test]
    fn test_validate_rejects_foreign_power_off_target() {
        let scenario = Scenario {
            nodes: vec![1, 2],
            power_off_node: Some(7),
            ..Scenario::default()
        };
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.contains("not a configured node"));
    }

    #[test]
    fn test_couples_stock_pair() {
        assert_eq!(couple_nodes(&[1, 2]), vec![vec![1, 2]]);
    }

    #[test]
    fn test_couples_odd_ids_open_groups() {
        assert_eq!(couple_nodes(&[1, 3, 5]), vec![vec![1], vec![3], vec![5]]);
    }

    #[test]
    fn test_couples_even_id_joins_only_its_predecessor() {
        // 4 follows 3, so they pair; 6 follows nothing adjacent and stands alone.
        assert_eq!(
            couple_nodes(&[3, 4, 6]),
            vec![vec![3, 4], vec![6]]
        );
    }

    #[test]
    fn test_couples_leading_even_id_stands_alone() {
        assert_eq!(couple_nodes(&[2, 3, 4]), vec![vec![2], vec![3, 4]]);
    }

    #[test]
    fn test_couples_input_order_is_irrelevant() {
        assert_eq!(couple_nodes(&[4, 1, 3, 2]), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_couples_deduplicates_ids() {
        assert_eq!(couple_nodes(&[1, 1, 2, 2]), vec![vec![1, 2]]);
    }

    #[test]
    fn test_couples_empty_input() {
        assert!(couple_nodes(&[]).is_empty());
    }
}
