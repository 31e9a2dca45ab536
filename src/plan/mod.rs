//! Job planning
//!
//! Turns an option tree file into the list of pack jobs it describes:
//! the tree is resolved into one merged bag per node, and every bag that
//! names both inputs and an output becomes a job.

pub mod job;
pub mod params;
pub mod tree;

pub use job::{Job, JobDefaults};
pub use tree::{resolve, OptionBag, OptionNode};

use crate::error::{PackError, PackResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// A bag that should have become a job but could not
#[derive(Debug)]
pub struct PlanFailure {
    /// Pre-order index of the node in the tree
    pub node: usize,
    pub error: PackError,
}

/// Jobs planned from one tree
#[derive(Debug, Default)]
pub struct Plan {
    pub jobs: Vec<Job>,

    /// Bags whose parameters could not be flattened; each counts as a
    /// failed job
    pub failures: Vec<PlanFailure>,
}

/// Read and parse an option tree file
pub async fn load_tree(path: &Path) -> PackResult<OptionNode> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| PackError::io(format!("reading option tree {}", path.display()), e))?;

    serde_json::from_str(&content).map_err(|e| {
        PackError::InvalidConfiguration(format!("{}: {}", path.display(), e))
    })
}

/// Directory that input patterns are relative to
pub fn base_dir(tree_path: &Path) -> PathBuf {
    match tree_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Build every job described by a resolved tree.
///
/// Malformed bags are logged and skipped; bags with an invalid parameter
/// sequence are reported as failures.
pub fn plan(root: &OptionNode, base_dir: &Path, defaults: &JobDefaults) -> Plan {
    let mut plan = Plan::default();

    for (node, bag) in resolve(root).iter().enumerate() {
        match job::build(bag, base_dir, defaults) {
            Ok(Some(job)) => plan.jobs.push(job),
            Ok(None) => debug!("Node {} has no inputs/outputs, options only", node),
            Err(PackError::InvalidConfiguration(reason)) => {
                warn!("Skipping node {}: {}", node, reason);
            }
            Err(error) => plan.failures.push(PlanFailure { node, error }),
        }
    }

    debug!(
        "Planned {} job(s), {} failure(s)",
        plan.jobs.len(),
        plan.failures.len()
    );
    plan
}

/// Load a tree file and plan its jobs
pub async fn plan_file(tree_path: &Path, defaults: &JobDefaults) -> PackResult<Plan> {
    let root = load_tree(tree_path).await?;
    Ok(plan(&root, &base_dir(tree_path), defaults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn base_dir_of_bare_file_name() {
        assert_eq!(base_dir(Path::new("tree.json")), PathBuf::from("."));
        assert_eq!(
            base_dir(Path::new("assets/tree.json")),
            PathBuf::from("assets")
        );
    }

    #[tokio::test]
    async fn plan_file_resolves_relative_to_tree() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("ui")).unwrap();
        std::fs::write(temp.path().join("ui/button.png"), b"png").unwrap();
        let tree = temp.path().join("pack.json");
        std::fs::write(
            &tree,
            r#"{
                "options": { "params": ["--format", "cocos2d"] },
                "children": [
                    { "options": { "input_files": [["ui", "*.png"]], "output_path": ["ui"] } },
                    { "options": { "input_files": 3, "output_path": ["broken"] } },
                    { "options": { "input_files": [], "output_path": ["bad"], "params": ["--opt"] } }
                ]
            }"#,
        )
        .unwrap();

        let plan = plan_file(&tree, &JobDefaults::default()).await.unwrap();

        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].files, vec![temp.path().join("ui/button.png")]);
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].node, 3);
    }

    #[tokio::test]
    async fn unparsable_tree_is_invalid_configuration() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("pack.json");
        std::fs::write(&tree, "{ not json").unwrap();

        let err = plan_file(&tree, &JobDefaults::default()).await.unwrap_err();
        assert!(matches!(err, PackError::InvalidConfiguration(_)));
    }
}
