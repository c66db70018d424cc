//! Folder planner: materializes every destination folder a rule set can
//! route files into, before the first move.
//!
//! Planning walks the compiled priority list and collects one folder per
//! custom keyword, the size and time bucket folders, and one folder per
//! enabled default category. Creation is idempotent; a folder that cannot
//! be created is fatal for the run, which ends without touching any file.

use crate::classifier::{RuleKind, size_bucket_name, time_bucket_name};
use crate::config::CompiledRules;
use crate::file_category::Category;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Fatal failure to materialize a destination folder.
#[derive(Debug)]
pub enum PlanError {
    CreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::CreationFailed { path, source } => {
                write!(
                    f,
                    "failed to create destination folder {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for PlanError {}

/// Derives and creates the destination folders implied by a rule set.
pub struct FolderPlanner;

impl FolderPlanner {
    /// Computes the exhaustive set of destination folder names that
    /// classification might require, in creation order.
    ///
    /// A size or time rule whose values cannot produce a bucket name is
    /// skipped with a warning; such a rule can never match a file.
    pub fn plan(rules: &CompiledRules) -> Vec<String> {
        let mut folders: Vec<String> = Vec::new();
        let push = |folders: &mut Vec<String>, name: String| {
            if !folders.contains(&name) {
                folders.push(name);
            }
        };

        for kind in &rules.priority {
            match kind {
                RuleKind::Custom => {
                    if let Some(custom) = &rules.custom {
                        for matcher in &custom.matchers {
                            push(&mut folders, matcher.folder.clone());
                        }
                    }
                }
                RuleKind::Size => {
                    if let Some(rule) = &rules.size {
                        match size_bucket_name(rule) {
                            Some(name) => push(&mut folders, name),
                            None => warn!("size rule has unusable values; no folder planned"),
                        }
                    }
                }
                RuleKind::Time => {
                    if let Some(rule) = &rules.time {
                        match time_bucket_name(rule) {
                            Some(name) => push(&mut folders, name),
                            None => warn!("time rule has unusable values; no folder planned"),
                        }
                    }
                }
                RuleKind::Default => {
                    if let Some(rule) = &rules.default {
                        for category in Category::all() {
                            if rule.category_enabled(category) {
                                push(&mut folders, category.dir_name().to_string());
                            }
                        }
                    }
                }
            }
        }

        folders
    }

    /// Creates each planned folder under `target`. Pre-existing folders
    /// are left untouched.
    pub fn ensure(target: &Path, folders: &[String]) -> Result<(), PlanError> {
        for name in folders {
            let path = target.join(name);
            if path.is_dir() {
                continue;
            }
            fs::create_dir(&path).map_err(|e| PlanError::CreationFailed {
                path: path.clone(),
                source: e,
            })?;
            debug!("created destination folder {}", path.display());
        }
        Ok(())
    }
}
