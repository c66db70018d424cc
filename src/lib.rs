//! rulesort - organize the files of a directory into subfolders
//!
//! This library provides a rule engine and file-dispatch pipeline: rule
//! documents are loaded and compiled, destination folders are planned and
//! created, and each file in the target directory is filtered, classified
//! by the first matching rule kind in priority order, and moved. Progress
//! and status flow to the host through a notification sink, and runs can
//! be cancelled cooperatively between files.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod file_category;
pub mod notify;
pub mod output;
pub mod planner;

pub use classifier::{EvalError, FileEntry, RuleKind};
pub use config::{CompiledRules, ConfigError, RuleSet};
pub use engine::{CancelToken, EngineError, FileOutcome, Organizer, RunSummary};
pub use file_category::Category;
pub use notify::{Event, NotificationSink, SilentSink};
pub use planner::{FolderPlanner, PlanError};
