//! Classification and filter rule configuration.
//!
//! This module provides loading and compilation of the rule document that
//! drives a run. A document has two sections: classification rules, which
//! decide the destination subfolder of a matching file, and filter rules,
//! which gate whether a file is eligible for classification at all.
//!
//! # Rule Document Format
//!
//! Documents are JSON by default; a source path ending in `.toml` is parsed
//! as TOML with the same structure:
//!
//! ```json
//! {
//!   "classification_rule": {
//!     "priority": ["custom", "size", "time", "default"],
//!     "custom": {"enabled": true, "keywords": [".docx", "report"]},
//!     "size": {"enabled": true, "mode": "greater_than", "value1": 100, "value2": 200},
//!     "time": {"enabled": true, "start_time": 1700000000, "end_time": 1735689600},
//!     "default": {"enabled": true, "images": true, "videos": true,
//!                 "documents": true, "others": true}
//!   },
//!   "filter_rule": {
//!     "size": {"enabled": true, "mode": "less_than", "value2": 1024}
//!   }
//! }
//! ```
//!
//! Size thresholds are KiB. Time bounds are epoch seconds or RFC 3339
//! strings. A missing document is not an error: the built-in default rule
//! set applies (default rule only, all four categories enabled, no
//! filters).

use crate::classifier::{KeywordMatcher, RuleKind};
use crate::file_category::Category;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading a rule document.
///
/// Both variants are fatal: the run aborts before any filesystem mutation.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// The rule document exists but cannot be read.
    Unreadable { path: PathBuf, reason: String },
    /// The rule document is not valid JSON/TOML of the expected shape.
    Malformed { path: PathBuf, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Unreadable { path, reason } => {
                write!(f, "cannot read rule document {}: {}", path.display(), reason)
            }
            ConfigError::Malformed { path, reason } => {
                write!(f, "invalid rule document {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Helper for serde: rule sections default to enabled when present.
fn enabled_default() -> bool {
    true
}

/// The full rule document for one run.
///
/// A `RuleSet` is loaded (or defaulted) once per run and never mutated
/// afterwards; the dispatch engine only reads the compiled form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub classification_rule: ClassificationRules,
    #[serde(default)]
    pub filter_rule: FilterRules,
}

/// Classification section: ordered priority list plus one optional rule
/// per kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationRules {
    /// Rule-kind tags in evaluation order. Unknown tags are ignored,
    /// duplicates are meaningless.
    #[serde(default)]
    pub priority: Vec<String>,

    pub custom: Option<CustomRule>,
    pub size: Option<SizeRule>,
    pub time: Option<TimeRule>,
    pub default: Option<DefaultRule>,
}

/// Filter section: pre-condition gates applied to every file before
/// classification. An absent or disabled filter passes everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    pub size: Option<SizeRule>,
    pub time: Option<TimeRule>,
}

/// Keyword rule: extension keywords (leading dot, compared as stored) and
/// stem-substring keywords (case-insensitive), tried in configured order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Comparison mode of a size rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMode {
    GreaterThan,
    LessThan,
    Between,
}

/// Size rule. Thresholds are KiB and kept as raw document values so that a
/// non-numeric threshold is a local evaluation failure, not a parse error.
///
/// `GreaterThan` compares against `value1`, `LessThan` against `value2`,
/// `Between` strictly against both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeRule {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    pub mode: Option<SizeMode>,
    #[serde(default)]
    pub value1: Option<Value>,
    #[serde(default)]
    pub value2: Option<Value>,
}

/// Modification-time rule. Bounds are epoch seconds or RFC 3339 strings.
///
/// Classification compares strictly on both sides; filtering compares
/// inclusively and rejects when either bound is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRule {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub start_time: Option<Value>,
    #[serde(default)]
    pub end_time: Option<Value>,
}

/// Built-in extension-to-category rule with individually toggleable
/// categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultRule {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default = "enabled_default")]
    pub images: bool,
    #[serde(default = "enabled_default")]
    pub videos: bool,
    #[serde(default = "enabled_default")]
    pub documents: bool,
    #[serde(default = "enabled_default")]
    pub others: bool,
}

impl Default for DefaultRule {
    fn default() -> Self {
        Self {
            enabled: true,
            images: true,
            videos: true,
            documents: true,
            others: true,
        }
    }
}

impl DefaultRule {
    /// Whether the given category is toggled on in this rule.
    pub fn category_enabled(&self, category: Category) -> bool {
        match category {
            Category::Images => self.images,
            Category::Videos => self.videos,
            Category::Documents => self.documents,
            Category::Others => self.others,
        }
    }
}

impl RuleSet {
    /// Loads a rule set from an optional source path.
    ///
    /// A `None` source or a path that does not exist yields the built-in
    /// default rule set. An existing but unreadable or malformed document
    /// is a fatal [`ConfigError`].
    pub fn load(source: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = source else {
            return Ok(Self::default());
        };
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Loads a rule set from a specific file, picking the parser from the
    /// file extension (`.toml` is TOML, everything else is JSON).
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&content).map_err(|e| ConfigError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }

    /// Compiles the document into the form the dispatch engine evaluates.
    ///
    /// Priority tags are resolved to [`RuleKind`] values; unknown tags are
    /// dropped with a warning and duplicates keep their first position.
    /// Kinds whose rule section is absent or disabled are removed, so the
    /// compiled priority list is a total order over enabled kinds only.
    /// Custom keywords are pre-compiled into matchers.
    pub fn compile(&self) -> CompiledRules {
        let rules = &self.classification_rule;

        let mut priority: Vec<RuleKind> = Vec::new();
        for tag in &rules.priority {
            match RuleKind::parse(tag) {
                Some(kind) if !priority.contains(&kind) => priority.push(kind),
                Some(_) => {}
                None => log::warn!("ignoring unknown rule kind '{tag}' in priority list"),
            }
        }

        let custom = rules
            .custom
            .as_ref()
            .filter(|rule| rule.enabled)
            .map(|rule| CompiledCustom {
                matchers: rule.keywords.iter().map(|k| KeywordMatcher::new(k)).collect(),
            });
        let size = rules.size.clone().filter(|rule| rule.enabled);
        let time = rules.time.clone().filter(|rule| rule.enabled);
        let default = rules.default.clone().filter(|rule| rule.enabled);

        priority.retain(|kind| match kind {
            RuleKind::Custom => custom.is_some(),
            RuleKind::Size => size.is_some(),
            RuleKind::Time => time.is_some(),
            RuleKind::Default => default.is_some(),
        });

        CompiledRules {
            priority,
            custom,
            size,
            time,
            default,
            filter_size: self.filter_rule.size.clone().filter(|rule| rule.enabled),
            filter_time: self.filter_rule.time.clone().filter(|rule| rule.enabled),
        }
    }
}

impl Default for RuleSet {
    /// The built-in rule set used when no document is found: default rule
    /// only, all four categories enabled, no filters.
    fn default() -> Self {
        Self {
            classification_rule: ClassificationRules {
                priority: vec!["default".to_string()],
                custom: None,
                size: None,
                time: None,
                default: Some(DefaultRule::default()),
            },
            filter_rule: FilterRules::default(),
        }
    }
}

/// Custom rule with its keyword matchers pre-compiled.
#[derive(Debug, Clone)]
pub struct CompiledCustom {
    pub matchers: Vec<KeywordMatcher>,
}

/// Compiled, read-only view of a rule set for one run.
///
/// `priority` holds only kinds that are present and enabled; the per-kind
/// fields hold the corresponding rule data.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub priority: Vec<RuleKind>,
    pub custom: Option<CompiledCustom>,
    pub size: Option<SizeRule>,
    pub time: Option<TimeRule>,
    pub default: Option<DefaultRule>,
    pub filter_size: Option<SizeRule>,
    pub filter_time: Option<TimeRule>,
}
