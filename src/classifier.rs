//! Predicate evaluators for classification and filter rules.
//!
//! Each evaluator is a pure function from a file (name, size, mtime) and a
//! rule to "does it match, and into which folder". Size thresholds are KiB
//! (bytes / 1024, plain floating division). Classification comparisons are
//! strict on both sides; filter comparisons are inclusive, and a time
//! filter with a missing bound rejects the file.
//!
//! A malformed value inside a size or time rule is a local
//! [`EvalError::InvalidRuleValue`]: the rule kind is treated as
//! non-matching for the file under evaluation and the priority walk
//! continues.

use crate::config::{CompiledCustom, CompiledRules, DefaultRule, SizeMode, SizeRule, TimeRule};
use crate::file_category::Category;
use chrono::DateTime;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// The closed set of classification rule kinds.
///
/// The priority list of a rule document is resolved to these variants at
/// compile time, so an unknown tag can never reach the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Custom,
    Size,
    Time,
    Default,
}

impl RuleKind {
    /// Resolves a priority tag; returns `None` for unknown tags.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "custom" => Some(RuleKind::Custom),
            "size" => Some(RuleKind::Size),
            "time" => Some(RuleKind::Time),
            "default" => Some(RuleKind::Default),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Custom => "custom",
            RuleKind::Size => "size",
            RuleKind::Time => "time",
            RuleKind::Default => "default",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Local evaluation failure: the affected rule kind does not match the
/// file under evaluation, and the run continues.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// A size or time rule holds a value that cannot be used (non-numeric
    /// threshold, unparseable timestamp, missing mode or bound).
    InvalidRuleValue { rule: RuleKind, reason: String },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::InvalidRuleValue { rule, reason } => {
                write!(f, "invalid value in {rule} rule: {reason}")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// A regular file from the target-directory snapshot.
///
/// Carries everything the evaluators consume: name, byte size, and
/// modification time as epoch seconds.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_epoch: f64,
}

impl FileEntry {
    /// Reads size and modification time for the file at `path`.
    pub fn from_path(path: PathBuf) -> std::io::Result<Self> {
        let metadata = fs::metadata(&path)?;
        let modified_epoch = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            name,
            path,
            size_bytes: metadata.len(),
            modified_epoch,
        })
    }

    /// Filename without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }

    /// Extension as stored, without the leading dot.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }

    pub fn size_kib(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

/// One pre-compiled custom keyword.
///
/// A keyword starting with `.` matches the file extension as stored
/// (case-sensitive); any other keyword is a case-insensitive substring
/// match against the filename stem. Each keyword owns a distinct
/// destination folder.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    pub keyword: String,
    pub folder: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Extension,
    Substring(Regex),
}

impl KeywordMatcher {
    pub fn new(keyword: &str) -> Self {
        if let Some(ext) = keyword.strip_prefix('.') {
            Self {
                keyword: keyword.to_string(),
                folder: format!("extension-{ext}"),
                matcher: Matcher::Extension,
            }
        } else {
            let pattern = RegexBuilder::new(&regex::escape(keyword))
                .case_insensitive(true)
                .build()
                .expect("escaped keyword is a valid pattern");
            Self {
                keyword: keyword.to_string(),
                folder: format!("contains-{keyword}"),
                matcher: Matcher::Substring(pattern),
            }
        }
    }

    pub fn matches(&self, file: &FileEntry) -> bool {
        match &self.matcher {
            Matcher::Extension => file.extension().is_some_and(|ext| &self.keyword[1..] == ext),
            Matcher::Substring(pattern) => pattern.is_match(file.stem()),
        }
    }
}

/// Evaluates one rule kind against one file.
///
/// Returns the destination folder name on a match, `None` on a clean
/// non-match, and [`EvalError`] when the rule's values are unusable.
pub fn evaluate(
    kind: RuleKind,
    file: &FileEntry,
    rules: &CompiledRules,
) -> Result<Option<String>, EvalError> {
    match kind {
        RuleKind::Custom => Ok(rules
            .custom
            .as_ref()
            .and_then(|rule| evaluate_custom(file, rule))),
        RuleKind::Size => rules
            .size
            .as_ref()
            .map_or(Ok(None), |rule| evaluate_size(file, rule)),
        RuleKind::Time => rules
            .time
            .as_ref()
            .map_or(Ok(None), |rule| evaluate_time(file, rule)),
        RuleKind::Default => Ok(rules
            .default
            .as_ref()
            .and_then(|rule| evaluate_default(file, rule))),
    }
}

/// Walks the keywords in configured order; the first match wins.
pub fn evaluate_custom(file: &FileEntry, rule: &CompiledCustom) -> Option<String> {
    rule.matchers
        .iter()
        .find(|matcher| matcher.matches(file))
        .map(|matcher| matcher.folder.clone())
}

/// Strict size comparison in KiB against the mode's thresholds.
pub fn evaluate_size(file: &FileEntry, rule: &SizeRule) -> Result<Option<String>, EvalError> {
    if size_matches(file, rule)? {
        Ok(size_bucket_name(rule))
    } else {
        Ok(None)
    }
}

/// Strict window on modification time: `start < mtime < end`.
pub fn evaluate_time(file: &FileEntry, rule: &TimeRule) -> Result<Option<String>, EvalError> {
    let start = time_bound(rule.start_time.as_ref(), "start_time")?;
    let end = time_bound(rule.end_time.as_ref(), "end_time")?;

    if start < file.modified_epoch && file.modified_epoch < end {
        Ok(time_bucket_name(rule))
    } else {
        Ok(None)
    }
}

/// Extension lookup in the four fixed category tables.
///
/// A file whose category is toggled off falls through to `others` when
/// that category is on; otherwise the rule does not match.
pub fn evaluate_default(file: &FileEntry, rule: &DefaultRule) -> Option<String> {
    let category = Category::for_extension(file.extension().unwrap_or(""));
    if rule.category_enabled(category) {
        return Some(category.dir_name().to_string());
    }
    if category != Category::Others && rule.others {
        return Some(Category::Others.dir_name().to_string());
    }
    None
}

/// Inclusive time gate: passes iff both bounds parse and
/// `start <= mtime <= end`. A missing or malformed bound rejects.
pub fn time_filter_passes(file: &FileEntry, rule: &TimeRule) -> bool {
    match (
        time_bound(rule.start_time.as_ref(), "start_time"),
        time_bound(rule.end_time.as_ref(), "end_time"),
    ) {
        (Ok(start), Ok(end)) => start <= file.modified_epoch && file.modified_epoch <= end,
        _ => false,
    }
}

/// Size gate with the same mode comparisons as classification. A
/// malformed threshold rejects the file.
pub fn size_filter_passes(file: &FileEntry, rule: &SizeRule) -> bool {
    match size_matches(file, rule) {
        Ok(passes) => passes,
        Err(e) => {
            log::warn!("size filter rejects '{}': {e}", file.name);
            false
        }
    }
}

fn size_matches(file: &FileEntry, rule: &SizeRule) -> Result<bool, EvalError> {
    let Some(mode) = rule.mode else {
        return Err(EvalError::InvalidRuleValue {
            rule: RuleKind::Size,
            reason: "missing mode".to_string(),
        });
    };
    let size_kib = file.size_kib();

    Ok(match mode {
        SizeMode::GreaterThan => size_kib > threshold(rule.value1.as_ref(), "value1")?,
        SizeMode::LessThan => size_kib < threshold(rule.value2.as_ref(), "value2")?,
        SizeMode::Between => {
            let lower = threshold(rule.value1.as_ref(), "value1")?;
            let upper = threshold(rule.value2.as_ref(), "value2")?;
            lower < size_kib && size_kib < upper
        }
    })
}

fn threshold(value: Option<&Value>, field: &'static str) -> Result<f64, EvalError> {
    value
        .and_then(Value::as_f64)
        .ok_or_else(|| EvalError::InvalidRuleValue {
            rule: RuleKind::Size,
            reason: format!("{field} is not a number"),
        })
}

/// A time bound is epoch seconds or an RFC 3339 string.
fn time_bound(value: Option<&Value>, field: &'static str) -> Result<f64, EvalError> {
    let value = value.ok_or_else(|| EvalError::InvalidRuleValue {
        rule: RuleKind::Time,
        reason: format!("missing {field}"),
    })?;

    if let Some(seconds) = value.as_f64() {
        return Ok(seconds);
    }
    if let Some(text) = value.as_str() {
        return DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.timestamp() as f64)
            .map_err(|e| EvalError::InvalidRuleValue {
                rule: RuleKind::Time,
                reason: format!("{field} '{text}' is not a timestamp: {e}"),
            });
    }

    Err(EvalError::InvalidRuleValue {
        rule: RuleKind::Time,
        reason: format!("{field} is not a number or RFC 3339 string"),
    })
}

/// Destination folder name of a size rule, derived from its mode and
/// thresholds; `None` when those are unusable (the rule can never match).
pub fn size_bucket_name(rule: &SizeRule) -> Option<String> {
    let value1 = rule.value1.as_ref().and_then(Value::as_f64);
    let value2 = rule.value2.as_ref().and_then(Value::as_f64);

    match rule.mode? {
        SizeMode::GreaterThan => Some(format!("larger-than-{}KiB", fmt_kib(value1?))),
        SizeMode::LessThan => Some(format!("smaller-than-{}KiB", fmt_kib(value2?))),
        SizeMode::Between => Some(format!(
            "between-{}-and-{}KiB",
            fmt_kib(value1?),
            fmt_kib(value2?)
        )),
    }
}

/// Destination folder name of a time rule; `None` when a bound is
/// unusable.
pub fn time_bucket_name(rule: &TimeRule) -> Option<String> {
    let start = time_bound(rule.start_time.as_ref(), "start_time").ok()?;
    let end = time_bound(rule.end_time.as_ref(), "end_time").ok()?;
    Some(format!("modified-{}-to-{}", fmt_day(start), fmt_day(end)))
}

fn fmt_kib(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn fmt_day(epoch: f64) -> String {
    DateTime::from_timestamp(epoch as i64, 0)
        .map(|dt| dt.format("%Y%m%d").to_string())
        .unwrap_or_else(|| "epoch".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file(name: &str, size_bytes: u64, modified_epoch: f64) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            path: PathBuf::from(name),
            size_bytes,
            modified_epoch,
        }
    }

    fn size_rule(mode: Option<SizeMode>, value1: Option<Value>, value2: Option<Value>) -> SizeRule {
        SizeRule {
            enabled: true,
            mode,
            value1,
            value2,
        }
    }

    fn time_rule(start: Option<Value>, end: Option<Value>) -> TimeRule {
        TimeRule {
            enabled: true,
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_rule_kind_parse() {
        assert_eq!(RuleKind::parse("custom"), Some(RuleKind::Custom));
        assert_eq!(RuleKind::parse("size"), Some(RuleKind::Size));
        assert_eq!(RuleKind::parse("time"), Some(RuleKind::Time));
        assert_eq!(RuleKind::parse("default"), Some(RuleKind::Default));
        assert_eq!(RuleKind::parse("regex"), None);
    }

    #[test]
    fn test_extension_keyword_matches_as_stored() {
        let matcher = KeywordMatcher::new(".docx");
        assert_eq!(matcher.folder, "extension-docx");
        assert!(matcher.matches(&file("report.docx", 1, 0.0)));
        // extension comparison is case-sensitive
        assert!(!matcher.matches(&file("report.DOCX", 1, 0.0)));
        assert!(!matcher.matches(&file("report.doc", 1, 0.0)));
    }

    #[test]
    fn test_substring_keyword_is_case_insensitive_on_stem() {
        let matcher = KeywordMatcher::new("report");
        assert_eq!(matcher.folder, "contains-report");
        assert!(matcher.matches(&file("Quarterly_REPORT_v2.pdf", 1, 0.0)));
        // the extension is not part of the stem
        assert!(!matcher.matches(&file("summary.report", 1, 0.0)));
    }

    #[test]
    fn test_substring_keyword_is_literal_not_a_pattern() {
        let matcher = KeywordMatcher::new("a.b");
        assert!(matcher.matches(&file("xa.by.txt", 1, 0.0)));
        assert!(!matcher.matches(&file("aXb.txt", 1, 0.0)));
    }

    #[test]
    fn test_first_matching_keyword_wins_over_later_ones() {
        let rule = CompiledCustom {
            matchers: vec![KeywordMatcher::new(".docx"), KeywordMatcher::new("report")],
        };
        let destination = evaluate_custom(&file("report_v2.docx", 1, 0.0), &rule);
        assert_eq!(destination.as_deref(), Some("extension-docx"));
    }

    #[test]
    fn test_size_greater_than_is_strict() {
        let rule = size_rule(Some(SizeMode::GreaterThan), Some(json!(10)), None);
        // exactly 10 KiB fails the strict comparison
        assert_eq!(evaluate_size(&file("a", 10 * 1024, 0.0), &rule).unwrap(), None);
        assert_eq!(
            evaluate_size(&file("a", 10 * 1024 + 1, 0.0), &rule)
                .unwrap()
                .as_deref(),
            Some("larger-than-10KiB")
        );
    }

    #[test]
    fn test_size_less_than_uses_value2() {
        let rule = size_rule(Some(SizeMode::LessThan), None, Some(json!(1)));
        assert!(evaluate_size(&file("a", 512, 0.0), &rule).unwrap().is_some());
        assert!(evaluate_size(&file("a", 1024, 0.0), &rule).unwrap().is_none());
    }

    #[test]
    fn test_size_between_is_strict_on_both_sides() {
        let rule = size_rule(Some(SizeMode::Between), Some(json!(1)), Some(json!(3)));
        assert!(evaluate_size(&file("a", 1024, 0.0), &rule).unwrap().is_none());
        assert_eq!(
            evaluate_size(&file("a", 2048, 0.0), &rule).unwrap().as_deref(),
            Some("between-1-and-3KiB")
        );
        assert!(evaluate_size(&file("a", 3072, 0.0), &rule).unwrap().is_none());
    }

    #[test]
    fn test_non_numeric_threshold_is_invalid_rule_value() {
        let rule = size_rule(Some(SizeMode::GreaterThan), Some(json!("ten")), None);
        let err = evaluate_size(&file("a", 2048, 0.0), &rule).unwrap_err();
        let EvalError::InvalidRuleValue { rule, .. } = err;
        assert_eq!(rule, RuleKind::Size);
    }

    #[test]
    fn test_missing_mode_is_invalid_rule_value() {
        let rule = size_rule(None, Some(json!(10)), None);
        assert!(evaluate_size(&file("a", 2048, 0.0), &rule).is_err());
    }

    #[test]
    fn test_time_classification_is_strict() {
        let rule = time_rule(Some(json!(1000)), Some(json!(2000)));
        assert!(evaluate_time(&file("a", 1, 1000.0), &rule).unwrap().is_none());
        assert!(evaluate_time(&file("a", 1, 1500.0), &rule).unwrap().is_some());
        assert!(evaluate_time(&file("a", 1, 2000.0), &rule).unwrap().is_none());
    }

    #[test]
    fn test_time_bounds_accept_rfc3339_strings() {
        let rule = time_rule(
            Some(json!("2024-01-01T00:00:00Z")),
            Some(json!("2024-02-01T00:00:00Z")),
        );
        let mid = 1705276800.0; // 2024-01-15
        assert_eq!(
            evaluate_time(&file("a", 1, mid), &rule).unwrap().as_deref(),
            Some("modified-20240101-to-20240201")
        );
    }

    #[test]
    fn test_time_missing_bound_is_invalid_rule_value() {
        let rule = time_rule(Some(json!(1000)), None);
        assert!(evaluate_time(&file("a", 1, 1500.0), &rule).is_err());
    }

    #[test]
    fn test_default_rule_routes_by_extension() {
        let rule = DefaultRule::default();
        assert_eq!(
            evaluate_default(&file("photo.jpg", 1, 0.0), &rule).as_deref(),
            Some("images")
        );
        assert_eq!(
            evaluate_default(&file("clip.mkv", 1, 0.0), &rule).as_deref(),
            Some("videos")
        );
        assert_eq!(
            evaluate_default(&file("notes.txt", 1, 0.0), &rule).as_deref(),
            Some("documents")
        );
        assert_eq!(
            evaluate_default(&file("archive.zip", 1, 0.0), &rule).as_deref(),
            Some("others")
        );
        assert_eq!(
            evaluate_default(&file("README", 1, 0.0), &rule).as_deref(),
            Some("others")
        );
    }

    #[test]
    fn test_default_rule_extension_lookup_is_case_insensitive() {
        let rule = DefaultRule::default();
        assert_eq!(
            evaluate_default(&file("PHOTO.JPG", 1, 0.0), &rule).as_deref(),
            Some("images")
        );
    }

    #[test]
    fn test_disabled_category_falls_through_to_others() {
        let rule = DefaultRule {
            images: false,
            ..DefaultRule::default()
        };
        assert_eq!(
            evaluate_default(&file("photo.jpg", 1, 0.0), &rule).as_deref(),
            Some("others")
        );
    }

    #[test]
    fn test_disabled_category_without_others_is_no_match() {
        let rule = DefaultRule {
            images: false,
            others: false,
            ..DefaultRule::default()
        };
        assert_eq!(evaluate_default(&file("photo.jpg", 1, 0.0), &rule), None);
        assert_eq!(evaluate_default(&file("archive.zip", 1, 0.0), &rule), None);
    }

    #[test]
    fn test_time_filter_is_inclusive() {
        let rule = time_rule(Some(json!(1000)), Some(json!(2000)));
        assert!(time_filter_passes(&file("a", 1, 1000.0), &rule));
        assert!(time_filter_passes(&file("a", 1, 2000.0), &rule));
        assert!(!time_filter_passes(&file("a", 1, 999.0), &rule));
        assert!(!time_filter_passes(&file("a", 1, 2001.0), &rule));
    }

    #[test]
    fn test_time_filter_missing_bound_rejects() {
        let rule = time_rule(Some(json!(1000)), None);
        assert!(!time_filter_passes(&file("a", 1, 1500.0), &rule));
    }

    #[test]
    fn test_size_filter_less_than_one_kib_rejects_larger_file() {
        let rule = size_rule(Some(SizeMode::LessThan), None, Some(json!(1)));
        assert!(!size_filter_passes(&file("a", 2048, 0.0), &rule));
        assert!(size_filter_passes(&file("a", 100, 0.0), &rule));
    }

    #[test]
    fn test_size_filter_malformed_threshold_rejects() {
        let rule = size_rule(Some(SizeMode::GreaterThan), Some(json!([1, 2])), None);
        assert!(!size_filter_passes(&file("a", 2048, 0.0), &rule));
    }

    #[test]
    fn test_bucket_names_trim_integral_thresholds() {
        let rule = size_rule(Some(SizeMode::GreaterThan), Some(json!(100.0)), None);
        assert_eq!(size_bucket_name(&rule).as_deref(), Some("larger-than-100KiB"));

        let rule = size_rule(Some(SizeMode::LessThan), None, Some(json!(0.5)));
        assert_eq!(size_bucket_name(&rule).as_deref(), Some("smaller-than-0.5KiB"));
    }

    #[test]
    fn test_bucket_name_none_when_threshold_unusable() {
        let rule = size_rule(Some(SizeMode::GreaterThan), Some(json!("ten")), None);
        assert_eq!(size_bucket_name(&rule), None);
    }

    #[test]
    fn test_file_entry_stem_and_extension() {
        let entry = file("report_v2.docx", 1, 0.0);
        assert_eq!(entry.stem(), "report_v2");
        assert_eq!(entry.extension(), Some("docx"));

        let entry = file("README", 1, 0.0);
        assert_eq!(entry.stem(), "README");
        assert_eq!(entry.extension(), None);
    }
}
