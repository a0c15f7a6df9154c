//! Breaking change policy: which categories run and what is excluded.
//!
//! `BreakingConfig` is the serialized form read from YAML or JSON.
//! `Policy` is the validated form the engine runs with; every policy error
//! surfaces from [`Policy::compile`], before any comparison starts.

use crate::compat::categories::{BreakingCategory, CategorySet};
use crate::compat::correlate::{CorrelateOptions, CorrespondenceNode};
use crate::compat::error::BreakingError;
use crate::compat::rule_registry::{self, Rule};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Configuration for breaking change detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakingConfig {
    /// Categories to enable
    pub use_categories: Vec<String>,
    /// Rules to explicitly disable
    pub except_rules: Vec<String>,
    /// File paths, directories or globs to ignore
    pub ignore: Vec<String>,
    /// Fully-qualified symbols to ignore, with everything nested in them
    pub ignore_symbols: Vec<String>,
    /// Rule-specific file ignores
    pub ignore_only: BTreeMap<String, Vec<String>>,
    /// Whether to ignore unstable packages
    pub ignore_unstable_packages: bool,
    /// Version suffixes that mark a package as unstable (`v1alpha1`, `v2beta`)
    pub unstable_markers: Vec<String>,
    /// Accept a renamed enum value when the enum allows aliases and one of
    /// the old names is still bound to the number
    pub enum_alias_leniency: bool,
    /// Leave imported files out of the comparison
    pub exclude_imports: bool,
    /// Only compare files that still exist in the new image
    pub limit_to_input_files: bool,
}

impl Default for BreakingConfig {
    fn default() -> Self {
        Self {
            use_categories: vec!["FILE".to_string(), "PACKAGE".to_string()],
            except_rules: Vec::new(),
            ignore: Vec::new(),
            ignore_symbols: Vec::new(),
            ignore_only: BTreeMap::new(),
            ignore_unstable_packages: false,
            unstable_markers: vec!["alpha".to_string(), "beta".to_string(), "test".to_string()],
            enum_alias_leniency: true,
            exclude_imports: true,
            limit_to_input_files: false,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    #[allow(dead_code)]
    version: Option<String>,
    #[serde(default)]
    breaking: Option<BreakingConfig>,
}

impl BreakingConfig {
    /// Load configuration from a YAML or JSON file, chosen by extension.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        let parsed = if path.extension().is_some_and(|e| e == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        };
        parsed.with_context(|| format!("Invalid config '{}'", path.display()))
    }

    /// Load configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(yaml)?;
        Ok(config_file.breaking.unwrap_or_default())
    }

    /// Load configuration from JSON string
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config_file: ConfigFile = serde_json::from_str(json)?;
        Ok(config_file.breaking.unwrap_or_default())
    }
}

/// Validated policy used by the engine and the collector.
#[derive(Debug, Clone)]
pub struct Policy {
    categories: CategorySet,
    except_rules: HashSet<String>,
    ignore: Option<GlobSet>,
    ignore_symbols: Vec<String>,
    ignore_only: HashMap<String, GlobSet>,
    ignore_unstable_packages: bool,
    unstable_markers: Vec<String>,
    enum_alias_leniency: bool,
    correlate: CorrelateOptions,
}

impl Policy {
    pub fn compile(config: &BreakingConfig) -> Result<Self, BreakingError> {
        let mut categories = CategorySet::default();
        for id in &config.use_categories {
            let category = BreakingCategory::from_id(id.trim())
                .ok_or_else(|| BreakingError::UnknownCategory(id.clone()))?;
            categories.insert(category);
        }
        if categories.is_empty() {
            return Err(BreakingError::EmptyCategories);
        }

        for name in config.except_rules.iter().chain(config.ignore_only.keys()) {
            if rule_registry::find_rule(name).is_none() {
                return Err(BreakingError::UnknownRule(name.clone()));
            }
        }

        let mut ignore_only = HashMap::new();
        for (rule, patterns) in &config.ignore_only {
            if let Some(set) = compile_globset(patterns)? {
                ignore_only.insert(rule.clone(), set);
            }
        }

        Ok(Self {
            categories,
            except_rules: config.except_rules.iter().cloned().collect(),
            ignore: compile_globset(&config.ignore)?,
            ignore_symbols: config
                .ignore_symbols
                .iter()
                .map(|s| s.trim_start_matches('.').to_string())
                .collect(),
            ignore_only,
            ignore_unstable_packages: config.ignore_unstable_packages,
            unstable_markers: config.unstable_markers.clone(),
            enum_alias_leniency: config.enum_alias_leniency,
            correlate: CorrelateOptions {
                exclude_imports: config.exclude_imports,
                limit_to_input_files: config.limit_to_input_files,
            },
        })
    }

    pub fn categories(&self) -> CategorySet {
        self.categories
    }

    pub fn correlate_options(&self) -> &CorrelateOptions {
        &self.correlate
    }

    pub fn enum_alias_leniency(&self) -> bool {
        self.enum_alias_leniency
    }

    /// Whether `rule` takes part in a run under this policy.
    pub fn is_rule_enabled(&self, rule: &Rule) -> bool {
        !self.except_rules.contains(rule.name)
            && rule.categories.iter().any(|c| self.categories.contains(*c))
    }

    pub fn is_file_ignored(&self, path: &str) -> bool {
        self.ignore.as_ref().is_some_and(|set| set.is_match(path))
    }

    /// Matches the symbol itself and everything nested under it.
    pub fn is_symbol_ignored(&self, symbol: &str) -> bool {
        self.ignore_symbols.iter().any(|ignored| {
            symbol == ignored
                || symbol
                    .strip_prefix(ignored.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn is_rule_ignored_for(&self, rule: &str, path: &str) -> bool {
        self.ignore_only
            .get(rule)
            .is_some_and(|set| set.is_match(path))
    }

    pub fn is_unstable_package(&self, package: &str) -> bool {
        package
            .split('.')
            .any(|segment| is_unstable_segment(segment, &self.unstable_markers))
    }

    /// Whether the walker skips `node` and its subtree.
    pub fn skips(&self, node: &CorrespondenceNode<'_>) -> bool {
        self.is_file_ignored(node.file_path())
            || (self.ignore_unstable_packages && self.is_unstable_package(node.package()))
            || (!self.ignore_symbols.is_empty() && self.is_symbol_ignored(&node.symbol()))
    }
}

impl Default for Policy {
    fn default() -> Self {
        let mut categories = CategorySet::default();
        categories.insert(BreakingCategory::File);
        categories.insert(BreakingCategory::Package);
        let config = BreakingConfig::default();
        Self {
            categories,
            except_rules: HashSet::new(),
            ignore: None,
            ignore_symbols: Vec::new(),
            ignore_only: HashMap::new(),
            ignore_unstable_packages: false,
            unstable_markers: config.unstable_markers,
            enum_alias_leniency: true,
            correlate: CorrelateOptions::default(),
        }
    }
}

/// `v<digits><marker>...`, e.g. `v1alpha1` or `v2beta`.
fn is_unstable_segment(segment: &str, markers: &[String]) -> bool {
    let Some(rest) = segment.strip_prefix('v') else {
        return false;
    };
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    let suffix = &rest[digits..];
    markers.iter().any(|m| !m.is_empty() && suffix.starts_with(m.as_str()))
}

/// Plain paths also match everything below them, so `foo` ignores `foo/a.proto`.
fn compile_globset(patterns: &[String]) -> Result<Option<GlobSet>, BreakingError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim_end_matches('/');
        for candidate in [trimmed.to_string(), format!("{trimmed}/**")] {
            let glob = Glob::new(&candidate).map_err(|source| BreakingError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
    }
    builder
        .build()
        .map(Some)
        .map_err(|source| BreakingError::InvalidGlob {
            pattern: patterns.join(","),
            source,
        })
}
