// piiscan-core/src/rules/rule_set.rs
//! Loading bundles of rules from YAML files or directories of YAML files.
//!
//! License: MIT OR APACHE 2.0

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::{PiiScanError, Result};
use crate::rules::{AllowlistRule, ConsensusRule, RegexRule, Rule, SocketRule};

/// The on-disk shape, where the absence of every key can be told apart from empty lists.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRuleSet {
    basic_rules: Option<Vec<RegexRule>>,
    socket_rules: Option<Vec<SocketRule>>,
    allowlist_rules: Option<Vec<AllowlistRule>>,
    consensus_rules: Option<Vec<ConsensusRule>>,
}

/// A bundle of rules loaded from one configuration source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub basic_rules: Vec<RegexRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub socket_rules: Vec<SocketRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowlist_rules: Vec<AllowlistRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consensus_rules: Vec<ConsensusRule>,
}

/// Where rules come from. Exactly one source may be configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    File(PathBuf),
    Directory(PathBuf),
}

impl RuleSource {
    pub fn from_paths(file: Option<&Path>, directory: Option<&Path>) -> Result<Self> {
        match (file, directory) {
            (Some(f), None) => Ok(RuleSource::File(f.to_path_buf())),
            (None, Some(d)) => Ok(RuleSource::Directory(d.to_path_buf())),
            (None, None) => Err(PiiScanError::config("No rules source specified: set a rules file or a rules directory")),
            (Some(_), Some(_)) => Err(PiiScanError::config(
                "Both a rules file and a rules directory were specified; only one is allowed",
            )),
        }
    }

    pub fn load(&self) -> Result<RuleSet> {
        match self {
            RuleSource::File(p) => RuleSet::load_from_file(p),
            RuleSource::Directory(d) => RuleSet::load_from_directory(d),
        }
    }
}

fn is_blank_yaml(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|l| l.is_empty() || l.starts_with('#') || l == "---")
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.basic_rules.len() + self.socket_rules.len() + self.allowlist_rules.len() + self.consensus_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses one YAML document. Blank or comment-only content yields an empty set;
    /// a document naming none of the rule keys is rejected.
    pub fn load_from_str(content: &str, origin: &Path) -> Result<Self> {
        if is_blank_yaml(content) {
            return Ok(Self::default());
        }
        let raw: RawRuleSet = serde_yml::from_str(content).map_err(|e| PiiScanError::yaml(origin, e))?;
        if raw.basic_rules.is_none()
            && raw.socket_rules.is_none()
            && raw.allowlist_rules.is_none()
            && raw.consensus_rules.is_none()
        {
            return Err(PiiScanError::config(format!(
                "{} contains none of BasicRules, SocketRules, AllowlistRules or ConsensusRules",
                origin.display()
            )));
        }
        let set = Self {
            basic_rules: raw.basic_rules.unwrap_or_default(),
            socket_rules: raw.socket_rules.unwrap_or_default(),
            allowlist_rules: raw.allowlist_rules.unwrap_or_default(),
            consensus_rules: raw.consensus_rules.unwrap_or_default(),
        };
        set.validate()?;
        Ok(set)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PiiScanError::config(format!("Rules file not found: {}", path.display())));
        }
        let content = fs::read_to_string(path)?;
        let set = Self::load_from_str(&content, path)?;
        info!("Loaded {} rules from {}", set.len(), path.display());
        Ok(set)
    }

    /// Merges every `*.yaml` / `*.yml` file in `dir`, in file-name order.
    pub fn load_from_directory(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(PiiScanError::config(format!("Rules directory not found: {}", dir.display())));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .map_or(false, |e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            })
            .collect();
        files.sort();

        let mut merged = Self::default();
        for file in &files {
            debug!("Loading rules from {}", file.display());
            let content = fs::read_to_string(file)?;
            merged.merge(Self::load_from_str(&content, file)?);
        }

        if merged.is_empty() {
            return Err(PiiScanError::config(format!(
                "No rules found in {} ({} YAML files examined)",
                dir.display(),
                files.len()
            )));
        }
        info!("Loaded {} rules from {} files in {}", merged.len(), files.len(), dir.display());
        Ok(merged)
    }

    pub fn merge(&mut self, other: RuleSet) {
        self.basic_rules.extend(other.basic_rules);
        self.socket_rules.extend(other.socket_rules);
        self.allowlist_rules.extend(other.allowlist_rules);
        self.consensus_rules.extend(other.consensus_rules);
    }

    /// Compiles every pattern so that bad rules fail before scanning.
    pub fn validate(&self) -> Result<()> {
        self.basic_rules.iter().try_for_each(RegexRule::validate)?;
        self.allowlist_rules.iter().try_for_each(AllowlistRule::validate)?;
        self.consensus_rules
            .iter()
            .flat_map(|c| c.rules.iter())
            .try_for_each(Rule::validate)
    }

    /// The rules evaluated against whole values, in configuration order.
    pub fn custom_rules(&self) -> Vec<Rule> {
        self.basic_rules
            .iter()
            .cloned()
            .map(Rule::RegexRule)
            .chain(self.consensus_rules.iter().cloned().map(Rule::ConsensusRule))
            .chain(self.socket_rules.iter().cloned().map(Rule::SocketRule))
            .collect()
    }
}
