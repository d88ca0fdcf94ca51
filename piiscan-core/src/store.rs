// piiscan-core/src/store.rs
//! A YAML-backed, append-only collection of [`RegexRule`]s.
//!
//! Every added rule is appended to the file together with an attribution comment
//! (`#<actor> - <timestamp>`). Deleting or undoing a rule replaces the exact text
//! that was written for it with `# Rule deleted by <actor> - <timestamp>`, so the
//! file keeps a readable history of who changed what.
//!
//! The store is not meant for concurrent mutation; callers serialise `add`,
//! `delete` and `undo`.
//!
//! License: MIT OR APACHE 2.0

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use log::{debug, info, warn};

use crate::errors::{PiiScanError, Result};
use crate::failure::Failure;
use crate::generator::RegexRuleGenerator;
use crate::rules::{AppliableRule, RegexRule, RuleAction};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of attribution timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The current UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Always the same instant; used to make rule files reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// The name written into attribution comments.
pub fn current_actor() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_blank(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|l| l.is_empty() || l.starts_with('#'))
}

/// Reads a rule file. A missing file is created empty when `create_if_missing` is set.
pub fn load_rules(path: &Path, create_if_missing: bool) -> Result<Vec<RegexRule>> {
    if !path.exists() {
        if !create_if_missing {
            return Err(PiiScanError::config(format!("Rules file {} does not exist", path.display())));
        }
        info!("Creating empty rules file {}", path.display());
        fs::File::create(path)?;
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    if is_blank(&content) {
        return Ok(Vec::new());
    }
    let rules: Vec<RegexRule> = serde_yml::from_str(&content).map_err(|e| PiiScanError::yaml(path, e))?;
    rules.iter().try_for_each(RegexRule::validate)?;
    Ok(rules)
}

/// Serialises a single rule as a one-element YAML sequence, omitting default values.
pub fn serialize_rule(rule: &RegexRule) -> Result<String> {
    serde_yml::to_string(&[rule]).map_err(|e| PiiScanError::SerializationError(e.to_string()))
}

pub struct RuleStore {
    path: PathBuf,
    generator: RegexRuleGenerator,
    clock: Box<dyn Clock>,
    actor: String,
    read_only: bool,
    rules: Vec<RegexRule>,
    /// Text written for `rules[i]` during this session, if it was added by this store.
    written: Vec<Option<String>>,
    /// Most recent last.
    history: Vec<(RegexRule, String)>,
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStore")
            .field("path", &self.path)
            .field("rules", &self.rules.len())
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl RuleStore {
    pub fn open(
        path: impl Into<PathBuf>,
        generator: RegexRuleGenerator,
        clock: Box<dyn Clock>,
        create_if_missing: bool,
    ) -> Result<Self> {
        let path = path.into();
        let rules = load_rules(&path, create_if_missing)?;
        debug!("Opened rule store {} with {} rules", path.display(), rules.len());
        Ok(Self {
            written: vec![None; rules.len()],
            path,
            generator,
            clock,
            actor: current_actor(),
            read_only: false,
            rules,
            history: Vec::new(),
        })
    }

    /// A store whose rules can be queried but never changed.
    pub fn open_read_only(path: impl Into<PathBuf>, generator: RegexRuleGenerator) -> Result<Self> {
        let mut store = Self::open(path, generator, Box::new(SystemClock), false)?;
        store.read_only = true;
        Ok(store)
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn generator(&self) -> &RegexRuleGenerator {
        &self.generator
    }

    pub fn contains(&self, rule: &RegexRule) -> bool {
        self.rules.iter().any(|r| r.is_equivalent(rule))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            Err(PiiScanError::ReadOnlyStore)
        } else {
            Ok(())
        }
    }

    fn stamp(&self) -> String {
        self.clock.now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// Appends `rule` unless an equivalent rule is already stored.
    /// Returns whether anything was written.
    pub fn add(&mut self, rule: RegexRule) -> Result<bool> {
        self.ensure_writable()?;
        if self.contains(&rule) {
            debug!("Rule for column {:?} already present; not adding", rule.if_column);
            return Ok(false);
        }
        rule.validate()?;

        let entry = format!("#{} - {}\n{}", self.actor, self.stamp(), serialize_rule(&rule)?);
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(entry.as_bytes())?;
        file.flush()?;

        self.rules.push(rule.clone());
        self.written.push(Some(entry.clone()));
        self.history.push((rule, entry));
        Ok(true)
    }

    /// Removes the stored rule equivalent to `rule`. Returns whether one was found.
    pub fn delete(&mut self, rule: &RegexRule) -> Result<bool> {
        self.ensure_writable()?;
        let Some(index) = self.rules.iter().position(|r| r.is_equivalent(rule)) else {
            return Ok(false);
        };

        let text = match &self.written[index] {
            Some(entry) => entry.clone(),
            None => serialize_rule(&self.rules[index])?,
        };
        self.replace_in_file(&text)?;

        let removed = self.rules.remove(index);
        self.written.remove(index);
        self.history.retain(|(r, _)| !r.is_equivalent(&removed));
        Ok(true)
    }

    /// Reverts the most recent `add` of this session. A no-op when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<RegexRule>> {
        self.ensure_writable()?;
        let Some((_, entry)) = self.history.last() else {
            return Ok(None);
        };
        self.replace_in_file(entry)?;

        let Some((rule, _)) = self.history.pop() else {
            return Ok(None);
        };
        if let Some(index) = self.rules.iter().rposition(|r| r.is_equivalent(&rule)) {
            self.rules.remove(index);
            self.written.remove(index);
        }
        Ok(Some(rule))
    }

    /// Removes every rule and truncates the file.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_writable()?;
        fs::File::create(&self.path)?;
        self.rules.clear();
        self.written.clear();
        self.history.clear();
        Ok(())
    }

    fn replace_in_file(&self, text: &str) -> Result<()> {
        let comment = format!("# Rule deleted by {} - {}\n", self.actor, self.stamp());
        let old = fs::read_to_string(&self.path)?;
        if !old.contains(text) {
            warn!("Could not find the serialized rule in {}", self.path.display());
            return Err(PiiScanError::RuleTextNotFound(self.path.clone()));
        }
        fs::write(&self.path, old.replacen(text, &comment, 1))?;
        Ok(())
    }

    /// The first rule, in collection order, that acts on the failure's field and value.
    pub fn has_rule_covering(&self, failure: &Failure) -> Result<Option<&RegexRule>> {
        for rule in &self.rules {
            let (action, _) = rule.apply(&failure.problem_field, &failure.problem_value)?;
            if action != RuleAction::None {
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }

    /// Proposes a rule for `failure` without adding it.
    pub fn default_rule_for(&self, failure: &Failure) -> Result<RegexRule> {
        self.generator.generate_for(failure)
    }
}
