// piiscan-core/src/engines/rule_engine.rs
//! A `ClassificationEngine` that combines configured rules with the built-in detectors.
//!
//! For each value the engine:
//! 1. skips configured columns and blank values,
//! 2. reads `^` as a space,
//! 3. drops values on the exact-match allow-list,
//! 4. answers from a bounded per-field cache when it can,
//! 5. evaluates custom rules in priority order, stopping as soon as one ignores the value,
//! 6. runs the built-in detectors.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use log::{debug, info};
use lru::LruCache;

use crate::allowlist::{load_allow_list, CsvAllowList};
use crate::config::{ScannerOptions, DEFAULT_VALIDATION_CACHE_LIMIT};
use crate::engine::{ClassificationEngine, ValidationStats};
use crate::engines::detectors::{detect, DetectorSettings};
use crate::errors::Result;
use crate::failure::{log_failure_part_debug, loggable, FailurePart};
use crate::rules::{sort_by_priority, AllowlistRule, AppliableRule, Rule, RuleAction, RuleSet};

type FieldCache = Arc<Mutex<LruCache<String, Arc<[FailurePart]>>>>;

pub struct RuleEngine {
    skip_columns: HashSet<String>,
    /// Lower-cased, trimmed values.
    allow_list: HashSet<String>,
    custom_rules: Vec<Rule>,
    allowlist_rules: Vec<AllowlistRule>,
    detectors: DetectorSettings,
    cache_limit: usize,
    caches: DashMap<String, FieldCache>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    parts_found: AtomicU64,
}

impl RuleEngine {
    /// An engine with default options: every detector on, caching enabled.
    pub fn new(rule_set: RuleSet) -> Self {
        let mut custom_rules = rule_set.custom_rules();
        sort_by_priority(&mut custom_rules);
        Self {
            skip_columns: HashSet::new(),
            allow_list: HashSet::new(),
            custom_rules,
            allowlist_rules: rule_set.allowlist_rules,
            detectors: DetectorSettings::default(),
            cache_limit: DEFAULT_VALIDATION_CACHE_LIMIT,
            caches: DashMap::new(),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            parts_found: AtomicU64::new(0),
        }
    }

    /// Applies the toggles, skip list and cache limit from `options`.
    /// `allow_list` is expected to be lower-cased and trimmed, as produced by
    /// [`load_allow_list`].
    pub fn with_options(rule_set: RuleSet, options: &ScannerOptions, allow_list: HashSet<String>) -> Result<Self> {
        rule_set.validate()?;
        let mut engine = Self::new(rule_set);
        engine.skip_columns = options.skip_columns_set();
        engine.allow_list = allow_list;
        engine.detectors = DetectorSettings {
            ignore_postcodes: options.ignore_postcodes,
            ignore_dates_in_text: options.ignore_dates_in_text,
        };
        engine.cache_limit = options.validation_cache_limit;
        info!(
            "Classification engine ready: {} custom rules, {} allowlist rules, {} allow list entries, cache limit {}",
            engine.custom_rules.len(),
            engine.allowlist_rules.len(),
            engine.allow_list.len(),
            engine.cache_limit
        );
        Ok(engine)
    }

    /// Loads rules and the optional allow-list file named by `options`.
    pub fn from_options(options: &ScannerOptions) -> Result<Self> {
        let rule_set = options.rule_source()?.load()?;
        let allow_list = match &options.allow_list_file {
            Some(path) => load_allow_list(&CsvAllowList::new(path))?,
            None => HashSet::new(),
        };
        Self::with_options(rule_set, options, allow_list)
    }

    pub fn custom_rules(&self) -> &[Rule] {
        &self.custom_rules
    }

    fn is_allowlisted(&self, field_name: &str, field_value: &str, part: &FailurePart) -> Result<bool> {
        for rule in &self.allowlist_rules {
            if rule.apply_to_part(field_name, field_value, part)? == RuleAction::Ignore {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Rules then detectors, with no cache involved.
    fn compute(&self, field_name: &str, field_value: &str) -> Result<Vec<FailurePart>> {
        let mut parts = Vec::new();

        for rule in &self.custom_rules {
            let (action, found) = rule.apply(field_name, field_value)?;
            match action {
                RuleAction::None => {}
                RuleAction::Ignore => {
                    debug!("Value of field '{}' ignored by rule", field_name);
                    return Ok(Vec::new());
                }
                RuleAction::Report => {
                    for part in found {
                        if self.is_allowlisted(field_name, field_value, &part)? {
                            debug!("Allowlist rule suppressed '{}' in field '{}'", loggable(&part.word), field_name);
                            continue;
                        }
                        log_failure_part_debug(module_path!(), field_name, &part);
                        parts.push(part);
                    }
                }
            }
        }

        parts.extend(detect(field_value, self.detectors));
        Ok(parts)
    }

    fn field_cache(&self, field_name: &str, capacity: NonZeroUsize) -> FieldCache {
        if let Some(existing) = self.caches.get(field_name) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .caches
            .entry(field_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(LruCache::new(capacity))));
        Arc::clone(entry.value())
    }

    fn cached_compute(&self, field_name: &str, value: String) -> Result<Vec<FailurePart>> {
        let Some(capacity) = NonZeroUsize::new(self.cache_limit) else {
            return self.compute(field_name, &value);
        };
        let cache = self.field_cache(field_name, capacity);

        if let Some(hit) = cache.lock().unwrap_or_else(PoisonError::into_inner).get(&value) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.to_vec());
        }

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let fresh = self.compute(field_name, &value)?;
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(value, Arc::from(fresh.clone()));
        Ok(fresh)
    }
}

impl ClassificationEngine for RuleEngine {
    fn validate(&self, field_name: &str, field_value: &str) -> Result<Vec<FailurePart>> {
        if self.skip_columns.contains(&field_name.to_lowercase()) || field_value.trim().is_empty() {
            return Ok(Vec::new());
        }

        let value = field_value.replace('^', " ");

        if !self.allow_list.is_empty() && self.allow_list.contains(&value.trim().to_lowercase()) {
            return Ok(Vec::new());
        }

        let parts = self.cached_compute(field_name, value)?;
        self.parts_found.fetch_add(parts.len() as u64, Ordering::Relaxed);
        Ok(parts)
    }

    fn stats(&self) -> ValidationStats {
        ValidationStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            parts_found: self.parts_found.load(Ordering::Relaxed),
        }
    }
}

impl Drop for RuleEngine {
    fn drop(&mut self) {
        info!("Classification engine finished: {}", self.stats());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Classification;
    use crate::rules::RegexRule;

    fn engine_with(rules: Vec<RegexRule>) -> RuleEngine {
        RuleEngine::new(RuleSet {
            basic_rules: rules,
            ..Default::default()
        })
    }

    #[test]
    fn test_caret_is_read_as_space() {
        let engine = engine_with(vec![]);
        let parts = engine.validate("Address", "lives^at^DD3 7LB").unwrap();
        assert_eq!(parts, vec![FailurePart::new("DD3 7LB", Classification::Postcode, 9)]);
    }

    #[test]
    fn test_skip_columns_and_blank_values() {
        let options = ScannerOptions {
            skip_columns: Some("PatientID".into()),
            ..Default::default()
        };
        let engine = RuleEngine::with_options(RuleSet::default(), &options, HashSet::new()).unwrap();
        assert!(engine.validate("patientid", "0101010101").unwrap().is_empty());
        assert!(engine.validate("Notes", "   ").unwrap().is_empty());
        assert_eq!(engine.validate("Notes", "0101010101").unwrap().len(), 1);
    }

    #[test]
    fn test_exact_allow_list_is_case_insensitive() {
        let allow: HashSet<String> = ["dd3 7lb".to_string()].into_iter().collect();
        let engine = RuleEngine::with_options(RuleSet::default(), &ScannerOptions::default(), allow).unwrap();
        assert!(engine.validate("Notes", " DD3 7LB ").unwrap().is_empty());
        assert_eq!(engine.validate("Notes", "at DD3 7LB").unwrap().len(), 1);
    }

    #[test]
    fn test_rule_parts_come_before_detector_parts() {
        let engine = engine_with(vec![
            RegexRule::new(RuleAction::Report, None, "Smith").with_classification(Classification::Person),
        ]);
        let parts = engine.validate("Notes", "Smith at DD3 7LB").unwrap();
        assert_eq!(
            parts,
            vec![
                FailurePart::new("Smith", Classification::Person, 0),
                FailurePart::new("DD3 7LB", Classification::Postcode, 9),
            ]
        );
    }

    #[test]
    fn test_zero_cache_limit_disables_caching() {
        let options = ScannerOptions {
            validation_cache_limit: 0,
            ..Default::default()
        };
        let engine = RuleEngine::with_options(RuleSet::default(), &options, HashSet::new()).unwrap();
        engine.validate("Notes", "DD3 7LB").unwrap();
        engine.validate("Notes", "DD3 7LB").unwrap();
        let stats = engine.stats();
        assert_eq!(stats.lookups(), 0);
        assert_eq!(stats.parts_found, 2);
    }
}
