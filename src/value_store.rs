// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The value store: per-option ordered value lists tagged with the source
//! that supplied them, resolved under write-time command-line >
//! environment > configuration-file > default precedence. A
//! higher-precedence write replaces whatever a lower-precedence source
//! already stored, so this module keeps one list per option and overwrites
//! it in place rather than resolving precedence at query time.

use std::collections::HashMap;

use crate::error::GetoptError;

/// Where a value came from. Ranked low to high; a `set()` from a
/// higher-ranked source always replaces a lower-ranked source's values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Source {
    Default,
    Configuration,
    Environment,
    CommandLine,
    /// A direct, programmatic assignment (e.g. via a future `set_string`
    /// API); outranks everything, including the command line.
    Direct,
}

impl Source {
    fn rank(self) -> u8 {
        match self {
            Source::Default => 0,
            Source::Configuration => 1,
            Source::Environment => 2,
            Source::CommandLine => 3,
            Source::Direct => 4,
        }
    }
}

/// One option's accumulated values, plus the source that last wrote them.
#[derive(Clone, Debug, Default)]
pub struct ValueList {
    values: Vec<String>,
    source: Option<Source>,
}

impl ValueList {
    pub fn is_defined(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<Source> {
        self.source
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Writes `value` under `source`. If `source` outranks (or equals) the
    /// rank that currently owns this list, and `append` is false, the
    /// existing values are replaced; otherwise (same or higher rank with
    /// `append` true, as when MULTIPLE accumulates several command-line
    /// occurrences) the value is appended. A write from a *lower*-ranked
    /// source than the one already recorded is silently ignored — a
    /// configuration file may never override a value already set by the
    /// environment or command line.
    fn write(&mut self, source: Source, value: String, append: bool) {
        match self.source {
            Some(existing) if existing.rank() > source.rank() => {
                // Lower-precedence source arriving after a higher one
                // already wrote: ignored.
            }
            Some(existing) if existing.rank() == source.rank() && append => {
                self.values.push(value);
            }
            _ => {
                self.values.clear();
                self.values.push(value);
                self.source = Some(source);
            }
        }
    }

    fn reset(&mut self) {
        self.values.clear();
        self.source = None;
    }
}

/// A secondary registry of section names and keys seen while loading
/// configuration files, used to validate `section::leaf` option names and
/// to report unknown sections or keys. Tracks first-seen order for
/// sections alongside a set for fast membership checks, since the
/// `configuration_sections` pseudo-option exposes these in the order each
/// section header was first encountered.
#[derive(Default)]
pub struct SectionRegistry {
    known: std::collections::HashSet<String>,
    order: Vec<String>,
    keys: HashMap<String, std::collections::HashSet<String>>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `section` if not already known. Returns `true` the first
    /// time a given name is seen, `false` on every later repeat.
    pub fn register(&mut self, section: &str) -> bool {
        if self.known.insert(section.to_string()) {
            self.order.push(section.to_string());
            true
        } else {
            false
        }
    }

    /// Records that `key` was assigned within `section`.
    pub fn register_key(&mut self, section: &str, key: &str) {
        self.keys.entry(section.to_string()).or_default().insert(key.to_string());
    }

    pub fn contains(&self, section: &str) -> bool {
        self.known.contains(section)
    }

    pub fn iter_known(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The set of keys observed within `section`, if any were recorded.
    pub fn keys_for(&self, section: &str) -> Option<&std::collections::HashSet<String>> {
        self.keys.get(section)
    }
}

/// The value store proper: one [`ValueList`] per catalog entry index, plus
/// the [`SectionRegistry`] shared across configuration-file reads.
pub struct ValueStore {
    lists: HashMap<usize, ValueList>,
    sections: SectionRegistry,
}

impl ValueStore {
    pub fn new() -> Self {
        Self {
            lists: HashMap::new(),
            sections: SectionRegistry::new(),
        }
    }

    pub fn sections_mut(&mut self) -> &mut SectionRegistry {
        &mut self.sections
    }

    pub fn sections(&self) -> &SectionRegistry {
        &self.sections
    }

    /// Writes one value for option `index`, from `source`. `append` should
    /// be true when the option allows `MULTIPLE` and this is not the first
    /// value from this particular source invocation (e.g. the second
    /// `--file` on one command line).
    pub fn set(&mut self, index: usize, source: Source, value: String, append: bool) {
        self.lists.entry(index).or_default().write(source, value, append);
    }

    /// Replaces option `index`'s entire list with `values`, from `source`,
    /// in one logical write — used where a single source occurrence
    /// supplies several values at once (a later configuration file
    /// overwriting a MULTIPLE option's prior list, or one separator-split
    /// value).
    pub fn set_all(&mut self, index: usize, source: Source, values: Vec<String>) {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else { return };
        self.set(index, source, first, false);
        for value in iter {
            self.set(index, source, value, true);
        }
    }

    pub fn get(&self, index: usize) -> Option<&ValueList> {
        self.lists.get(&index)
    }

    pub fn is_defined(&self, index: usize) -> bool {
        self.lists.get(&index).is_some_and(ValueList::is_defined)
    }

    pub fn size(&self, index: usize) -> usize {
        self.lists.get(&index).map_or(0, ValueList::len)
    }

    /// Retrieves the string at `value_index` for option `index`, or the
    /// `Undefined` error with the option's display `name` if the option
    /// carries no value at that position.
    pub fn get_string<'a>(
        &'a self,
        index: usize,
        value_index: usize,
        name: &str,
    ) -> Result<&'a str, GetoptError> {
        self.lists
            .get(&index)
            .and_then(|list| list.get(value_index))
            .ok_or_else(|| GetoptError::Undefined {
                option: name.to_string(),
                index: value_index as i64,
            })
    }

    /// Parses the string at `value_index` for option `index` as an integer.
    /// On any failure (undefined value, malformed integer, or an explicit
    /// `min`/`max` bound violated) this emits an error diagnostic and
    /// returns `-1` rather than propagating an error — a report-and-continue
    /// contract distinct from this store's other `Result`-returning queries.
    pub fn get_long(
        &self,
        index: usize,
        value_index: usize,
        name: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> i64 {
        let raw = match self.get_string(index, value_index, name) {
            Ok(raw) => raw,
            Err(e) => {
                crate::error::emit(&crate::error::Diagnostic::error(e.to_string()));
                return -1;
            }
        };
        let Ok(value) = raw.parse::<i64>() else {
            crate::error::emit(&crate::error::Diagnostic::error(format!(
                "value \"{raw}\" of option --{name} is not a valid integer"
            )));
            return -1;
        };
        if min.is_some_and(|m| value < m) || max.is_some_and(|m| value > m) {
            crate::error::emit(&crate::error::Diagnostic::error(format!(
                "value \"{raw}\" of option --{name} is out of range"
            )));
            return -1;
        }
        value
    }

    pub fn reset(&mut self, index: usize) {
        if let Some(list) = self.lists.get_mut(&index) {
            list.reset();
        }
    }

    pub fn reset_all(&mut self) {
        self.lists.clear();
        self.sections = SectionRegistry::new();
    }
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new()
    }
}
