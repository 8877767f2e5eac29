// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The configuration-file loader: candidate file-list computation, the
//! `name = value` / `[section]` line grammar, and the multi-file merge
//! where a later file's assignment replaces (never appends to) an earlier
//! file's.
//!
//! Split into a raw source holder, a parsed representation, and a reader
//! that drives assignments into the value store.

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::catalog::{CONFIGURATION_SECTIONS_OPTION, OptionCatalog};
use crate::error::{Diagnostic, DiagnosticCollector, GetoptError};
use crate::flags::OptionFlags;
use crate::id::{check_forbidden_chars, split_section};
use crate::strutil::{handle_user_directory, insert_project_name_with_priority, split_string, unquote};
use crate::validator::Validator;
use crate::value_store::{Source, ValueStore};

const PROJECT_OVERLAY_PRIORITY: u32 = 50;

/// The environment inputs that drive candidate file-list computation.
#[derive(Clone, Debug, Default)]
pub struct ConfigLocations {
    pub configuration_files: Vec<String>,
    pub configuration_directories: Vec<String>,
    pub configuration_filename: Option<String>,
    pub project_name: String,
    /// Additional directories contributed by `--config-dir` on the command
    /// line, in the order they appeared, prepended ahead of the
    /// environment's own `configuration_directories`.
    pub config_dir_overrides: Vec<String>,
}

/// Computes the candidate configuration file list. When `writable` is
/// true, only the project-overlay entries are returned. When `must_exist`
/// is true, non-existent files are filtered out.
pub fn candidate_files(locations: &ConfigLocations, must_exist: bool, writable: bool) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    for file in &locations.configuration_files {
        let expanded = handle_user_directory(file);
        if !writable {
            candidates.push(expanded.clone());
        }
        candidates.push(insert_project_name_with_priority(
            &expanded,
            &locations.project_name,
            Some(PROJECT_OVERLAY_PRIORITY),
        ));
    }

    let Some(basename) = &locations.configuration_filename else {
        return finish_candidates(candidates, must_exist);
    };

    let directories = locations
        .config_dir_overrides
        .iter()
        .chain(locations.configuration_directories.iter());

    for dir in directories {
        let expanded_dir = handle_user_directory(dir);
        let plain = Path::new(&expanded_dir).join(basename);
        let plain = plain.to_string_lossy().into_owned();
        if !writable {
            candidates.push(plain.clone());
        }
        candidates.push(insert_project_name_with_priority(
            &plain,
            &locations.project_name,
            Some(PROJECT_OVERLAY_PRIORITY),
        ));
    }

    finish_candidates(candidates, must_exist)
}

fn finish_candidates(candidates: Vec<String>, must_exist: bool) -> Vec<PathBuf> {
    // `--config-dir` overrides and the environment's own directories can
    // legitimately name the same path; dedup while keeping first-seen order
    // so the project-overlay priority computed above isn't disturbed.
    candidates
        .into_iter()
        .unique()
        .map(PathBuf::from)
        .filter(|p| !must_exist || p.is_file())
        .collect()
}

/// One `name = value` assignment found while parsing a configuration file.
#[derive(Clone, Debug)]
struct Assignment {
    name: String,
    value: String,
    lineno: usize,
}

/// The raw contents of one configuration file.
#[derive(Clone, Debug)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub content: String,
}

impl ConfigSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ConfigSource, GetoptError> {
        let content = fs::read_to_string(&path).map_err(|e| {
            GetoptError::logic(format!(
                "failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(ConfigSource {
            path: path.as_ref().to_path_buf(),
            content,
        })
    }
}

/// One configuration file, parsed into an ordered list of assignments and
/// the distinct section names it introduced.
#[derive(Clone, Debug, Default)]
pub struct Config {
    assignments: Vec<Assignment>,
    sections: Vec<String>,
}

impl Config {
    /// Parses `source`'s grammar: `#`/`;` at column 0 is a comment, blank
    /// lines are ignored, `[section]` opens a section context prefixed onto
    /// subsequent names as `section::name`, `name = value` is an assignment
    /// with both sides trimmed and the value unquoted. Diagnostics for
    /// malformed lines are pushed onto `diagnostics`; parsing continues to
    /// the next line.
    pub fn parse(source: &ConfigSource, diagnostics: &mut DiagnosticCollector) -> Self {
        let mut config = Config::default();
        let mut current_section: Option<String> = None;

        for (idx, raw_line) in source.content.lines().enumerate() {
            let lineno = idx + 1;
            if raw_line.is_empty() {
                continue;
            }
            if raw_line.starts_with('#') || raw_line.starts_with(';') {
                continue;
            }
            let trimmed = raw_line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(section) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                if let Err(e) = check_forbidden_chars(section) {
                    diagnostics.error(format!(
                        "{}:{lineno}: {e}",
                        source.path.display()
                    ));
                    continue;
                }
                if !config.sections.iter().any(|s| s == section) {
                    config.sections.push(section.to_string());
                }
                current_section = Some(section.to_string());
                continue;
            }

            let Some(eq) = raw_line.find('=') else {
                diagnostics.error(format!(
                    "{}:{lineno}: missing assignment operator",
                    source.path.display()
                ));
                continue;
            };
            let key = raw_line[..eq].trim();
            let value = unquote(raw_line[eq + 1..].trim(), "'\"");

            if key.starts_with('-') || key.starts_with('_') {
                diagnostics.error(format!(
                    "{}:{lineno}: option name \"{key}\" must not start with '-' or '_'",
                    source.path.display()
                ));
                continue;
            }

            let qualified = match &current_section {
                Some(section) => format!("{section}::{key}"),
                None => key.to_string(),
            };
            config.assignments.push(Assignment {
                name: qualified,
                value,
                lineno,
            });
        }

        config
    }
}

/// Drives one or more parsed [`Config`]s (in candidate-file order) into the
/// catalog's value store, applying flag semantics and the "later file
/// replaces, never appends" merge rule. Holds the catalog mutably because
/// an unknown name is silently registered (not merely flagged) when
/// `DYNAMIC_PARAMETERS` is on — the only source for which dynamic
/// registration applies (command-line and environment-variable options
/// remain hard errors, enforced in `crate::arg_parser`).
pub struct ConfigReader<'a> {
    catalog: &'a mut OptionCatalog,
}

impl<'a> ConfigReader<'a> {
    pub fn new(catalog: &'a mut OptionCatalog) -> Self {
        Self { catalog }
    }

    /// Loads every file in `files`, in order, into `store`. Returns
    /// `Err(GetoptError::Parse(..))` once all files have been drained if
    /// any diagnostic fired; the store reflects whatever was successfully
    /// applied regardless.
    pub fn load(
        &mut self,
        files: &[PathBuf],
        store: &mut ValueStore,
        dynamic_parameters: bool,
    ) -> Result<(), GetoptError> {
        let mut diagnostics = DiagnosticCollector::new();

        for path in files {
            if !path.is_file() {
                continue;
            }
            let source = match ConfigSource::from_file(path) {
                Ok(s) => s,
                Err(e) => {
                    diagnostics.error(e.to_string());
                    continue;
                }
            };
            let config = Config::parse(&source, &mut diagnostics);
            for section in &config.sections {
                if store.sections_mut().register(section) {
                    if let Some(index) = self.catalog.canonical_index(CONFIGURATION_SECTIONS_OPTION) {
                        store.set(index, Source::Configuration, section.clone(), true);
                    }
                }
            }
            self.apply(&config, path, store, &mut diagnostics, dynamic_parameters);
        }

        diagnostics.finish()
    }

    fn apply(
        &mut self,
        config: &Config,
        path: &Path,
        store: &mut ValueStore,
        diagnostics: &mut DiagnosticCollector,
        dynamic_parameters: bool,
    ) {
        for assignment in &config.assignments {
            self.apply_one(assignment, path, store, diagnostics, dynamic_parameters);
        }
    }

    fn apply_one(
        &mut self,
        assignment: &Assignment,
        path: &Path,
        store: &mut ValueStore,
        diagnostics: &mut DiagnosticCollector,
        dynamic_parameters: bool,
    ) {
        let Ok((section, leaf)) = split_section(&assignment.name) else {
            diagnostics.error(format!(
                "{}:{}: option name \"{}\" embeds more than one \"::\"",
                path.display(),
                assignment.lineno,
                assignment.name
            ));
            return;
        };
        if let Some(section) = section {
            store.sections_mut().register_key(section, leaf);
        }

        let index = match self.catalog.canonical_index(&assignment.name) {
            Some(index) => index,
            None if dynamic_parameters => {
                match self
                    .catalog
                    .add_dynamic(&assignment.name, OptionFlags::CONFIGURATION_FILE | OptionFlags::MULTIPLE)
                {
                    Ok(index) => index,
                    Err(e) => {
                        diagnostics.error(format!("{}:{}: {e}", path.display(), assignment.lineno));
                        return;
                    }
                }
            }
            None => {
                diagnostics.error(format!(
                    "{}:{}: \"{}\" is not a known configuration-file option",
                    path.display(),
                    assignment.lineno,
                    assignment.name
                ));
                return;
            }
        };

        let info = self.catalog.entry_at(index);

        if !info.flags.accepts(Source::Configuration) {
            diagnostics.error(format!(
                "{}:{}: option --{} is not supported in a configuration file",
                path.display(),
                assignment.lineno,
                assignment.name
            ));
            return;
        }

        if info.flags.contains(OptionFlags::FLAG) {
            match assignment.value.as_str() {
                "true" => store.set(index, Source::Configuration, String::new(), false),
                "false" => store.reset(index),
                other => {
                    diagnostics.error(format!(
                        "{}:{}: option --{} only accepts \"true\" or \"false\", got \"{other}\"",
                        path.display(),
                        assignment.lineno,
                        assignment.name
                    ));
                }
            }
            return;
        }

        if info.flags.contains(OptionFlags::REQUIRED) && assignment.value.is_empty() {
            diagnostics.error(format!(
                "{}:{}: option --{} must be given a value",
                path.display(),
                assignment.lineno,
                assignment.name
            ));
            return;
        }

        if let Some(validator) = &info.validator {
            if !assignment.value.is_empty() && !validator.validate(&assignment.value) {
                diagnostics.error(format!(
                    "{}:{}: input \"{}\" given to parameter --{} is not considered valid",
                    path.display(),
                    assignment.lineno,
                    assignment.value,
                    assignment.name
                ));
                return;
            }
        }

        if info.flags.contains(OptionFlags::MULTIPLE) && !info.separators.is_empty() {
            let separators: Vec<&str> = info.separators.iter().map(String::as_str).collect();
            let values = split_string(&assignment.value, &separators);
            store.set_all(index, Source::Configuration, values);
        } else {
            store.set(index, Source::Configuration, assignment.value.clone(), false);
        }
    }
}
