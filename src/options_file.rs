// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The `.ini`-format option-descriptor loader. Shares the `name = value` /
//! `[section]` line grammar with [`crate::config`], but each section here
//! describes a schema entry (`shortname`, `default`, `allowed`, …) rather
//! than a run-time value.

use std::fs;
use std::path::Path;

use crate::catalog::OptionSpec;
use crate::error::GetoptError;
use crate::flags::OptionFlags;
use crate::id::check_forbidden_chars;

/// Parses an `.ini`-format option descriptor file at `D/P.ini` (the caller
/// supplies the already-joined path) into a list of [`OptionSpec`] values,
/// ready for [`crate::catalog::OptionCatalog::add`].
///
/// Each `[section]` defines one option named after the section (subject to
/// the usual `::`-depth and forbidden-character rules); recognized keys:
/// `shortname`, `default`, `help`, `allowed` (comma-separated tokens among
/// `command-line`, `environment-variable`, `configuration-file`),
/// `show-usage-on-error`, `no-arguments` (alias for `FLAG`), `multiple`,
/// `required`, `validator`, `environment_variable_name`, `alias`.
pub fn parse_options_file(path: &Path) -> Result<Vec<OptionSpec>, GetoptError> {
    parse_options_from_file(path, 1, 2)
}

/// As [`parse_options_file`], but accepts a configurable namespace depth:
/// section names may contain between `min_sections - 1` and
/// `max_sections - 1` occurrences of `::` (e.g. a caller wanting
/// three-level namespaces passes `max_sections = 3`).
pub fn parse_options_from_file(
    path: &Path,
    min_sections: usize,
    max_sections: usize,
) -> Result<Vec<OptionSpec>, GetoptError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        GetoptError::logic(format!(
            "cannot read options file \"{}\": {e}",
            path.display()
        ))
    })?;

    let mut specs = Vec::new();
    let mut current: Option<PendingOption> = None;
    let mut had_current_section = false;

    for (lineno, raw_line) in contents.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw_line.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if let Some(pending) = current.take() {
                specs.push(pending.into_spec()?);
            }
            let depth = section.matches("::").count() + 1;
            if depth < min_sections || depth > max_sections {
                return Err(GetoptError::logic(format!(
                    "{}:{lineno}: section \"{section}\" has namespace depth {depth}, expected between {min_sections} and {max_sections}",
                    path.display()
                )));
            }
            // Forbidden characters apply per `::`-delimited component, not
            // to the joined section name (`:` is itself forbidden, so
            // checking the whole string would reject every sectioned name).
            for component in section.split("::") {
                check_forbidden_chars(component)?;
            }
            current = Some(PendingOption::new(section.to_string()));
            had_current_section = true;
            continue;
        }

        if !had_current_section {
            return Err(GetoptError::logic(format!(
                "{}:{lineno}: assignment before any [section] header",
                path.display()
            )));
        }

        let Some(eq) = line.find('=') else {
            return Err(GetoptError::logic(format!(
                "{}:{lineno}: missing assignment operator",
                path.display()
            )));
        };
        let key = line[..eq].trim();
        let value = crate::strutil::unquote(line[eq + 1..].trim(), "'\"");
        let pending = current
            .as_mut()
            .expect("had_current_section guarantees a pending option");
        pending.apply(key, &value, path, lineno)?;
    }

    if let Some(pending) = current.take() {
        specs.push(pending.into_spec()?);
    }

    Ok(specs)
}

struct PendingOption {
    name: String,
    short_name: Option<char>,
    default_value: Option<String>,
    help: String,
    allowed: Vec<String>,
    show_usage_on_error: bool,
    no_arguments: bool,
    multiple: bool,
    required: bool,
    validator: Option<String>,
    environment_variable_name: Option<String>,
    alias_target: Option<String>,
}

impl PendingOption {
    fn new(name: String) -> Self {
        Self {
            name,
            short_name: None,
            default_value: None,
            help: String::new(),
            allowed: Vec::new(),
            show_usage_on_error: false,
            no_arguments: false,
            multiple: false,
            required: false,
            validator: None,
            environment_variable_name: None,
            alias_target: None,
        }
    }

    fn apply(&mut self, key: &str, value: &str, path: &Path, lineno: usize) -> Result<(), GetoptError> {
        match key {
            "shortname" => {
                let mut chars = value.chars();
                let Some(c) = chars.next() else {
                    return Err(GetoptError::logic(format!(
                        "{}:{lineno}: \"shortname\" must be exactly one character",
                        path.display()
                    )));
                };
                if chars.next().is_some() {
                    return Err(GetoptError::logic(format!(
                        "{}:{lineno}: \"shortname\" must be exactly one character",
                        path.display()
                    )));
                }
                self.short_name = Some(c);
            }
            "default" => self.default_value = Some(value.to_string()),
            "help" => self.help = value.to_string(),
            "allowed" => {
                self.allowed = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "show-usage-on-error" => self.show_usage_on_error = parse_bool(value, path, lineno)?,
            "no-arguments" => self.no_arguments = parse_bool(value, path, lineno)?,
            "multiple" => self.multiple = parse_bool(value, path, lineno)?,
            "required" => self.required = parse_bool(value, path, lineno)?,
            "validator" => self.validator = Some(value.to_string()),
            "environment_variable_name" => self.environment_variable_name = Some(value.to_string()),
            "alias" => self.alias_target = Some(value.to_string()),
            other => {
                return Err(GetoptError::logic(format!(
                    "{}:{lineno}: unknown options-file key \"{other}\"",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn into_spec(self) -> Result<OptionSpec, GetoptError> {
        if self.alias_target.is_some() {
            if !self.help.is_empty() || self.default_value.is_some() || self.validator.is_some() {
                return Err(GetoptError::logic(format!(
                    "alias \"{}\" must not carry help, default, or validator",
                    self.name
                )));
            }
        }

        let mut flags = OptionFlags::empty();
        if self.allowed.is_empty() {
            flags |= OptionFlags::COMMAND_LINE
                | OptionFlags::ENVIRONMENT_VARIABLE
                | OptionFlags::CONFIGURATION_FILE;
        }
        for token in &self.allowed {
            flags |= match token.as_str() {
                "command-line" => OptionFlags::COMMAND_LINE,
                "environment-variable" => OptionFlags::ENVIRONMENT_VARIABLE,
                "configuration-file" => OptionFlags::CONFIGURATION_FILE,
                other => {
                    return Err(GetoptError::logic(format!(
                        "\"{}\" is not a recognized \"allowed\" source",
                        other
                    )));
                }
            };
        }
        if self.show_usage_on_error {
            flags |= OptionFlags::SHOW_USAGE_ON_ERROR;
        }
        if self.no_arguments {
            flags |= OptionFlags::FLAG;
        }
        if self.multiple {
            flags |= OptionFlags::MULTIPLE;
        }
        if self.required {
            flags |= OptionFlags::REQUIRED;
        }

        let mut spec = OptionSpec::new(self.name).flags(flags).help(self.help);
        if let Some(short) = self.short_name {
            spec = spec.short_name(short);
        }
        if let Some(default) = self.default_value {
            spec = spec.default_value(default);
        }
        if let Some(validator) = self.validator {
            spec = spec.validator(validator);
        }
        if let Some(target) = self.alias_target {
            spec = spec.alias_of(target);
        }
        spec.environment_variable_name = self.environment_variable_name;
        Ok(spec)
    }
}

fn parse_bool(value: &str, path: &Path, lineno: usize) -> Result<bool, GetoptError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(GetoptError::logic(format!(
            "{}:{lineno}: expected \"true\" or \"false\", got \"{other}\"",
            path.display()
        ))),
    }
}
