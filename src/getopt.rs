// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The orchestrator: bootstraps the catalog, drives the three parse phases
//! in precedence order, and exposes the public query surface.
//!
//! A multi-step bootstrap builds up the catalog and system options before
//! any query is served. Precedence is already merged at write time in
//! [`crate::value_store`], so this orchestrator's job is purely sequencing
//! the three parse phases and answering queries against the merged result.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::arg_parser::{ArgParser, parse_program_name};
use crate::catalog::{CONFIGURATION_SECTIONS_OPTION, OptionCatalog, OptionInfo, OptionSpec};
use crate::config::{self, ConfigLocations, ConfigReader};
use crate::env_parser;
use crate::error::{DiagnosticSink, GetoptError};
use crate::flags::OptionFlags;
use crate::options_file;
use crate::value_store::{Source, ValueStore};

/// System (auto-action) options recognized when `OptionEnvironment`
/// enables them: on the command line, seeing one emits its configured text
/// through the diagnostic sink and raises `GetoptError::Exit { code: 0 }`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SystemOption {
    Help,
    Version,
    Copyright,
    License,
    BuildDate,
}

impl SystemOption {
    fn option_name(self) -> &'static str {
        match self {
            SystemOption::Help => "help",
            SystemOption::Version => "version",
            SystemOption::Copyright => "copyright",
            SystemOption::License => "license",
            SystemOption::BuildDate => "build-date",
        }
    }

    fn short_name(self) -> Option<char> {
        match self {
            SystemOption::Help => Some('h'),
            SystemOption::Version => Some('V'),
            _ => None,
        }
    }
}

/// The bootstrap inputs for a [`Getopt`] instance.
#[derive(Default)]
pub struct OptionEnvironment {
    pub project_name: String,
    pub environment_variable_name: Option<String>,
    pub configuration_filename: Option<String>,
    pub configuration_files: Vec<String>,
    pub configuration_directories: Vec<String>,
    pub options_files_directory: Option<PathBuf>,
    pub system_options: HashSet<SystemOption>,
    pub system_option_text: HashMap<&'static str, String>,
    pub dynamic_parameters: bool,
    pub multi_namespace: bool,
    pub diagnostic_sink: Option<DiagnosticSink>,
    pub bin_name: Option<String>,
}

/// The public orchestrator. Owns the catalog and the value store; exposes
/// the full option query surface.
pub struct Getopt {
    catalog: OptionCatalog,
    store: ValueStore,
    env: OptionEnvironment,
    program_name: Option<String>,
    program_fullname: Option<String>,
    config_dir_overrides: Vec<String>,
    parsed: bool,
}

impl Getopt {
    /// Builds the catalog from `descriptors`, merges in system options per
    /// `env.system_options`, loads `.ini` descriptors from
    /// `env.options_files_directory` if set, and links aliases. Does not
    /// parse any source yet.
    pub fn construct(env: OptionEnvironment, descriptors: Vec<OptionSpec>) -> Result<Self, GetoptError> {
        if let Some(sink) = env.diagnostic_sink.clone() {
            crate::error::set_diagnostic_sink(sink);
        }

        let mut catalog = OptionCatalog::new(env.multi_namespace);

        let mut names_defined: HashSet<String> = HashSet::new();
        for spec in descriptors {
            names_defined.insert(spec.name.clone());
            catalog.add(spec)?;
        }

        for system_option in &env.system_options {
            let name = system_option.option_name();
            if names_defined.contains(name) {
                continue;
            }
            let mut spec = OptionSpec::new(name)
                .flags(OptionFlags::COMMAND_LINE | OptionFlags::FLAG)
                .help(format!("show {name} and exit"));
            if let Some(short) = system_option.short_name() {
                spec = spec.short_name(short);
            }
            catalog.add(spec)?;
        }

        if env
            .configuration_filename
            .as_ref()
            .is_some_and(|s| !s.is_empty())
            && !names_defined.contains("config-dir")
        {
            catalog.add(
                OptionSpec::new("config-dir")
                    .short_name('c')
                    .flags(OptionFlags::COMMAND_LINE | OptionFlags::MULTIPLE),
            )?;
        }

        if !names_defined.contains(CONFIGURATION_SECTIONS_OPTION) {
            catalog.add(
                OptionSpec::new(CONFIGURATION_SECTIONS_OPTION)
                    .flags(OptionFlags::MULTIPLE)
                    .help("section names seen across the loaded configuration files"),
            )?;
        }

        if let Some(dir) = &env.options_files_directory {
            let ini_path = dir.join(format!("{}.ini", env.project_name));
            if ini_path.is_file() {
                for spec in options_file::parse_options_file(&ini_path)? {
                    catalog.add(spec)?;
                }
            }
        }

        catalog.link_aliases()?;

        Ok(Self {
            catalog,
            store: ValueStore::new(),
            env,
            program_name: None,
            program_fullname: None,
            config_dir_overrides: Vec::new(),
            parsed: false,
        })
    }

    /// As [`Self::construct`], then runs the full bootstrap sequence:
    /// `parse_program_name`, `parse_configuration_files`,
    /// `parse_environment_variable`, `parse_arguments` (command line).
    pub fn construct_and_parse(
        env: OptionEnvironment,
        descriptors: Vec<OptionSpec>,
        args: &[String],
    ) -> Result<Self, GetoptError> {
        let mut getopt = Self::construct(env, descriptors)?;
        if let Some(argv0) = args.first() {
            getopt.parse_program_name(argv0);
        }
        getopt.parse_configuration_files()?;
        getopt.parse_environment_variable()?;
        getopt.parse_arguments(&args[1.min(args.len())..], Source::CommandLine)?;
        Ok(getopt)
    }

    pub fn parse_program_name(&mut self, argv0: &str) {
        let (basename, fullname) = parse_program_name(argv0);
        self.program_name = Some(basename);
        self.program_fullname = Some(fullname);
    }

    /// Merges an additional option array into the catalog. A no-op on an
    /// empty slice.
    pub fn parse_options_info(&mut self, descriptors: Vec<OptionSpec>) -> Result<(), GetoptError> {
        for spec in descriptors {
            self.catalog.add(spec)?;
        }
        self.catalog.link_aliases()
    }

    pub fn parse_environment_variable(&mut self) -> Result<(), GetoptError> {
        let Some(variable_name) = self.env.environment_variable_name.clone() else {
            return Ok(());
        };
        let result = env_parser::parse_environment_variable(
            &variable_name,
            &mut self.catalog,
            &mut self.store,
        );
        self.check_system_options()?;
        result
    }

    pub fn parse_configuration_files(&mut self) -> Result<(), GetoptError> {
        let files = self.get_configuration_filenames(true, false);
        let mut reader = ConfigReader::new(&mut self.catalog);
        reader.load(&files, &mut self.store, self.env.dynamic_parameters)
    }

    pub fn parse_arguments(&mut self, args: &[String], source: Source) -> Result<(), GetoptError> {
        if source == Source::CommandLine {
            self.collect_config_dir_overrides(args);
        }
        let owned: Vec<String> = args.to_vec();
        let mut parser = ArgParser::new(&mut self.catalog);
        let result = parser.parse(&owned, source, &mut self.store);
        self.parsed = true;
        self.check_system_options()?;
        result
    }

    fn collect_config_dir_overrides(&mut self, args: &[String]) {
        let Some(index) = self.catalog.canonical_index("config-dir") else {
            return;
        };
        let mut i = 0;
        while i < args.len() {
            if args[i] == "--config-dir" {
                if let Some(value) = args.get(i + 1) {
                    self.config_dir_overrides.push(value.clone());
                    i += 2;
                    continue;
                }
            } else if let Some(value) = args[i].strip_prefix("--config-dir=") {
                self.config_dir_overrides.push(value.to_string());
            }
            i += 1;
        }
        let _ = index;
    }

    fn check_system_options(&self) -> Result<(), GetoptError> {
        for system_option in &self.env.system_options {
            let name = system_option.option_name();
            if self
                .catalog
                .canonical_index(name)
                .is_some_and(|idx| self.store.is_defined(idx))
            {
                if let Some(text) = self.env.system_option_text.get(name) {
                    crate::error::emit(&crate::error::Diagnostic::info(text.clone()));
                }
                return Err(GetoptError::Exit { code: 0 });
            }
        }
        Ok(())
    }

    fn require_parsed(&self) -> Result<(), GetoptError> {
        if !self.parsed {
            return Err(GetoptError::initialization(
                "query method invoked before parsing completed",
            ));
        }
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> Result<bool, GetoptError> {
        self.require_parsed()?;
        let index = self.catalog.canonical_index(name).ok_or_else(|| {
            GetoptError::logic(format!("unknown option \"{name}\""))
        })?;
        Ok(self.store.is_defined(index))
    }

    pub fn size(&self, name: &str) -> Result<usize, GetoptError> {
        self.require_parsed()?;
        let index = self.catalog.canonical_index(name).ok_or_else(|| {
            GetoptError::logic(format!("unknown option \"{name}\""))
        })?;
        Ok(self.store.size(index))
    }

    pub fn get_string(&self, name: &str, index: usize) -> Result<String, GetoptError> {
        self.require_parsed()?;
        let option_index = self.catalog.canonical_index(name).ok_or_else(|| {
            GetoptError::logic(format!("unknown option \"{name}\""))
        })?;
        self.store
            .get_string(option_index, index, name)
            .map(str::to_string)
    }

    /// Parses the value as an integer with no `[min, max]` bounds. Does
    /// not raise on a malformed or missing value — that emits a diagnostic
    /// and yields `-1` instead; only querying before parsing completes
    /// raises.
    pub fn get_long(&self, name: &str, index: usize) -> Result<i64, GetoptError> {
        self.get_long_range(name, index, None, None)
    }

    /// As [`Self::get_long`], additionally rejecting (with a diagnostic and
    /// `-1`) a value outside `[min, max]` when either bound is given.
    pub fn get_long_range(
        &self,
        name: &str,
        index: usize,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Result<i64, GetoptError> {
        self.require_parsed()?;
        let option_index = self.catalog.canonical_index(name).ok_or_else(|| {
            GetoptError::logic(format!("unknown option \"{name}\""))
        })?;
        Ok(self.store.get_long(option_index, index, name, min, max))
    }

    pub fn get_default(&self, name: &str) -> Option<&str> {
        self.catalog.get(name).and_then(|i| i.default_value.as_deref())
    }

    pub fn has_default(&self, name: &str) -> bool {
        self.catalog
            .get(name)
            .is_some_and(|i| i.default_value.is_some())
    }

    /// Returns the `OptionInfo` for a long name or short code point,
    /// following alias resolution to the target unless `include_aliases`
    /// is true, in which case the alias entry itself is returned.
    pub fn get_option(&self, name_or_short: &str, include_aliases: bool) -> Option<&OptionInfo> {
        let follow = !include_aliases;
        if let Some(c) = single_char(name_or_short) {
            if let Some(info) = self.catalog.get_by_short(c, follow) {
                return Some(info);
            }
        }
        self.catalog.get_by_name(name_or_short, follow)
    }

    pub fn get_program_name(&self) -> Option<&str> {
        self.program_name.as_deref()
    }

    pub fn get_program_fullname(&self) -> Option<&str> {
        self.program_fullname.as_deref()
    }

    pub fn get_configuration_filenames(&self, must_exist: bool, writable: bool) -> Vec<PathBuf> {
        let locations = ConfigLocations {
            configuration_files: self.env.configuration_files.clone(),
            configuration_directories: self.env.configuration_directories.clone(),
            configuration_filename: self.env.configuration_filename.clone(),
            project_name: self.env.project_name.clone(),
            config_dir_overrides: self.config_dir_overrides.clone(),
        };
        config::candidate_files(&locations, must_exist, writable)
    }

    pub fn reset(&mut self) {
        self.store.reset_all();
        self.parsed = false;
    }

    pub fn set_short_name(&mut self, name: &str, code_point: char) -> Result<(), GetoptError> {
        self.catalog.set_short_name(name, code_point)
    }

    /// Non-fatal introspection: given a map of section name to its valid
    /// key set, returns descriptive error strings for unknown sections or
    /// keys found in the loaded configuration files. Does not fail the
    /// parse; callers opt into this separately.
    pub fn validate_config(&self, section_to_valid_keys: &HashMap<String, HashSet<String>>) -> Vec<String> {
        let mut errors = Vec::new();
        for section in self.store.sections().iter_known() {
            let Some(valid_keys) = section_to_valid_keys.get(section) else {
                errors.push(format!("invalid section name [{section}]"));
                continue;
            };
            let Some(seen_keys) = self.store.sections().keys_for(section) else {
                continue;
            };
            for key in seen_keys {
                if !valid_keys.contains(key) {
                    errors.push(format!("invalid key \"{key}\" in section [{section}]"));
                }
            }
        }
        errors
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let first = chars.next()?;
    if chars.next().is_none() { Some(first) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OptionSpec;

    fn env() -> OptionEnvironment {
        OptionEnvironment {
            project_name: "testapp".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn construct_and_parse_simple_flag() {
        let descriptors = vec![
            OptionSpec::new("verbose")
                .short_name('v')
                .flags(OptionFlags::COMMAND_LINE | OptionFlags::FLAG),
        ];
        let args = vec!["prog".to_string(), "--verbose".to_string()];
        let getopt = Getopt::construct_and_parse(env(), descriptors, &args).unwrap();
        assert!(getopt.is_defined("verbose").unwrap());
        assert_eq!(getopt.get_program_name(), Some("prog"));
    }

    #[test]
    fn query_before_parse_is_initialization_error() {
        let descriptors = vec![
            OptionSpec::new("verbose").flags(OptionFlags::COMMAND_LINE | OptionFlags::FLAG),
        ];
        let getopt = Getopt::construct(env(), descriptors).unwrap();
        let err = getopt.is_defined("verbose");
        assert!(matches!(err, Err(GetoptError::Initialization(_))));
    }

    #[test]
    fn alias_mirrors_target_values() {
        let descriptors = vec![
            OptionSpec::new("verbose")
                .short_name('v')
                .flags(OptionFlags::COMMAND_LINE | OptionFlags::FLAG),
            OptionSpec::new("chatty").alias_of("verbose"),
        ];
        let args = vec!["prog".to_string(), "--chatty".to_string()];
        let getopt = Getopt::construct_and_parse(env(), descriptors, &args).unwrap();
        assert!(getopt.is_defined("verbose").unwrap());
        assert!(getopt.is_defined("chatty").unwrap());
        assert_eq!(getopt.size("verbose").unwrap(), getopt.size("chatty").unwrap());
    }

    #[test]
    fn default_value_without_parse_time_value() {
        let descriptors = vec![
            OptionSpec::new("count")
                .flags(OptionFlags::COMMAND_LINE)
                .default_value("10"),
        ];
        let args = vec!["prog".to_string()];
        let getopt = Getopt::construct_and_parse(env(), descriptors, &args).unwrap();
        assert!(!getopt.is_defined("count").unwrap());
        assert_eq!(getopt.get_default("count"), Some("10"));
        assert!(matches!(
            getopt.get_string("count", 0),
            Err(GetoptError::Undefined { .. })
        ));
    }

    #[test]
    fn system_option_raises_exit() {
        let mut environment = env();
        environment.system_options.insert(SystemOption::Help);
        environment
            .system_option_text
            .insert("help", "usage: testapp [options]".to_string());
        let args = vec!["prog".to_string(), "--help".to_string()];
        let err = Getopt::construct_and_parse(environment, vec![], &args);
        assert!(matches!(err, Err(GetoptError::Exit { code: 0 })));
    }

    #[test]
    fn command_line_precedes_environment_and_config() {
        let descriptors = vec![
            OptionSpec::new("name").flags(
                OptionFlags::COMMAND_LINE | OptionFlags::ENVIRONMENT_VARIABLE,
            ),
        ];
        let mut environment = env();
        environment.environment_variable_name = Some("ADVOPT_TEST_PRECEDENCE_NAME".to_string());
        std::env::set_var("ADVOPT_TEST_PRECEDENCE_NAME", "--name from-env");
        let args = vec!["prog".to_string(), "--name".to_string(), "from-cli".to_string()];
        let getopt = Getopt::construct_and_parse(environment, descriptors, &args).unwrap();
        std::env::remove_var("ADVOPT_TEST_PRECEDENCE_NAME");
        assert_eq!(getopt.get_string("name", 0).unwrap(), "from-cli");
    }

    #[test]
    fn validate_config_flags_unknown_sections() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("app.conf");
        std::fs::write(&path, "[database]\nhost = localhost\n[mystery]\nkey = 1\n").unwrap();

        let descriptors = vec![
            OptionSpec::new("database::host").flags(OptionFlags::CONFIGURATION_FILE),
        ];
        let mut environment = env();
        environment.configuration_files = vec![path.to_str().unwrap().to_string()];
        let args = vec!["prog".to_string()];
        let getopt = Getopt::construct_and_parse(environment, descriptors, &args).unwrap();

        let valid_keys = maplit::hashmap! {
            "database".to_string() => maplit::hashset! { "host".to_string() },
        };
        let errors = getopt.validate_config(&valid_keys);
        assert_eq!(errors, vec!["invalid section name [mystery]".to_string()]);
    }

    #[test]
    fn validate_config_flags_unknown_key_in_known_section() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("app.conf");
        std::fs::write(&path, "[database]\nhost = localhost\nbogus = 1\n").unwrap();

        let descriptors = vec![
            OptionSpec::new("database::host").flags(OptionFlags::CONFIGURATION_FILE),
            OptionSpec::new("database::bogus").flags(OptionFlags::CONFIGURATION_FILE),
        ];
        let mut environment = env();
        environment.configuration_files = vec![path.to_str().unwrap().to_string()];
        let args = vec!["prog".to_string()];
        let getopt = Getopt::construct_and_parse(environment, descriptors, &args).unwrap();

        let valid_keys = maplit::hashmap! {
            "database".to_string() => maplit::hashset! { "host".to_string() },
        };
        let errors = getopt.validate_config(&valid_keys);
        assert_eq!(
            errors,
            vec!["invalid key \"bogus\" in section [database]".to_string()]
        );
    }

    #[test]
    fn configuration_sections_is_a_queryable_option() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("app.conf");
        std::fs::write(
            &path,
            "[connection]\nhost = localhost\n[data]\npath = /tmp\n",
        )
        .unwrap();

        let descriptors = vec![
            OptionSpec::new("connection::host").flags(OptionFlags::CONFIGURATION_FILE),
            OptionSpec::new("data::path").flags(OptionFlags::CONFIGURATION_FILE),
        ];
        let mut environment = env();
        environment.configuration_files = vec![path.to_str().unwrap().to_string()];
        let args = vec!["prog".to_string()];
        let getopt = Getopt::construct_and_parse(environment, descriptors, &args).unwrap();

        assert!(getopt.is_defined("configuration_sections").unwrap());
        assert_eq!(getopt.size("configuration_sections").unwrap(), 2);
        assert_eq!(
            getopt.get_string("configuration_sections", 0).unwrap(),
            "connection"
        );
        assert_eq!(
            getopt.get_string("configuration_sections", 1).unwrap(),
            "data"
        );
    }
}
