// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The option catalog: an immutable-after-`link_aliases()` schema of
//! [`OptionInfo`] entries keyed by long name, with short-name and alias
//! resolution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GetoptError;
use crate::flags::OptionFlags;
use crate::id::{canonicalize, check_forbidden_chars};
use crate::validator::Validator;

/// The name marking the default (positional) option.
pub const DEFAULT_OPTION_NAME: &str = "--";

/// The pseudo-option exposing every `[section]` name seen across the loaded
/// configuration files, in first-seen order. Carries no source flags of its
/// own, so an ordinary configuration-file assignment of this name is
/// rejected as "not supported" rather than clobbering the bookkeeping list;
/// it is populated only by `crate::config::ConfigReader` writing directly
/// into the value store.
pub const CONFIGURATION_SECTIONS_OPTION: &str = "configuration_sections";

/// The immutable-after-registration descriptor of one recognized option.
pub struct OptionInfo {
    pub name: String,
    pub short_name: Option<char>,
    pub flags: OptionFlags,
    pub default_value: Option<String>,
    pub validator: Option<Arc<dyn Validator>>,
    pub help: String,
    pub separators: Vec<String>,
    pub environment_variable_name: Option<String>,
    alias_target: Option<String>,
    resolved_alias: Option<usize>,
}

impl OptionInfo {
    pub fn is_alias(&self) -> bool {
        self.alias_target.is_some()
    }

    pub fn is_default_option(&self) -> bool {
        self.name == DEFAULT_OPTION_NAME
    }
}

/// Builder for one [`OptionInfo`], mirroring the shape a descriptor array
/// entry or an `.ini` section would populate.
#[derive(Default, Clone)]
pub struct OptionSpec {
    pub name: String,
    pub short_name: Option<char>,
    pub flags: OptionFlags,
    pub default_value: Option<String>,
    pub validator_spec: Option<String>,
    pub help: String,
    pub separators: Vec<String>,
    pub environment_variable_name: Option<String>,
    pub alias_target: Option<String>,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: OptionFlags::empty(),
            ..Default::default()
        }
    }

    pub fn flags(mut self, flags: OptionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn short_name(mut self, c: char) -> Self {
        self.short_name = Some(c);
        self
    }

    pub fn default_value(mut self, v: impl Into<String>) -> Self {
        self.default_value = Some(v.into());
        self
    }

    pub fn validator(mut self, spec: impl Into<String>) -> Self {
        self.validator_spec = Some(spec.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn alias_of(mut self, target: impl Into<String>) -> Self {
        self.alias_target = Some(target.into());
        self
    }
}

/// The option catalog.
pub struct OptionCatalog {
    entries: Vec<OptionInfo>,
    by_name: HashMap<String, usize>,
    by_short: HashMap<char, usize>,
    default_option: Option<usize>,
    links_resolved: bool,
    multi_namespace: bool,
    validators: crate::validator::ValidatorRegistry,
}

impl OptionCatalog {
    pub fn new(multi_namespace: bool) -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            by_short: HashMap::new(),
            default_option: None,
            links_resolved: false,
            multi_namespace,
            validators: crate::validator::ValidatorRegistry::new(),
        }
    }

    pub fn validators_mut(&mut self) -> &mut crate::validator::ValidatorRegistry {
        &mut self.validators
    }

    /// Registers one option. Errors (logic errors) on empty/too-short names,
    /// forbidden characters, duplicate names or short names, a second
    /// `DEFAULT_OPTION`, `DEFAULT_OPTION`+`FLAG` together, or an alias entry
    /// that also carries `help`/`default_value`/`validator`.
    pub fn add(&mut self, spec: OptionSpec) -> Result<(), GetoptError> {
        if self.links_resolved {
            return Err(GetoptError::logic(
                "cannot add options to the catalog after link_aliases() has run",
            ));
        }
        if spec.name.is_empty() {
            return Err(GetoptError::logic("option name must not be empty"));
        }
        if spec.name != DEFAULT_OPTION_NAME && spec.name.chars().count() < 2 {
            return Err(GetoptError::logic(format!(
                "option name \"{}\" must be at least two characters long",
                spec.name
            )));
        }
        if spec.name != DEFAULT_OPTION_NAME {
            // Forbidden characters apply to each `::`-delimited component,
            // not to the joined name -- `:` is itself one of the forbidden
            // characters, so checking the whole string would reject every
            // sectioned name outright.
            let components: Vec<&str> = spec.name.split("::").collect();
            if components.len() > 2 && !self.multi_namespace {
                return Err(GetoptError::logic(format!(
                    "option name \"{}\" embeds more than one \"::\"; enable multi-namespace support to allow this",
                    spec.name
                )));
            }
            for component in &components {
                check_forbidden_chars(component)?;
            }
        }
        if spec.name == DEFAULT_OPTION_NAME && spec.flags.contains(OptionFlags::FLAG) {
            return Err(GetoptError::logic(
                "the default option cannot also be a FLAG",
            ));
        }
        if spec.flags.contains(OptionFlags::DEFAULT_OPTION) && spec.flags.contains(OptionFlags::FLAG)
        {
            return Err(GetoptError::logic(
                "DEFAULT_OPTION and FLAG cannot both be set",
            ));
        }
        if let Some(short) = spec.short_name {
            if self.by_short.contains_key(&short) {
                return Err(GetoptError::logic(format!(
                    "short name '{short}' is already registered"
                )));
            }
        }
        if self.by_name.contains_key(&canonicalize(&spec.name)) {
            return Err(GetoptError::logic(format!(
                "option \"{}\" is already registered",
                spec.name
            )));
        }
        let is_default_option = spec.name == DEFAULT_OPTION_NAME;
        if is_default_option && self.default_option.is_some() {
            return Err(GetoptError::logic(
                "only one option may be named \"--\" (the default option)",
            ));
        }

        let validator = match &spec.validator_spec {
            Some(v) if spec.alias_target.is_none() => Some(self.validators.build(v)?),
            Some(_) => {
                return Err(GetoptError::logic(format!(
                    "alias \"{}\" must not carry a validator",
                    spec.name
                )));
            }
            None => None,
        };
        if spec.alias_target.is_some() {
            if !spec.help.is_empty() {
                return Err(GetoptError::logic(format!(
                    "alias \"{}\" must not carry help text",
                    spec.name
                )));
            }
            if spec.default_value.is_some() {
                return Err(GetoptError::logic(format!(
                    "alias \"{}\" must not carry a default value",
                    spec.name
                )));
            }
        }

        let index = self.entries.len();
        let entry = OptionInfo {
            name: spec.name.clone(),
            short_name: spec.short_name,
            flags: spec.flags,
            default_value: spec.default_value,
            validator,
            help: spec.help,
            separators: spec.separators,
            environment_variable_name: spec.environment_variable_name,
            alias_target: spec.alias_target,
            resolved_alias: None,
        };
        self.by_name.insert(canonicalize(&entry.name), index);
        if let Some(short) = entry.short_name {
            self.by_short.insert(short, index);
        }
        if is_default_option {
            self.default_option = Some(index);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Assigns a short name to an already-registered option. Valid before
    /// the arguments pass; a logic error if the option is unknown or the
    /// short name is already taken.
    pub fn set_short_name(&mut self, name: &str, short: char) -> Result<(), GetoptError> {
        let index = *self
            .by_name
            .get(&canonicalize(name))
            .ok_or_else(|| GetoptError::logic(format!("unknown option \"{name}\"")))?;
        if let Some(existing) = self.by_short.get(&short) {
            if *existing != index {
                return Err(GetoptError::logic(format!(
                    "short name '{short}' is already registered"
                )));
            }
        }
        self.entries[index].short_name = Some(short);
        self.by_short.insert(short, index);
        Ok(())
    }

    /// Resolves every alias's `alias_target` into an index. Must be called
    /// before parsing; every alias target must already be registered and
    /// must not itself be an alias (aliases form a tree of depth one).
    pub fn link_aliases(&mut self) -> Result<(), GetoptError> {
        for i in 0..self.entries.len() {
            let Some(target_name) = self.entries[i].alias_target.clone() else {
                continue;
            };
            let target_index = *self
                .by_name
                .get(&canonicalize(&target_name))
                .ok_or_else(|| {
                    GetoptError::logic(format!(
                        "alias \"{}\" targets unknown option \"{target_name}\"",
                        self.entries[i].name
                    ))
                })?;
            if self.entries[target_index].is_alias() {
                return Err(GetoptError::logic(format!(
                    "alias \"{}\" targets another alias \"{target_name}\"; aliases may not chain",
                    self.entries[i].name
                )));
            }
            self.entries[i].resolved_alias = Some(target_index);
        }
        self.links_resolved = true;
        Ok(())
    }

    fn require_linked(&self) -> Result<(), GetoptError> {
        if !self.links_resolved {
            return Err(GetoptError::logic(
                "alias is missing. Did you call link_aliases()?",
            ));
        }
        Ok(())
    }

    /// Looks up an option by long name, following `_`/`-` equivalence. If
    /// `follow_alias` is true (the default via [`Self::get`]) and the entry
    /// is an alias, returns its resolved target.
    pub fn get_by_name(&self, name: &str, follow_alias: bool) -> Option<&OptionInfo> {
        let index = *self.by_name.get(&canonicalize(name))?;
        self.resolve(index, follow_alias)
    }

    pub fn get(&self, name: &str) -> Option<&OptionInfo> {
        self.get_by_name(name, true)
    }

    pub fn get_by_short(&self, code_point: char, follow_alias: bool) -> Option<&OptionInfo> {
        let index = *self.by_short.get(&code_point)?;
        self.resolve(index, follow_alias)
    }

    fn resolve(&self, index: usize, follow_alias: bool) -> Option<&OptionInfo> {
        let entry = &self.entries[index];
        if follow_alias {
            if let Some(target) = entry.resolved_alias {
                return Some(&self.entries[target]);
            }
        }
        Some(entry)
    }

    /// The canonical (target, if alias) index for an option name, used by
    /// the value store to key its per-option lists consistently regardless
    /// of whether the caller asked for the alias or the target.
    pub fn canonical_index(&self, name: &str) -> Option<usize> {
        let index = *self.by_name.get(&canonicalize(name))?;
        Some(self.entries[index].resolved_alias.unwrap_or(index))
    }

    pub fn canonical_index_for_short(&self, code_point: char) -> Option<usize> {
        let index = *self.by_short.get(&code_point)?;
        Some(self.entries[index].resolved_alias.unwrap_or(index))
    }

    pub fn default_option(&self) -> Option<&OptionInfo> {
        self.default_option.map(|i| &self.entries[i])
    }

    pub fn default_option_index(&self) -> Option<usize> {
        self.default_option
    }

    pub fn entries(&self) -> impl Iterator<Item = &OptionInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers an unknown option encountered during parsing, when the
    /// environment allows `DYNAMIC_PARAMETERS`. Must be called before
    /// `link_aliases()` has frozen the schema... but dynamic registration
    /// happens *during* parsing, after linking; dynamically-added options
    /// can never be aliases, so no further linking is required for them.
    pub fn add_dynamic(&mut self, name: &str, flags: OptionFlags) -> Result<usize, GetoptError> {
        for component in name.split("::") {
            check_forbidden_chars(component)?;
        }
        if let Some(existing) = self.by_name.get(&canonicalize(name)) {
            return Ok(*existing);
        }
        let index = self.entries.len();
        self.entries.push(OptionInfo {
            name: name.to_string(),
            short_name: None,
            flags: flags | OptionFlags::DYNAMIC,
            default_value: None,
            validator: None,
            help: String::new(),
            separators: Vec::new(),
            environment_variable_name: None,
            alias_target: None,
            resolved_alias: None,
        });
        self.by_name.insert(canonicalize(name), index);
        Ok(index)
    }

    pub fn require_links_resolved(&self) -> Result<(), GetoptError> {
        self.require_linked()
    }

    pub fn entry_at(&self, index: usize) -> &OptionInfo {
        &self.entries[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_opt(name: &str, short: Option<char>) -> OptionSpec {
        let mut spec = OptionSpec::new(name).flags(
            OptionFlags::COMMAND_LINE | OptionFlags::ENVIRONMENT_VARIABLE | OptionFlags::FLAG,
        );
        if let Some(c) = short {
            spec = spec.short_name(c);
        }
        spec
    }

    #[test]
    fn duplicate_name_is_logic_error() {
        let mut catalog = OptionCatalog::new(false);
        catalog.add(flag_opt("verbose", Some('v'))).unwrap();
        let err = catalog.add(flag_opt("verbose", Some('x')));
        assert!(matches!(err, Err(GetoptError::Logic(_))));
    }

    #[test]
    fn duplicate_short_name_is_logic_error() {
        let mut catalog = OptionCatalog::new(false);
        catalog.add(flag_opt("verbose", Some('v'))).unwrap();
        let err = catalog.add(flag_opt("other", Some('v')));
        assert!(matches!(err, Err(GetoptError::Logic(_))));
    }

    #[test]
    fn second_default_option_is_logic_error() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("--").flags(OptionFlags::DEFAULT_OPTION | OptionFlags::MULTIPLE))
            .unwrap();
        let err = catalog
            .add(OptionSpec::new("--").flags(OptionFlags::DEFAULT_OPTION | OptionFlags::MULTIPLE));
        assert!(matches!(err, Err(GetoptError::Logic(_))));
    }

    #[test]
    fn default_option_and_flag_together_is_logic_error() {
        let mut catalog = OptionCatalog::new(false);
        let err = catalog.add(
            OptionSpec::new("--").flags(OptionFlags::DEFAULT_OPTION | OptionFlags::FLAG),
        );
        assert!(matches!(err, Err(GetoptError::Logic(_))));
    }

    #[test]
    fn alias_with_help_is_logic_error() {
        let mut catalog = OptionCatalog::new(false);
        catalog.add(flag_opt("verbose", Some('v'))).unwrap();
        let err = catalog.add(
            OptionSpec::new("verbosity")
                .alias_of("verbose")
                .help("nope"),
        );
        assert!(matches!(err, Err(GetoptError::Logic(_))));
    }

    #[test]
    fn alias_resolves_to_target() {
        let mut catalog = OptionCatalog::new(false);
        catalog.add(flag_opt("verbose", Some('v'))).unwrap();
        catalog
            .add(OptionSpec::new("verbosity").alias_of("verbose").short_name('n'))
            .unwrap();
        catalog.link_aliases().unwrap();
        let target = catalog.get("verbose").unwrap() as *const _;
        let via_alias = catalog.get("verbosity").unwrap() as *const _;
        assert_eq!(target, via_alias);
    }

    #[test]
    fn alias_chain_is_rejected() {
        let mut catalog = OptionCatalog::new(false);
        catalog.add(flag_opt("verbose", Some('v'))).unwrap();
        catalog
            .add(OptionSpec::new("verbosity").alias_of("verbose"))
            .unwrap();
        catalog
            .add(OptionSpec::new("chatty").alias_of("verbosity"))
            .unwrap();
        let err = catalog.link_aliases();
        assert!(matches!(err, Err(GetoptError::Logic(_))));
    }

    #[test]
    fn forbidden_char_rejected() {
        let mut catalog = OptionCatalog::new(false);
        let err = catalog.add(flag_opt("ver;bose", None));
        assert!(matches!(err, Err(GetoptError::Logic(_))));
    }

    #[test]
    fn dash_underscore_equivalence_in_lookup() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("dry-run").flags(OptionFlags::COMMAND_LINE | OptionFlags::FLAG))
            .unwrap();
        catalog.link_aliases().unwrap();
        assert!(catalog.get("dry_run").is_some());
        assert!(catalog.get("dry-run").is_some());
    }

    #[test]
    fn name_shorter_than_two_chars_is_logic_error() {
        let mut catalog = OptionCatalog::new(false);
        let err = catalog.add(flag_opt("x", None));
        assert!(matches!(err, Err(GetoptError::Logic(_))));
    }
}
