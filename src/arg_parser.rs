// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The long/short argument tokenizer: a single `while let Some(arg) = ...`
//! loop dispatching on the shape of each token into long-option,
//! short-option-chain, or default-option handling.

use crate::catalog::{DEFAULT_OPTION_NAME, OptionCatalog};
use crate::error::{DiagnosticCollector, GetoptError};
use crate::flags::OptionFlags;
use crate::strutil::split_string;
use crate::value_store::{Source, ValueStore};

/// Parses `args` (e.g. `argv[1..]`, or an environment-variable token
/// stream) against `catalog`/`store`, recording values under `source`.
/// `program_name` is used only to format diagnostics that mirror the
/// original tool's own wording.
pub struct ArgParser<'a> {
    catalog: &'a mut OptionCatalog,
}

impl<'a> ArgParser<'a> {
    pub fn new(catalog: &'a mut OptionCatalog) -> Self {
        Self { catalog }
    }

    pub fn parse(
        &mut self,
        args: &[String],
        source: Source,
        store: &mut ValueStore,
    ) -> Result<(), GetoptError> {
        let mut diagnostics = DiagnosticCollector::new();
        let mut i = 0;
        let mut after_double_dash = false;

        while i < args.len() {
            let arg = args[i].as_str();

            if after_double_dash {
                self.feed_default(arg, source, store, &mut diagnostics);
                i += 1;
                continue;
            }

            if arg == "--" {
                if source == Source::Environment
                    && !self.default_accepts_source(Source::Environment)
                {
                    diagnostics.error(
                        "option -- is not supported in the environment variable.".to_string(),
                    );
                    i += 1;
                    continue;
                }
                if self.catalog.default_option().is_none() {
                    diagnostics.error(
                        "no default options defined; thus -- is not accepted by this program."
                            .to_string(),
                    );
                    i += 1;
                    continue;
                }
                after_double_dash = true;
                i += 1;
                continue;
            }

            if let Some(rest) = arg.strip_prefix("--") {
                i = self.parse_long(rest, args, i, source, store, &mut diagnostics);
                continue;
            }

            if arg == "-" {
                if self.default_accepts_source(source) {
                    self.write_default("-", source, store, &mut diagnostics);
                } else if self.catalog.default_option().is_none() {
                    diagnostics.error(format!(
                        "no default options defined; thus - is not accepted by this program."
                    ));
                } else {
                    diagnostics.error(format!(
                        "option - is not supported in {}.",
                        OptionFlags::display_source(source)
                    ));
                }
                i += 1;
                continue;
            }

            if let Some(rest) = arg.strip_prefix('-') {
                if !rest.is_empty() && rest.chars().next().unwrap().is_ascii_digit() {
                    // A bare negative number with no DEFAULT_OPTION short-name
                    // collision falls through to positional handling.
                    self.feed_default(arg, source, store, &mut diagnostics);
                    i += 1;
                    continue;
                }
                i = self.parse_short(rest, args, i, source, store, &mut diagnostics);
                continue;
            }

            self.feed_default(arg, source, store, &mut diagnostics);
            i += 1;
        }

        diagnostics.finish()
    }

    fn default_accepts_source(&self, source: Source) -> bool {
        self.catalog
            .default_option()
            .is_some_and(|info| info.flags.accepts(source))
    }

    fn feed_default(
        &mut self,
        value: &str,
        source: Source,
        store: &mut ValueStore,
        diagnostics: &mut DiagnosticCollector,
    ) {
        if self.catalog.default_option().is_none() {
            diagnostics.error(format!(
                "no default options defined; we do not know what to do of \"{value}\"; standalone parameters are not accepted by this program."
            ));
            return;
        }
        self.write_default(value, source, store, diagnostics);
    }

    fn write_default(
        &mut self,
        value: &str,
        source: Source,
        store: &mut ValueStore,
        diagnostics: &mut DiagnosticCollector,
    ) {
        let Some(index) = self.catalog.default_option_index() else {
            return;
        };
        if !self.default_accepts_source(source) {
            diagnostics.error(format!(
                "option {DEFAULT_OPTION_NAME} is not supported in {}.",
                OptionFlags::display_source(source)
            ));
            return;
        }
        store.set(index, source, value.to_string(), true);
    }

    fn parse_long(
        &mut self,
        rest: &str,
        args: &[String],
        i: usize,
        source: Source,
        store: &mut ValueStore,
        diagnostics: &mut DiagnosticCollector,
    ) -> usize {
        let (name, inline_value) = match rest.find('=') {
            Some(eq) => (&rest[..eq], Some(rest[eq + 1..].to_string())),
            None => (rest, None),
        };

        if name.is_empty() {
            // Already handled by the "--" and "after_double_dash" branches.
            return i + 1;
        }

        let Some(index) = self.resolve_or_register(name, diagnostics) else {
            return i + 1;
        };
        let info_is_flag;
        let info_required;
        let info_multiple;
        let info_separators;
        let accepts_source;
        {
            let info = self.catalog.entry_at(index);
            info_is_flag = info.flags.contains(OptionFlags::FLAG);
            info_required = info.flags.contains(OptionFlags::REQUIRED);
            info_multiple = info.flags.contains(OptionFlags::MULTIPLE);
            info_separators = info.separators.clone();
            accepts_source = info.flags.accepts(source);
        }

        if !accepts_source {
            diagnostics.error(format!(
                "option --{name} is not supported in {}.",
                OptionFlags::display_source(source)
            ));
            return i + 1;
        }

        if info_is_flag {
            match inline_value {
                None => store.set(index, source, String::new(), false),
                Some(v) if source == Source::Configuration => match v.as_str() {
                    "true" => store.set(index, source, String::new(), false),
                    "false" => store.reset(index),
                    other => diagnostics.error(format!(
                        "option --{name} cannot be given value \"{other}\"; it only accepts \"true\" or \"false\"."
                    )),
                },
                Some(_) => diagnostics.error(format!("option --{name} does not accept arguments")),
            }
            return i + 1;
        }

        // A non-FLAG option with no inline `=value` always consumes the
        // following non-option token(s) as its value(s); REQUIRED only
        // governs whether it is an error for none to be present. MULTIPLE
        // greedily absorbs every following non-option token, not just one.
        let (values, consumed) = match inline_value {
            Some(v) => (vec![v], 0),
            None if info_multiple => {
                let mut values = Vec::new();
                let mut j = i + 1;
                while let Some(next) = args.get(j) {
                    if looks_like_option(next) {
                        break;
                    }
                    values.push(next.clone());
                    j += 1;
                }
                (values, j - (i + 1))
            }
            None => match args.get(i + 1) {
                Some(next) if !looks_like_option(next) => (vec![next.clone()], 1),
                _ => (Vec::new(), 0),
            },
        };

        if values.is_empty() {
            if info_required {
                diagnostics.error(format!("option --{name} must be given a value."));
            }
            return i + 1 + consumed;
        }

        for value in values {
            if info_multiple && !info_separators.is_empty() && !value.is_empty() {
                let separators: Vec<&str> = info_separators.iter().map(String::as_str).collect();
                for token in split_string(&value, &separators) {
                    store.set(index, source, token, true);
                }
            } else {
                store.set(index, source, value, info_multiple);
            }
        }

        i + 1 + consumed
    }

    fn parse_short(
        &mut self,
        rest: &str,
        args: &[String],
        i: usize,
        source: Source,
        store: &mut ValueStore,
        diagnostics: &mut DiagnosticCollector,
    ) -> usize {
        let chars: Vec<char> = rest.chars().collect();
        let mut consumed_next = false;
        let mut pos = 0;

        while pos < chars.len() {
            let c = chars[pos];
            let Some(index) = self.catalog.canonical_index_for_short(c) else {
                diagnostics.error(format!("option -{c} is not supported."));
                pos += 1;
                continue;
            };

            let info_is_flag;
            let info_required;
            let info_multiple;
            let accepts_source;
            let name;
            {
                let info = self.catalog.entry_at(index);
                info_is_flag = info.flags.contains(OptionFlags::FLAG);
                info_required = info.flags.contains(OptionFlags::REQUIRED);
                info_multiple = info.flags.contains(OptionFlags::MULTIPLE);
                accepts_source = info.flags.accepts(source);
                name = info.name.clone();
            }

            if !accepts_source {
                diagnostics.error(format!(
                    "option -{c} is not supported in {}.",
                    OptionFlags::display_source(source)
                ));
                pos += 1;
                continue;
            }

            if info_is_flag {
                store.set(index, source, String::new(), false);
                pos += 1;
                continue;
            }

            let remainder: String = chars[pos + 1..].iter().collect();
            let value = if !remainder.is_empty() {
                remainder
            } else if let Some(next) = args.get(i + 1) {
                consumed_next = true;
                next.clone()
            } else {
                if info_required {
                    diagnostics.error(format!("option --{name} expects an argument."));
                }
                String::new()
            };

            store.set(index, source, value, info_multiple);
            // A REQUIRED short option consumes the remainder of the token
            // (or the next token); nothing more in this chain is parsed.
            pos = chars.len();
        }

        i + 1 + usize::from(consumed_next)
    }

    /// Resolves `name` against the catalog. Silent dynamic registration of
    /// an unknown name is a configuration-file-only behavior (see
    /// `crate::config::ConfigReader`); an unknown option on the command
    /// line or in the environment variable is always an error, regardless
    /// of `DYNAMIC_PARAMETERS`.
    fn resolve_or_register(&mut self, name: &str, diagnostics: &mut DiagnosticCollector) -> Option<usize> {
        match self.catalog.canonical_index(name) {
            Some(index) => Some(index),
            None => {
                diagnostics.error(format!("option --{name} is not supported."));
                None
            }
        }
    }
}

fn looks_like_option(token: &str) -> bool {
    token.starts_with('-') && token != "-"
}

/// Splits `argv[0]` into `(basename, fullname)`.
pub fn parse_program_name(argv0: &str) -> (String, String) {
    let basename = argv0.rsplit('/').next().unwrap_or(argv0).to_string();
    (basename, argv0.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OptionSpec;

    fn catalog_with_default(multiple: bool) -> OptionCatalog {
        let mut catalog = OptionCatalog::new(false);
        let mut flags = OptionFlags::COMMAND_LINE | OptionFlags::DEFAULT_OPTION;
        if multiple {
            flags |= OptionFlags::MULTIPLE;
        }
        catalog
            .add(OptionSpec::new(DEFAULT_OPTION_NAME).flags(flags))
            .unwrap();
        catalog.link_aliases().unwrap();
        catalog
    }

    #[test]
    fn positional_tokens_captured_in_order() {
        let mut catalog = catalog_with_default(true);
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        parser
            .parse(
                &["x".into(), "y".into(), "z".into()],
                Source::CommandLine,
                &mut store,
            )
            .unwrap();
        let index = catalog.default_option_index().unwrap();
        let list = store.get(index).unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn double_dash_captures_remaining_tokens_verbatim() {
        let mut catalog = catalog_with_default(true);
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        parser
            .parse(
                &["--".into(), "--x".into(), "y".into()],
                Source::CommandLine,
                &mut store,
            )
            .unwrap();
        let index = catalog.default_option_index().unwrap();
        let list = store.get(index).unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["--x", "y"]);
    }

    #[test]
    fn double_dash_without_default_option_is_error() {
        let mut catalog = OptionCatalog::new(false);
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        let err = parser.parse(&["--".into()], Source::CommandLine, &mut store);
        assert!(matches!(err, Err(GetoptError::Parse(_))));
    }

    #[test]
    fn short_option_chaining_flags_then_required() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("aa").short_name('a').flags(
                OptionFlags::COMMAND_LINE | OptionFlags::FLAG,
            ))
            .unwrap();
        catalog
            .add(OptionSpec::new("bb").short_name('b').flags(
                OptionFlags::COMMAND_LINE | OptionFlags::FLAG,
            ))
            .unwrap();
        catalog
            .add(OptionSpec::new("cc").short_name('c').flags(
                OptionFlags::COMMAND_LINE | OptionFlags::REQUIRED,
            ))
            .unwrap();
        catalog.link_aliases().unwrap();

        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        parser
            .parse(&["-abcvalue".into()], Source::CommandLine, &mut store)
            .unwrap();

        let a_index = catalog.canonical_index("aa").unwrap();
        let b_index = catalog.canonical_index("bb").unwrap();
        let c_index = catalog.canonical_index("cc").unwrap();
        assert!(store.is_defined(a_index));
        assert!(store.is_defined(b_index));
        assert_eq!(store.get(c_index).unwrap().get(0), Some("value"));
    }

    #[test]
    fn required_long_option_consumes_next_token() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("output").flags(
                OptionFlags::COMMAND_LINE | OptionFlags::REQUIRED,
            ))
            .unwrap();
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        parser
            .parse(
                &["--output".into(), "file.txt".into()],
                Source::CommandLine,
                &mut store,
            )
            .unwrap();
        let index = catalog.canonical_index("output").unwrap();
        assert_eq!(store.get(index).unwrap().get(0), Some("file.txt"));
    }

    #[test]
    fn required_with_no_following_value_is_error() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("output").flags(
                OptionFlags::COMMAND_LINE | OptionFlags::REQUIRED,
            ))
            .unwrap();
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        let err = parser.parse(&["--output".into()], Source::CommandLine, &mut store);
        assert!(matches!(err, Err(GetoptError::Parse(_))));
    }

    #[test]
    fn non_required_long_option_still_consumes_next_token() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("number").flags(OptionFlags::COMMAND_LINE))
            .unwrap();
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        parser
            .parse(&["--number".into(), "709".into()], Source::CommandLine, &mut store)
            .unwrap();
        let index = catalog.canonical_index("number").unwrap();
        assert_eq!(store.get(index).unwrap().get(0), Some("709"));
    }

    #[test]
    fn multiple_long_option_greedily_absorbs_following_tokens() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("out").flags(
                OptionFlags::COMMAND_LINE | OptionFlags::REQUIRED | OptionFlags::MULTIPLE,
            ))
            .unwrap();
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        parser
            .parse(
                &["--out".into(), "a.out".into(), "b.out".into(), "c.out".into()],
                Source::CommandLine,
                &mut store,
            )
            .unwrap();
        let index = catalog.canonical_index("out").unwrap();
        let list = store.get(index).unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["a.out", "b.out", "c.out"]);
    }

    #[test]
    fn multiple_long_option_stops_at_the_next_option_token() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("out").flags(OptionFlags::COMMAND_LINE | OptionFlags::MULTIPLE))
            .unwrap();
        catalog
            .add(OptionSpec::new("verbose").flags(OptionFlags::COMMAND_LINE | OptionFlags::FLAG))
            .unwrap();
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        parser
            .parse(
                &["--out".into(), "a.out".into(), "b.out".into(), "--verbose".into()],
                Source::CommandLine,
                &mut store,
            )
            .unwrap();
        let index = catalog.canonical_index("out").unwrap();
        assert_eq!(store.size(index), 2);
        assert!(store.is_defined(catalog.canonical_index("verbose").unwrap()));
    }

    #[test]
    fn flag_with_inline_value_on_command_line_is_error() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(OptionSpec::new("verbose").flags(
                OptionFlags::COMMAND_LINE | OptionFlags::FLAG,
            ))
            .unwrap();
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        let err = parser.parse(&["--verbose=yes".into()], Source::CommandLine, &mut store);
        assert!(matches!(err, Err(GetoptError::Parse(_))));
    }

    #[test]
    fn unknown_long_option_is_error() {
        let mut catalog = OptionCatalog::new(false);
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let mut parser = ArgParser::new(&mut catalog);
        let err = parser.parse(&["--mystery".into()], Source::CommandLine, &mut store);
        assert!(matches!(err, Err(GetoptError::Parse(_))));
    }

    #[test]
    fn program_name_splits_basename() {
        assert_eq!(
            parse_program_name("/usr/bin/mytool"),
            ("mytool".to_string(), "/usr/bin/mytool".to_string())
        );
        assert_eq!(
            parse_program_name("mytool"),
            ("mytool".to_string(), "mytool".to_string())
        );
    }
}
