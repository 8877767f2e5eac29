// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The environment-variable parser: reads one named environment variable,
//! tokenizes it with shell-like quoting via [`crate::strutil::split_string`],
//! then drives the same [`ArgParser`] used for the command line with
//! `Source::Environment`.

use crate::arg_parser::ArgParser;
use crate::catalog::OptionCatalog;
use crate::error::GetoptError;
use crate::value_store::{Source, ValueStore};

const WHITESPACE_SEPARATORS: &[&str] = &[" ", "\t", "\n", "\r"];

/// Reads `variable_name` from the process environment. If unset or empty,
/// this is a no-op (`Ok(())`). Otherwise splits on whitespace, honoring
/// quotes per [`crate::strutil::split_string`], and parses the resulting
/// tokens against `catalog`/`store`. An unknown option found here is always
/// an error — silent dynamic registration applies to configuration-file
/// assignments only.
pub fn parse_environment_variable(
    variable_name: &str,
    catalog: &mut OptionCatalog,
    store: &mut ValueStore,
) -> Result<(), GetoptError> {
    let Ok(raw) = std::env::var(variable_name) else {
        return Ok(());
    };
    if raw.is_empty() {
        return Ok(());
    }

    let tokens = tokenize(&raw);
    let mut parser = ArgParser::new(catalog);
    parser.parse(&tokens, Source::Environment, store)
}

fn tokenize(raw: &str) -> Vec<String> {
    crate::strutil::split_string(raw, WHITESPACE_SEPARATORS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OptionSpec;
    use crate::flags::OptionFlags;

    #[test]
    fn tokenizes_on_whitespace_honoring_quotes() {
        let tokens = tokenize("--name 'John Doe' --verbose");
        assert_eq!(
            tokens,
            vec![
                "--name".to_string(),
                "John Doe".to_string(),
                "--verbose".to_string()
            ]
        );
    }

    #[test]
    fn unset_variable_is_a_no_op() {
        let mut catalog = OptionCatalog::new(false);
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();
        let result = parse_environment_variable(
            "ADVOPT_TEST_DOES_NOT_EXIST_XYZ",
            &mut catalog,
            &mut store,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn populated_variable_feeds_the_argument_parser() {
        let mut catalog = OptionCatalog::new(false);
        catalog
            .add(
                OptionSpec::new("greeting")
                    .flags(OptionFlags::ENVIRONMENT_VARIABLE | OptionFlags::REQUIRED),
            )
            .unwrap();
        catalog.link_aliases().unwrap();
        let mut store = ValueStore::new();

        std::env::set_var("ADVOPT_TEST_GREETING", "--greeting hello");
        let result = parse_environment_variable(
            "ADVOPT_TEST_GREETING",
            &mut catalog,
            &mut store,
        );
        std::env::remove_var("ADVOPT_TEST_GREETING");

        assert!(result.is_ok());
        let index = catalog.canonical_index("greeting").unwrap();
        assert_eq!(store.get(index).unwrap().get(0), Some("hello"));
    }
}
