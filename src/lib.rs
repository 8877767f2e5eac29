// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! An advanced command-line option parsing and configuration resolution
//! library: a declarative option catalog, a long/short argument tokenizer,
//! an environment-variable reader, and a hierarchical `name = value`
//! configuration-file loader, merged under command-line > environment >
//! configuration-file > default precedence.
//!
//! [`Getopt`] is the orchestrator most callers reach for first; the
//! component modules (`catalog`, `value_store`, `arg_parser`, `env_parser`,
//! `config`, `validator`) are public for callers building a custom
//! bootstrap sequence.

pub mod arg_parser;
pub mod catalog;
pub mod config;
pub mod env_parser;
pub mod error;
pub mod flags;
pub mod getopt;
pub mod id;
pub mod options_file;
pub mod strutil;
pub mod validator;
pub mod value_store;


pub use catalog::{OptionCatalog, OptionInfo, OptionSpec};
pub use config::{Config, ConfigLocations, ConfigReader, ConfigSource};
pub use error::{Diagnostic, DiagnosticSink, GetoptError, Severity};
pub use flags::OptionFlags;
pub use getopt::{Getopt, OptionEnvironment, SystemOption};
pub use validator::{IntegerValidator, RegexValidator, Validator, ValidatorRegistry};
pub use value_store::{Source, ValueList, ValueStore};
