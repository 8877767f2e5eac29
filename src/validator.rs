// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Validator registry: a factory lookup by name, plus the `integer` and
//! `regex` built-ins, modeled as a small capability trait dispatched
//! through `dyn`.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::GetoptError;
use crate::strutil::split_string;

/// A value validator: `name()` for diagnostics, `validate()` for the check.
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;
    fn validate(&self, value: &str) -> bool;
}

type ValidatorFactory = Arc<dyn Fn(&[String]) -> Result<Arc<dyn Validator>, GetoptError> + Send + Sync>;

/// Maps a validator name to a factory that, given an argument list,
/// constructs a validator instance.
pub struct ValidatorRegistry {
    factories: HashMap<String, ValidatorFactory>,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry
            .register("integer", |args| {
                Ok(Arc::new(IntegerValidator::new(args)))
            })
            .expect("built-in validator names must be unique");
        registry
            .register("regex", |args| {
                RegexValidator::from_args(args).map(|v| Arc::new(v) as Arc<dyn Validator>)
            })
            .expect("built-in validator names must be unique");
        registry
    }
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`. Registering a duplicate name is a
    /// logic error.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn(&[String]) -> Result<Arc<dyn Validator>, GetoptError> + Send + Sync + 'static,
    ) -> Result<(), GetoptError> {
        if self.factories.contains_key(name) {
            return Err(GetoptError::logic(format!(
                "a validator factory named \"{name}\" is already registered"
            )));
        }
        self.factories.insert(name.to_string(), Arc::new(factory));
        Ok(())
    }

    /// Builds a validator from the combined string syntax: `name` alone,
    /// `name(arg1, arg2, …)` (parenthesized arguments honor quoting), or, as
    /// a shortcut, a leading `/` which treats the entire string as a
    /// `regex(/…/flags)` invocation.
    pub fn build(&self, spec: &str) -> Result<Arc<dyn Validator>, GetoptError> {
        let spec = spec.trim();
        if let Some(stripped) = spec.strip_prefix('/') {
            let _ = stripped;
            return self.invoke("regex", &[spec.to_string()]);
        }

        match spec.find('(') {
            None => self.invoke(spec, &[]),
            Some(open) => {
                if !spec.ends_with(')') {
                    return Err(GetoptError::logic(format!(
                        "validator spec \"{spec}\" is missing a closing \")\""
                    )));
                }
                let name = spec[..open].trim();
                let inner = &spec[open + 1..spec.len() - 1];
                let args = split_string(inner, &[","])
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .collect::<Vec<_>>();
                self.invoke(name, &args)
            }
        }
    }

    fn invoke(&self, name: &str, args: &[String]) -> Result<Arc<dyn Validator>, GetoptError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| GetoptError::logic(format!("unknown validator \"{name}\"")))?;
        factory(args)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Criterion {
    Exact(i64),
    Range(i64, i64),
}

/// The `integer` built-in validator: accepts an optional sign followed by
/// one or more ASCII digits that fit in a signed 64-bit integer; if
/// constructed with arguments, each must be a single integer (an
/// enumeration member) or an `A...B` range (`A <= B`), and the value is
/// accepted iff it matches any criterion.
pub struct IntegerValidator {
    criteria: Vec<Criterion>,
}

impl IntegerValidator {
    pub fn new(args: &[String]) -> Self {
        let mut criteria = Vec::new();
        for arg in args {
            let arg = arg.trim();
            if let Some((lhs, rhs)) = split_range(arg) {
                match (parse_strict_i64(lhs), parse_strict_i64(rhs)) {
                    (Some(a), Some(b)) if a <= b => criteria.push(Criterion::Range(a, b)),
                    _ => {
                        crate::error::emit(&crate::error::Diagnostic::error(format!(
                            "invalid integer range \"{arg}\" in validator arguments"
                        )));
                    }
                }
            } else if let Some(n) = parse_strict_i64(arg) {
                criteria.push(Criterion::Exact(n));
            } else {
                crate::error::emit(&crate::error::Diagnostic::error(format!(
                    "invalid integer enumeration member \"{arg}\" in validator arguments"
                )));
            }
        }
        Self { criteria }
    }
}

fn split_range(s: &str) -> Option<(&str, &str)> {
    let idx = s.find("...")?;
    Some((s[..idx].trim(), s[idx + 3..].trim()))
}

/// Parses an optional `+`/`-` sign followed by one or more ASCII digits;
/// rejects whitespace, letters, the empty string, and overflow of i64.
fn parse_strict_i64(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    let bytes = s.as_bytes();
    let (sign, digits) = match bytes[0] {
        b'+' | b'-' => (1, &s[1..]),
        _ => (0, s),
    };
    let _ = sign;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok()
}

impl Validator for IntegerValidator {
    fn name(&self) -> &str {
        "integer"
    }

    fn validate(&self, value: &str) -> bool {
        let Some(n) = parse_strict_i64(value) else {
            return false;
        };
        if self.criteria.is_empty() {
            return true;
        }
        self.criteria.iter().any(|c| match c {
            Criterion::Exact(e) => *e == n,
            Criterion::Range(lo, hi) => n >= *lo && n <= *hi,
        })
    }
}

/// The `regex` built-in validator: full-string anchored match, optionally
/// case-insensitive.
pub struct RegexValidator {
    source: String,
    regex: Regex,
}

impl RegexValidator {
    /// Accepts either a single-argument list (`regex(pattern)` /
    /// `regex(/pattern/i)`) or a bare `/pattern/flags` string.
    pub fn from_args(args: &[String]) -> Result<Self, GetoptError> {
        if args.len() > 1 {
            return Err(GetoptError::logic(
                "the regex validator accepts at most one argument",
            ));
        }
        let spec = args.first().cloned().unwrap_or_default();
        Self::parse(&spec)
    }

    fn parse(spec: &str) -> Result<Self, GetoptError> {
        let (body, case_insensitive) = if let Some(rest) = spec.strip_prefix('/') {
            match rest.rfind('/') {
                Some(end) => {
                    let body = &rest[..end];
                    let flags = &rest[end + 1..];
                    let mut ci = false;
                    for flag in flags.chars() {
                        if flag == 'i' {
                            ci = true;
                        } else {
                            crate::error::emit(&crate::error::Diagnostic::error(format!(
                                "unsupported regex flag '{flag}' in \"{spec}\""
                            )));
                        }
                    }
                    (body.to_string(), ci)
                }
                None => {
                    crate::error::emit(&crate::error::Diagnostic::error(format!(
                        "regex \"{spec}\" is missing a closing \"/\""
                    )));
                    (rest.to_string(), false)
                }
            }
        } else {
            (spec.to_string(), false)
        };

        let pattern = format!("(?:{body})$");
        let pattern = if case_insensitive {
            format!("(?i){pattern}")
        } else {
            pattern
        };
        // Anchor at the start explicitly; Regex::is_match with `^...$` gives
        // full-string matching.
        let anchored = format!("^{pattern}");
        let regex = Regex::new(&anchored)
            .map_err(|e| GetoptError::logic(format!("invalid regex \"{body}\": {e}")))?;
        Ok(Self {
            source: spec.to_string(),
            regex,
        })
    }
}

impl Validator for RegexValidator {
    fn name(&self) -> &str {
        "regex"
    }

    fn validate(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    // `source` retained for future diagnostic rendering; read via Debug.
}

impl std::fmt::Debug for RegexValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexValidator")
            .field("source", &self.source)
            .finish()
    }
}
