// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Name validation shared between the option catalog and the
//! configuration-file loader: forbidden-character checks, `section::leaf`
//! splitting, and `_`/`-` canonicalization.

use crate::error::GetoptError;

/// Characters forbidden in an option name or a configuration-file section
/// name.
const FORBIDDEN_NAME_CHARS: &[char] = &[';', '#', '/', '=', ':', '?', '+', '\\'];

/// Is `name` a valid catalog/section name component? Control characters,
/// whitespace, quotation marks, and the characters in
/// [`FORBIDDEN_NAME_CHARS`] are disallowed.
pub fn check_forbidden_chars(name: &str) -> Result<(), GetoptError> {
    for c in name.chars() {
        if c.is_control()
            || c.is_whitespace()
            || c == '\''
            || c == '"'
            || FORBIDDEN_NAME_CHARS.contains(&c)
        {
            return Err(GetoptError::logic(format!(
                "option name \"{name}\" contains the forbidden character '{c}'"
            )));
        }
    }
    Ok(())
}

/// Splits `name` into an optional section and the leaf name, on the single
/// permitted `::` separator. More than one `::` is a logic error.
pub fn split_section(name: &str) -> Result<(Option<&str>, &str), GetoptError> {
    match name.matches("::").count() {
        0 => Ok((None, name)),
        1 => {
            let idx = name.find("::").unwrap();
            Ok((Some(&name[..idx]), &name[idx + 2..]))
        }
        _ => Err(GetoptError::logic(format!(
            "option name \"{name}\" embeds more than one \"::\""
        ))),
    }
}

/// Canonicalizes an option name for lookup purposes: `_` and `-` are
/// interchangeable when matching, but the canonical stored form uses `-`.
pub fn canonicalize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '_' { '-' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_chars_detected() {
        assert!(check_forbidden_chars("ok-name").is_ok());
        assert!(check_forbidden_chars("bad;name").is_err());
        assert!(check_forbidden_chars("bad name").is_err());
        assert!(check_forbidden_chars("bad\"name").is_err());
    }

    #[test]
    fn split_section_single_separator() {
        assert_eq!(split_section("leaf").unwrap(), (None, "leaf"));
        assert_eq!(
            split_section("section::leaf").unwrap(),
            (Some("section"), "leaf")
        );
        assert!(split_section("a::b::c").is_err());
    }

    #[test]
    fn canonicalize_maps_underscore_to_dash() {
        assert_eq!(canonicalize("dry_run"), "dry-run");
        assert_eq!(canonicalize("dry-run"), "dry-run");
    }
}
