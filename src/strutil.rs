// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Variant-string utilities: unquoting, quote-aware splitting,
//! project-directory interpolation, and `~` expansion.

use std::path::{Path, PathBuf};

/// If `s` begins with a character from `pairs` at an even index and ends with
/// its matching close character at the corresponding odd index, returns the
/// interior substring; otherwise returns `s` unchanged. `pairs` is read two
/// characters at a time as `(open, close)` pairs, e.g. `"'\"" ` pairs `'` with
/// `'` and `"` with `"`.
pub fn unquote(s: &str, pairs: &str) -> String {
    let pair_chars: Vec<char> = pairs.chars().collect();
    let mut chunks = pair_chars.chunks_exact(2);
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < 2 {
        return s.to_string();
    }
    let first = chars[0];
    let last = chars[chars.len() - 1];
    for chunk in &mut chunks {
        let (open, close) = (chunk[0], chunk[1]);
        if first == open && last == close {
            return chars[1..chars.len() - 1].iter().collect();
        }
    }
    s.to_string()
}

/// Splits `input` on any of the provided separator strings, treating `'...'`
/// and `"..."` as atomic (quotes stripped from the produced token). Empty
/// tokens are suppressed. An unterminated quote causes the remainder of the
/// input to be taken as a single token that *retains* its opening quote
/// character.
pub fn split_string(input: &str, separators: &[&str]) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut current = String::new();

    fn starts_with_separator(chars: &[char], i: usize, sep: &str) -> bool {
        let sep_chars: Vec<char> = sep.chars().collect();
        if sep_chars.is_empty() || i + sep_chars.len() > chars.len() {
            return false;
        }
        chars[i..i + sep_chars.len()] == sep_chars[..]
    }

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' {
            // Find the matching close quote.
            if let Some(rel) = chars[i + 1..].iter().position(|&ch| ch == c) {
                let close = i + 1 + rel;
                current.extend(&chars[i + 1..close]);
                i = close + 1;
                continue;
            } else {
                // Unterminated: remainder (including the opening quote) is
                // one token.
                current.push(c);
                current.extend(&chars[i + 1..]);
                tokens.push(std::mem::take(&mut current));
                i = chars.len();
                break;
            }
        }

        if let Some(sep) = separators
            .iter()
            .find(|&&sep| starts_with_separator(&chars, i, sep))
        {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            i += sep.chars().count();
            continue;
        }

        current.push(c);
        i += 1;
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Given `/a/b/c/basename.ext` and `proj`, returns `/a/b/c/proj.d/basename.ext`.
/// With `priority` given, produces `/a/b/c/proj.d/50-basename.ext`. Empty
/// inputs yield an empty result.
pub fn insert_project_name(path: &str, project: &str) -> String {
    insert_project_name_with_priority(path, project, None)
}

pub fn insert_project_name_with_priority(
    path: &str,
    project: &str,
    priority: Option<u32>,
) -> String {
    if path.is_empty() || project.is_empty() {
        return String::new();
    }
    let p = Path::new(path);
    let parent = p.parent().unwrap_or_else(|| Path::new(""));
    let file_name = match p.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return String::new(),
    };
    let overlay_dir = format!("{project}.d");
    let basename = match priority {
        Some(n) => format!("{n}-{file_name}"),
        None => file_name,
    };
    let mut out: PathBuf = parent.to_path_buf();
    out.push(overlay_dir);
    out.push(basename);
    out.to_string_lossy().into_owned()
}

/// If `path` begins with `~` and is exactly `~` or has `/` at index 1, and
/// `HOME` is set and non-empty, replaces the leading `~` with `HOME`'s value;
/// otherwise returns `path` unchanged.
pub fn handle_user_directory(path: &str) -> String {
    let looks_like_home = path == "~" || path.starts_with("~/");
    if !looks_like_home {
        return path.to_string();
    }
    shellexpand::tilde_with_context(path, || {
        std::env::var("HOME")
            .ok()
            .filter(|home| !home.is_empty())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_single_and_double() {
        assert_eq!(unquote("'hello'", "'\""), "hello");
        assert_eq!(unquote("\"hello\"", "'\""), "hello");
        assert_eq!(unquote("hello", "'\""), "hello");
    }

    #[test]
    fn unquote_mismatched_is_unchanged() {
        assert_eq!(unquote("'hello\"", "'\""), "'hello\"");
        assert_eq!(unquote("'h", "'\""), "'h");
    }

    #[test]
    fn unquote_idempotent() {
        for s in ["plain", "'quoted'", "\"double\"", "'mismatched\""] {
            let once = unquote(s, "'\"");
            let twice = unquote(&once, "'\"");
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn unquote_roundtrip() {
        for q in ['\'', '"'] {
            let s = "no-quotes-inside";
            let quoted = format!("{q}{s}{q}");
            assert_eq!(unquote(&quoted, "'\""), s);
        }
    }

    #[test]
    fn split_basic() {
        assert_eq!(
            split_string("a, b,c", &[","]),
            vec!["a".to_string(), " b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn split_honors_quotes() {
        assert_eq!(
            split_string("'a,b', c", &[","]),
            vec!["a,b".to_string(), " c".to_string()]
        );
    }

    #[test]
    fn split_unterminated_quote_keeps_opening_char() {
        assert_eq!(split_string("a,'b,c", &[","]), vec!["a", "'b,c"]);
    }

    #[test]
    fn split_suppresses_empty_tokens() {
        assert_eq!(split_string("a,,b", &[","]), vec!["a", "b"]);
    }

    #[test]
    fn project_name_insertion() {
        assert_eq!(
            insert_project_name("/a/b/c/basename.ext", "proj"),
            "/a/b/c/proj.d/basename.ext"
        );
        assert_eq!(
            insert_project_name_with_priority("/a/b/c/basename.ext", "proj", Some(50)),
            "/a/b/c/proj.d/50-basename.ext"
        );
        assert_eq!(insert_project_name("", "proj"), "");
        assert_eq!(insert_project_name("/a/b", ""), "");
    }

    #[test]
    fn user_directory_expansion() {
        std::env::set_var("HOME", "/home/example");
        assert_eq!(handle_user_directory("~"), "/home/example");
        assert_eq!(
            handle_user_directory("~/bin"),
            "/home/example/bin"
        );
        assert_eq!(handle_user_directory("~notaslash"), "~notaslash");
        assert_eq!(handle_user_directory("/abs/path"), "/abs/path");
    }

    #[test]
    fn user_directory_unset_home_is_unchanged() {
        std::env::remove_var("HOME");
        assert_eq!(handle_user_directory("~/bin"), "~/bin");
        std::env::set_var("HOME", "/home/example");
    }
}
