//! Prefix extraction: the text before the cursor that a suggestion replaces.

use std::sync::OnceLock;

use regex::Regex;

/// Lookback window of the legacy prefix expression, in characters.
pub const MAX_LEGACY_PREFIX_LENGTH: usize = 80;

const LEGACY_PREFIX: &str =
    r##"((?-u:\b)|['"~`!@#$%^&*(){}\[\]=+,/?>])(([0-9A-Za-z_]+[0-9A-Za-z_-]*)|([.:;\[{(< ]+))$"##;
const LEGACY_PREFIX_UNICODE: &str =
    r##"(['"~`!@#$%^&*(){}\[\]=+,/?>])?(([\p{L}\d_]+[\p{L}\d_-]*)|([.:;\[{(< ]+))$"##;
const WORD_PREFIX: &str = r"^[0-9A-Za-z_]+[0-9A-Za-z_-]*$";
const WORD_PREFIX_UNICODE: &str = r"^[\p{L}\d_]+[\p{L}\d_-]*$";

fn legacy_regex(extended_unicode: bool) -> &'static Regex {
    static ASCII: OnceLock<Regex> = OnceLock::new();
    static UNICODE: OnceLock<Regex> = OnceLock::new();
    if extended_unicode {
        UNICODE.get_or_init(|| Regex::new(LEGACY_PREFIX_UNICODE).expect("valid regex"))
    } else {
        ASCII.get_or_init(|| Regex::new(LEGACY_PREFIX).expect("valid regex"))
    }
}

fn word_prefix_regex(extended_unicode: bool) -> &'static Regex {
    static ASCII: OnceLock<Regex> = OnceLock::new();
    static UNICODE: OnceLock<Regex> = OnceLock::new();
    if extended_unicode {
        UNICODE.get_or_init(|| Regex::new(WORD_PREFIX_UNICODE).expect("valid regex"))
    } else {
        ASCII.get_or_init(|| Regex::new(WORD_PREFIX).expect("valid regex"))
    }
}

#[inline]
fn is_word_char(ch: char, additional_word_characters: &str) -> bool {
    ch.is_alphanumeric() || additional_word_characters.contains(ch)
}

/// The longest run of word characters ending at the cursor.
///
/// `line_before_cursor` is the cursor row's text up to the cursor.
pub fn primary_prefix<'a>(line_before_cursor: &'a str, additional_word_characters: &str) -> &'a str {
    let start = line_before_cursor
        .char_indices()
        .rev()
        .take_while(|&(_, ch)| is_word_char(ch, additional_word_characters))
        .last()
        .map_or(line_before_cursor.len(), |(idx, _)| idx);
    &line_before_cursor[start..]
}

/// The prefix handed to sources written against API levels below 4.
///
/// Only the last [`MAX_LEGACY_PREFIX_LENGTH`] characters are examined; a
/// match spanning the whole window yields `""`.
pub fn legacy_prefix(line_before_cursor: &str, extended_unicode: bool) -> &str {
    let start = line_before_cursor
        .char_indices()
        .rev()
        .nth(MAX_LEGACY_PREFIX_LENGTH - 1)
        .map_or(0, |(idx, _)| idx);
    let window = &line_before_cursor[start..];

    let Some(prefix) = legacy_regex(extended_unicode)
        .captures(window)
        .and_then(|captures| captures.get(2))
    else {
        return "";
    };
    if prefix.as_str().chars().count() == MAX_LEGACY_PREFIX_LENGTH {
        return "";
    }
    prefix.as_str()
}

/// Whether `prefix` looks like a word: word characters, then word characters or `-`.
pub fn is_word_prefix(prefix: &str, extended_unicode: bool) -> bool {
    word_prefix_regex(extended_unicode).is_match(prefix)
}
