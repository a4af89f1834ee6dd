//! Filtering charset validation.

use crate::error::{SpecError, SpecResult};

/// Charset used when no node in the chain sets one.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Canonical charset names and the aliases accepted for each.
const CHARSETS: &[(&str, &[&str])] = &[
    ("UTF-8", &["utf8", "unicode-1-1-utf-8"]),
    ("UTF-16", &["utf16", "unicode"]),
    ("UTF-16BE", &["utf-16be", "x-utf-16be", "unicodebigunmarked"]),
    ("UTF-16LE", &["utf-16le", "x-utf-16le", "unicodelittleunmarked"]),
    ("UTF-32", &["utf32"]),
    ("US-ASCII", &["ascii", "iso646-us", "us", "cp367", "646"]),
    ("ISO-8859-1", &["latin1", "l1", "iso8859_1", "iso_8859-1", "cp819", "8859_1"]),
    ("ISO-8859-2", &["latin2", "l2", "iso8859_2", "iso_8859-2"]),
    ("ISO-8859-15", &["latin9", "latin-9", "iso8859_15", "iso_8859-15"]),
    ("windows-1250", &["cp1250"]),
    ("windows-1251", &["cp1251"]),
    ("windows-1252", &["cp1252"]),
    ("Shift_JIS", &["sjis", "shift-jis", "ms_kanji"]),
    ("EUC-JP", &["eucjp", "euc_jp"]),
    ("EUC-KR", &["euckr", "euc_kr"]),
    ("GBK", &["cp936", "windows-936"]),
    ("GB18030", &["gb18030-2000"]),
    ("Big5", &["big5", "csbig5"]),
    ("KOI8-R", &["koi8", "koi8_r"]),
];

/// Look up the canonical name of a supported charset.
pub fn canonical_charset(name: &str) -> Option<&'static str> {
    let name = name.trim();
    CHARSETS.iter().find_map(|(canonical, aliases)| {
        let matches = canonical.eq_ignore_ascii_case(name)
            || aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name));
        matches.then_some(*canonical)
    })
}

/// Check whether a charset name is supported.
pub fn is_supported_charset(name: &str) -> bool {
    canonical_charset(name).is_some()
}

/// Validate a charset name, returning its canonical form.
pub fn validate_charset(name: &str) -> SpecResult<&'static str> {
    canonical_charset(name).ok_or_else(|| SpecError::UnsupportedCharset {
        charset: name.to_string(),
    })
}
