//! Common utility functions

use std::path::{Path, PathBuf};

pub fn truncate_display(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Text worth sending to a backend: it has at least one letter.
/// Numbers, bullets and punctuation pass through untouched.
pub fn needs_translation(s: &str) -> bool {
    s.chars().any(char::is_alphabetic)
}

/// Splits `s` into (leading whitespace, core, trailing whitespace).
pub fn split_edge_whitespace(s: &str) -> (&str, &str, &str) {
    let core_start = s.len() - s.trim_start().len();
    let core_end = s.trim_end().len().max(core_start);
    (&s[..core_start], &s[core_start..core_end], &s[core_end..])
}

/// True when `a` and `b` name the same file. `b` does not need to exist yet.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (resolve(a), resolve(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(p) = path.canonicalize() {
        return Some(p);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    parent.canonicalize().ok().map(|p| p.join(name))
}

pub const SYMBOL_FONTS: &[&str] = &["Wingdings", "Wingdings 2", "Wingdings 3", "Symbol", "Webdings"];

pub const SYMBOL_GLYPHS: &[&str] = &["✔", "✓", "✗", "✘", "❌", "●", "○", "■", "□"];

pub fn is_symbol_font(name: &str) -> bool {
    SYMBOL_FONTS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

pub fn is_symbol_glyph(text: &str) -> bool {
    SYMBOL_GLYPHS.contains(&text.trim())
}
