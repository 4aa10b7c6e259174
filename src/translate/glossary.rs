//! Glossary term protection with whole-word matching

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::utils::is_word_char;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub term: String,
    pub forced_translation: Option<String>,
    pub protect: bool,
    pub exact_case: bool,
}

impl GlossaryEntry {
    /// A term that must appear untranslated.
    pub fn protected(term: &str) -> Self {
        Self {
            term: term.to_string(),
            forced_translation: None,
            protect: true,
            exact_case: false,
        }
    }

    /// A term that is always replaced by `translation`.
    pub fn forced(term: &str, translation: &str) -> Self {
        Self {
            term: term.to_string(),
            forced_translation: Some(translation.to_string()),
            protect: false,
            exact_case: false,
        }
    }

    pub fn with_exact_case(mut self) -> Self {
        self.exact_case = true;
        self
    }

    /// An entry must name a term and either protect it or force a translation.
    pub fn is_valid(&self) -> bool {
        !self.term.trim().is_empty()
            && (self.protect
                || self
                    .forced_translation
                    .as_deref()
                    .is_some_and(|t| !t.trim().is_empty()))
    }

    fn key(&self) -> String {
        if self.exact_case {
            self.term.clone()
        } else {
            self.term.to_lowercase()
        }
    }
}

/// How term boundaries are detected in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Match only when bounded by non-word characters or the string edges
    #[default]
    WholeWord,
    /// Plain substring match, for scripts without whitespace-delimited words
    Substring,
}

impl MatchPolicy {
    pub fn for_language(lang: &str, substring_languages: &[String]) -> Self {
        let base = lang
            .split(['-', '_'])
            .next()
            .unwrap_or(lang)
            .to_lowercase();
        if substring_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&base))
        {
            Self::Substring
        } else {
            Self::WholeWord
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub token: String,
    /// Source text as it appeared at the masked position
    pub original: String,
    pub replacement: String,
}

/// Placeholder tokens produced by one `protect_all` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtectionMap {
    placeholders: Vec<Placeholder>,
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"⟦\s*[Gg]\s*(\d+)\s*⟧").unwrap())
}

fn token(index: usize) -> String {
    format!("⟦G{}⟧", index)
}

impl ProtectionMap {
    pub fn len(&self) -> usize {
        self.placeholders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Tokens that do not occur in `text`, tolerating whitespace the backend put inside them.
    pub fn missing_in(&self, text: &str) -> Vec<&str> {
        let mut seen = vec![false; self.placeholders.len()];
        for caps in token_re().captures_iter(text) {
            if let Some(i) = caps[1].parse::<usize>().ok().filter(|i| *i < seen.len()) {
                seen[i] = true;
            }
        }
        self.placeholders
            .iter()
            .zip(seen)
            .filter(|(_, found)| !found)
            .map(|(p, _)| p.token.as_str())
            .collect()
    }

    pub fn restore(&self, text: &str) -> String {
        if self.placeholders.is_empty() {
            return text.to_string();
        }
        token_re()
            .replace_all(text, |caps: &regex::Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.placeholders.get(i))
                    .map(|p| p.replacement.clone())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: Vec<GlossaryEntry>,
    matchers: Vec<Regex>,
    exact: HashMap<String, usize>,
    case_insensitive: HashMap<String, usize>,
    policy: MatchPolicy,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn from_entries<I: IntoIterator<Item = GlossaryEntry>>(entries: I) -> Self {
        let mut glossary = Self::new();
        for entry in entries {
            glossary.add(entry);
        }
        glossary
    }

    /// Reads a plain-text glossary: `term` alone protects it, `term = translation` forces it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).context("Failed to read glossary file")?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut glossary = Self::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            match Self::parse_line(line) {
                Some(entry) => {
                    glossary.add(entry);
                }
                None => {
                    tracing::warn!("Invalid glossary entry at line {}: {}", line_num + 1, line);
                }
            }
        }
        glossary
    }

    fn parse_line(line: &str) -> Option<GlossaryEntry> {
        // Supports: "source = target", "source\ttarget" and a bare "source"
        for sep in ['=', '\t'] {
            if let Some((source, target)) = line.split_once(sep) {
                let source = source.trim();
                let target = target.trim();
                if source.is_empty() || target.is_empty() {
                    return None;
                }
                return Some(GlossaryEntry::forced(source, target));
            }
        }
        Some(GlossaryEntry::protected(line))
    }

    /// Adds or replaces an entry. Invalid entries are skipped and reported as `false`.
    pub fn add(&mut self, entry: GlossaryEntry) -> bool {
        if !entry.is_valid() {
            tracing::warn!("Skipping glossary entry without an action: {:?}", entry.term);
            return false;
        }
        let Ok(matcher) = RegexBuilder::new(&regex::escape(&entry.term))
            .case_insensitive(!entry.exact_case)
            .build()
        else {
            tracing::warn!("Skipping unmatchable glossary term: {:?}", entry.term);
            return false;
        };

        let key = entry.key();
        let index_map = if entry.exact_case {
            &mut self.exact
        } else {
            &mut self.case_insensitive
        };
        match index_map.get(&key) {
            Some(&i) => {
                self.entries[i] = entry;
                self.matchers[i] = matcher;
            }
            None => {
                index_map.insert(key, self.entries.len());
                self.entries.push(entry);
                self.matchers.push(matcher);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    pub fn lookup(&self, term: &str) -> Option<&GlossaryEntry> {
        self.exact
            .get(term)
            .or_else(|| self.case_insensitive.get(&term.to_lowercase()))
            .map(|&i| &self.entries[i])
    }

    /// Replaces every glossary term in `text` with an opaque placeholder.
    /// The longest term wins at a given position; otherwise matches are taken left to right.
    pub fn protect_all(&self, text: &str) -> (String, ProtectionMap) {
        let mut map = ProtectionMap::default();
        if self.entries.is_empty() || text.is_empty() {
            return (text.to_string(), map);
        }

        let mut candidates: Vec<(usize, usize, usize)> = Vec::new();
        for (idx, matcher) in self.matchers.iter().enumerate() {
            let mut from = 0;
            while let Some(m) = matcher.find_at(text, from) {
                if self.policy == MatchPolicy::WholeWord && !is_bounded(text, m.start(), m.end())
                {
                    // An unbounded match may overlap a bounded one starting inside it.
                    from = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
                    continue;
                }
                candidates.push((m.start(), m.end(), idx));
                from = m.end();
            }
        }
        if candidates.is_empty() {
            return (text.to_string(), map);
        }
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then((b.1 - b.0).cmp(&(a.1 - a.0))));

        let mut masked = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end, idx) in candidates {
            if start < cursor {
                continue;
            }
            let entry = &self.entries[idx];
            let original = &text[start..end];
            let replacement = match &entry.forced_translation {
                Some(forced) => forced.clone(),
                None => original.to_string(),
            };
            let tok = token(map.placeholders.len());

            masked.push_str(&text[cursor..start]);
            masked.push_str(&tok);
            map.placeholders.push(Placeholder {
                token: tok,
                original: original.to_string(),
                replacement,
            });
            cursor = end;
        }
        masked.push_str(&text[cursor..]);

        (masked, map)
    }

    pub fn restore_all(&self, text: &str, map: &ProtectionMap) -> String {
        map.restore(text)
    }
}

/// True when `text` has only placeholders and whitespace left after masking.
pub fn is_fully_masked(masked: &str) -> bool {
    token_re().replace_all(masked, "").trim().is_empty()
}

fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let glossary = Glossary::parse(
            "# comment\nAcme\nOrta = Medium\nKolay\tEasy\n = broken\n",
        );
        assert_eq!(glossary.len(), 3);
        assert!(glossary.lookup("acme").unwrap().protect);
        assert_eq!(
            glossary.lookup("orta").unwrap().forced_translation.as_deref(),
            Some("Medium")
        );
        assert_eq!(
            glossary.lookup("Kolay").unwrap().forced_translation.as_deref(),
            Some("Easy")
        );
    }

    #[test]
    fn test_whole_word_only() {
        let glossary = Glossary::from_entries([GlossaryEntry::protected("Acme")]);
        let (masked, map) = glossary.protect_all("Acme Corp uses AcmeX");
        assert_eq!(masked, "⟦G0⟧ Corp uses AcmeX");
        assert_eq!(map.len(), 1);
        assert_eq!(map.placeholders()[0].original, "Acme");
    }

    #[test]
    fn test_bounded_match_inside_unbounded_one() {
        let glossary = Glossary::from_entries([GlossaryEntry::protected("ha ha")]);
        let (masked, map) = glossary.protect_all("aha ha ha");
        assert_eq!(masked, "aha ⟦G0⟧");
        assert_eq!(map.restore(&masked), "aha ha ha");

        let glossary = Glossary::from_entries([GlossaryEntry::protected("Acme")]);
        let (masked, _) = glossary.protect_all("AcmeAcme Acme");
        assert_eq!(masked, "AcmeAcme ⟦G0⟧");
    }

    #[test]
    fn test_substring_policy() {
        let glossary = Glossary::from_entries([GlossaryEntry::forced("東京", "Tokyo")])
            .with_policy(MatchPolicy::Substring);
        let (masked, map) = glossary.protect_all("東京都に行く");
        assert_eq!(masked, "⟦G0⟧都に行く");
        assert_eq!(map.restore(&masked), "Tokyo都に行く");
    }

    #[test]
    fn test_longest_term_wins() {
        let glossary = Glossary::from_entries([
            GlossaryEntry::forced("Stok", "Stock"),
            GlossaryEntry::forced("Stok maliyetleri", "Stock costs"),
        ]);
        let (masked, map) = glossary.protect_all("Stok maliyetleri ve Stok");
        assert_eq!(masked, "⟦G0⟧ ve ⟦G1⟧");
        assert_eq!(map.restore(&masked), "Stock costs ve Stock");
    }

    #[test]
    fn test_protect_keeps_source_casing() {
        let glossary = Glossary::from_entries([GlossaryEntry::protected("linkedin")]);
        let (masked, map) = glossary.protect_all("Share on LinkedIn today");
        assert_eq!(map.restore(&masked), "Share on LinkedIn today");
    }

    #[test]
    fn test_exact_case() {
        let glossary = Glossary::from_entries([GlossaryEntry::protected("SAP").with_exact_case()]);
        let (masked, _) = glossary.protect_all("sap flows; SAP runs");
        assert_eq!(masked, "sap flows; ⟦G0⟧ runs");
        assert!(glossary.lookup("sap").is_none());
        assert!(glossary.lookup("SAP").is_some());
    }

    #[test]
    fn test_restore_tolerates_spacing() {
        let glossary = Glossary::from_entries([GlossaryEntry::forced("Evet", "Yes")]);
        let (_, map) = glossary.protect_all("Evet");
        assert_eq!(glossary.restore_all("Answer: ⟦ G 0 ⟧.", &map), "Answer: Yes.");
        assert_eq!(map.missing_in("Answer: ⟦ g0⟧"), Vec::<&str>::new());
        assert_eq!(map.missing_in("Answer"), vec!["⟦G0⟧"]);
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let mut glossary = Glossary::new();
        let empty_forced = GlossaryEntry {
            term: "x".into(),
            forced_translation: Some(" ".into()),
            protect: false,
            exact_case: false,
        };
        assert!(!glossary.add(empty_forced));
        assert!(!glossary.add(GlossaryEntry::protected("  ")));
        assert!(glossary.is_empty());
    }

    #[test]
    fn test_add_replaces_same_key() {
        let mut glossary = Glossary::new();
        glossary.add(GlossaryEntry::forced("Orta", "Middle"));
        glossary.add(GlossaryEntry::forced("orta", "Medium"));
        assert_eq!(glossary.len(), 1);
        let (masked, map) = glossary.protect_all("Orta");
        assert_eq!(map.restore(&masked), "Medium");
    }

    #[test]
    fn test_fully_masked() {
        assert!(is_fully_masked("⟦G0⟧ ⟦G1⟧"));
        assert!(!is_fully_masked("⟦G0⟧ team"));
    }

    #[test]
    fn test_language_policy() {
        let langs = vec!["zh".to_string(), "ja".to_string()];
        assert_eq!(MatchPolicy::for_language("zh-CN", &langs), MatchPolicy::Substring);
        assert_eq!(MatchPolicy::for_language("tr", &langs), MatchPolicy::WholeWord);
    }
}
