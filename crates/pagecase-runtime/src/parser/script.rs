//! Script reply extraction.

use std::sync::LazyLock;

use regex::Regex;

use pagecase_protocols::error::ParseError;

const SOURCE_KEYWORDS: &[&str] = &[
    "import", "from", "def", "class", "async", "await", "return", "if", "elif", "else", "for",
    "while", "with", "try", "except", "finally", "raise", "assert", "pass", "print", "const",
    "let", "var", "function", "export", "package", "public", "private", "static", "using",
];

const SOURCE_PREFIXES: &[&str] = &[
    "#", "//", "/*", "*/", "@", "\"", "'", ")", "]", "}",
];

/// Characters that never appear in a prose line.
const CODE_CHARS: &[char] = &['=', ';', '{', '}', '<', '>', '[', ']', '"', '`'];

static STATEMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$]*(?:\.|\(|\[|\s*=)").expect("statement pattern is valid")
});

/// Extract source code from a script reply.
///
/// A fenced block wins when present; otherwise leading and trailing lines
/// recognized as prose are dropped. Lines that are neither recognizable
/// source nor recognizable prose are kept. Source with nothing to drop comes
/// back unchanged, so parsing is idempotent.
pub fn parse_script(raw: &str) -> Result<String, ParseError> {
    if let Some(block) = extract_fenced_block(raw) {
        let lines: Vec<&str> = block.lines().collect();
        let (first, last) = source_range(&lines).ok_or(ParseError::NoSource)?;
        return Ok(lines[first..=last].join("\n"));
    }

    let lines: Vec<&str> = raw.lines().collect();
    let (first, last) = source_range(&lines).ok_or(ParseError::NoSource)?;

    let has_prose = lines[..first]
        .iter()
        .chain(&lines[last + 1..])
        .any(|line| !line.trim().is_empty());
    if has_prose {
        Ok(lines[first..=last].join("\n"))
    } else {
        Ok(raw.to_string())
    }
}

/// Contents of the first fenced code block, without the fence lines.
///
/// The language tag on the opening fence is ignored. An unclosed fence runs
/// to the end of the text.
pub fn extract_fenced_block(raw: &str) -> Option<&str> {
    let mut offset = 0;
    let mut start: Option<usize> = None;

    for line in raw.split_inclusive('\n') {
        let is_fence = line.trim_start().starts_with("```");
        match start {
            None if is_fence => start = Some(offset + line.len()),
            Some(begin) if is_fence => return Some(&raw[begin..offset]),
            _ => {}
        }
        offset += line.len();
    }

    start.map(|begin| &raw[begin..])
}

/// Whether a line looks like source code rather than prose.
pub fn is_plausible_source_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    if SOURCE_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
        return true;
    }

    let starts_with_keyword = SOURCE_KEYWORDS.iter().any(|keyword| {
        line.strip_prefix(keyword).is_some_and(|rest| {
            rest.chars()
                .next()
                .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
        })
    });

    starts_with_keyword || STATEMENT_LINE.is_match(line)
}

/// Whether a line reads as natural-language prose: mostly bare words, none
/// of the punctuation source code is built from, and either several words or
/// a sentence-ending mark.
fn is_prose_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || is_plausible_source_line(line) || line.contains(CODE_CHARS) {
        return false;
    }
    if !line.chars().next().is_some_and(char::is_alphabetic) {
        return false;
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    let bare = words.iter().filter(|w| is_bare_word(w)).count();
    if bare * 3 < words.len() * 2 {
        return false;
    }

    words.len() >= 3 || line.ends_with([':', '.', '!', '?'])
}

fn is_bare_word(word: &str) -> bool {
    let word = word
        .trim_start_matches('(')
        .trim_end_matches(['.', ',', ':', ';', '!', '?', ')']);
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphabetic() || c == '\'' || c == '-')
}

/// A line that belongs to the script: non-blank and not prose.
fn is_source_line(line: &str) -> bool {
    !line.trim().is_empty() && !is_prose_line(line)
}

fn source_range(lines: &[&str]) -> Option<(usize, usize)> {
    let first = lines.iter().position(|l| is_source_line(l))?;
    let last = lines.iter().rposition(|l| is_source_line(l))?;
    Some((first, last))
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
