//! Locating a JSON array inside free-form text.

use serde_json::Value;

use pagecase_protocols::error::ParseError;

/// Find the JSON array embedded in `raw`.
///
/// Every `[` is tried as a start position and matched against its closing
/// `]` by depth, skipping brackets inside JSON strings. The first balanced
/// span that parses as an array containing an object wins; failing that, the
/// first span that parses as any array.
pub fn find_json_array(raw: &str) -> Option<&str> {
    locate_array(raw).ok().map(|(span, _)| span)
}

/// Like [`find_json_array`], but also returns the parsed items and explains
/// why nothing was found.
pub(crate) fn locate_array(raw: &str) -> Result<(&str, Vec<Value>), ParseError> {
    let mut fallback: Option<(&str, Vec<Value>)> = None;
    let mut first_error: Option<String> = None;
    let mut saw_open = false;

    for (start, _) in raw.match_indices('[') {
        saw_open = true;
        let Some(end) = matching_bracket(raw, start) else {
            continue;
        };
        let span = &raw[start..=end];
        match serde_json::from_str::<Vec<Value>>(span) {
            Ok(items) if items.iter().any(Value::is_object) => return Ok((span, items)),
            Ok(items) => {
                if fallback.is_none() {
                    fallback = Some((span, items));
                }
            }
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e.to_string());
                }
            }
        }
    }

    if let Some(found) = fallback {
        return Ok(found);
    }
    if !saw_open {
        return Err(ParseError::NoArray);
    }
    Err(ParseError::Malformed(
        first_error.unwrap_or_else(|| "unbalanced brackets".to_string()),
    ))
}

/// Byte index of the `]` closing the `[` at `start`.
fn matching_bracket(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
