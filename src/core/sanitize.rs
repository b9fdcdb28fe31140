//! Normalizes code arguments that arrive double-encoded from an oracle.
//!
//! Code is round-tripped through structured text generated by an external
//! oracle, and occasionally lands wrapped as a one-element literal collection
//! (`["df.head()"]`, or the set repr `{'df.head()'}`) instead of raw text.
//! Unwrapping is purely structural — the candidate text is parsed as a
//! literal, never evaluated.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Matches the brace-wrapped, quote-delimited literals a double-encoded
/// one-element set produces, one pattern per quoting style.
static SET_SINGLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\{\s*'(.*)'\s*\}$").expect("set literal pattern is valid")
});
static SET_DOUBLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\{\s*"(.*)"\s*\}$"#).expect("set literal pattern is valid")
});

/// Unwrap a double-encoded code argument; return anything else unchanged.
///
/// Unwrapping repeats until nothing changes, so nested wrappings collapse in
/// one call. Idempotent: sanitizing already-sanitized text is a no-op.
pub fn sanitize(raw: &str) -> Cow<'_, str> {
    let Some(mut code) = unwrap_once(raw) else {
        return Cow::Borrowed(raw);
    };
    // Each pass removes a wrapper and strictly shrinks the text, so the
    // fixpoint is reached in finitely many steps.
    while let Some(next) = unwrap_once(&code) {
        code = next;
    }
    Cow::Owned(code)
}

/// One unwrapping pass; `None` when the text is not a wrapped literal.
fn unwrap_once(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    // A JSON array holding exactly one string is the array-shaped wrapping.
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed)
        && let [Value::String(code)] = items.as_slice()
    {
        return Some(code.clone());
    }

    // `{'...'}` / `{"..."}` is the set-shaped wrapping. Reject inner text that
    // closes the quote early: that is not a single literal element.
    for (pattern, quote) in [(&SET_SINGLE_QUOTED, '\''), (&SET_DOUBLE_QUOTED, '"')] {
        if let Some(captures) = pattern.captures(trimmed) {
            let inner = &captures[1];
            if !inner.contains(quote) {
                return Some(inner.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_one_element_json_array() {
        assert_eq!(sanitize(r#"["df = df.head(2)"]"#), "df = df.head(2)");
    }

    #[test]
    fn unwraps_single_quoted_set_literal() {
        assert_eq!(sanitize("{'df = df.dropna()'}"), "df = df.dropna()");
    }

    #[test]
    fn unwraps_double_quoted_set_literal() {
        assert_eq!(sanitize(r#"{"print(df.shape)"}"#), "print(df.shape)");
    }

    #[test]
    fn leaves_plain_code_unchanged() {
        let code = "raw code with no literal structure";
        assert_eq!(sanitize(code), code);
    }

    #[test]
    fn leaves_multi_element_arrays_unchanged() {
        let code = r#"["a", "b"]"#;
        assert_eq!(sanitize(code), code);
    }

    #[test]
    fn leaves_dict_shaped_code_unchanged() {
        // Braces with a key separator are a dict literal, not a wrapped set.
        let code = "{'key': 'value'}";
        assert_eq!(sanitize(code), code);
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            r#"["df = df.head(2)"]"#,
            "{'df = df.dropna()'}",
            r#"["[\"df = df.head(2)\"]"]"#,
            "raw code with no literal structure",
            "df['col'] = df['col'].str.strip()",
        ];
        for input in inputs {
            let once = sanitize(input).into_owned();
            let twice = sanitize(&once).into_owned();
            assert_eq!(once, twice, "sanitize must be idempotent for {input:?}");
        }
    }

    #[test]
    fn nested_wrappers_collapse_in_one_call() {
        // Array wrapped in an array, and an array inside a set repr.
        assert_eq!(sanitize(r#"["[\"df.head()\"]"]"#), "df.head()");
        assert_eq!(sanitize(r#"{'["df.head()"]'}"#), "df.head()");
    }

    #[test]
    fn multiline_code_inside_wrapper_is_unwrapped() {
        let wrapped = "{'df = df.copy()\ndf = df.head()'}";
        assert_eq!(sanitize(wrapped), "df = df.copy()\ndf = df.head()");
    }
}
