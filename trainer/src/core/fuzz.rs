//! A deliberately dumb mutation: flip `false` to `true` and `0` to `1`.
//!
//! The goal is a perturbed workspace state, not a meaningful edit, so the
//! rules are purely textual and match whole words only.

use std::sync::LazyLock;

use regex::bytes::Regex;

static MATCH_FALSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)false(?-u:\b)").expect("valid false regex"));
static MATCH_ZERO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)0(?-u:\b)").expect("valid zero regex"));

const MARKER_TEXT: &str = "Modified by trainer fuzzer";

/// Line-comment prefixes for suffixes whose comment syntax we know.
const LINE_COMMENTS: &[(&str, &str)] = &[
    (".go", "//"),
    (".js", "//"),
    (".jsx", "//"),
    (".ts", "//"),
    (".tsx", "//"),
    (".rs", "//"),
    (".c", "//"),
    (".h", "//"),
    (".cpp", "//"),
    (".java", "//"),
    (".kt", "//"),
    (".swift", "//"),
    (".scala", "//"),
    (".py", "#"),
    (".rb", "#"),
    (".sh", "#"),
    (".pl", "#"),
    (".yaml", "#"),
    (".yml", "#"),
    (".toml", "#"),
];

/// Replace whole-word `false` with `true`, then whole-word `0` with `1`.
pub fn fuzz(contents: &[u8]) -> Vec<u8> {
    let flipped = MATCH_FALSE.replace_all(contents, &b"true"[..]);
    MATCH_ZERO.replace_all(&flipped, &b"1"[..]).into_owned()
}

/// Whether `name` ends with one of the fuzzable suffixes.
pub fn should_fuzz(name: &str, suffixes: &[String]) -> bool {
    suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
}

/// Line-comment prefix for `name`, if its suffix has a known comment syntax.
pub fn comment_prefix(name: &str) -> Option<&'static str> {
    LINE_COMMENTS
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix))
        .map(|(_, prefix)| *prefix)
}

/// Produce the mutated contents for `name`, or `None` when the file should be
/// left alone (unfuzzable suffix, or nothing to flip).
pub fn fuzz_file(name: &str, contents: &[u8], suffixes: &[String]) -> Option<Vec<u8>> {
    if !should_fuzz(name, suffixes) {
        return None;
    }
    let mut fuzzed = fuzz(contents);
    if fuzzed == contents {
        return None;
    }
    if let Some(prefix) = comment_prefix(name) {
        fuzzed.extend_from_slice(format!("\n{prefix} {MARKER_TEXT}").as_bytes());
    }
    Some(fuzzed)
}
