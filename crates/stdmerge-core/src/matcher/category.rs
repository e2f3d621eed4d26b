//! Keyword-based category tags for patterns.

use crate::naming::words;

/// Checked in order; the first category with a matching keyword wins.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "string",
        &[
            "split", "join", "trim", "strip", "upper", "lower", "concat", "replace", "substr",
            "substring", "pad", "format", "char", "chars", "string", "str", "capitalize",
            "starts", "ends", "prefix", "suffix",
        ],
    ),
    (
        "collection",
        &[
            "map", "filter", "fold", "reduce", "sort", "sorted", "zip", "flatten", "append",
            "push", "pop", "contains", "find", "reverse", "slice", "unique", "group", "partition",
            "take", "drop", "any", "all", "each", "range", "list", "keys", "values",
        ],
    ),
    (
        "file-io",
        &[
            "read", "write", "open", "close", "file", "path", "dir", "mkdir", "flush", "seek",
            "exists", "remove", "rename", "copy",
        ],
    ),
    (
        "time",
        &["time", "date", "now", "sleep", "duration", "clock", "timestamp", "timeout"],
    ),
    (
        "result",
        &["result", "option", "maybe", "either", "unwrap", "ok", "err", "some", "none"],
    ),
    (
        "stream",
        &["stream", "iter", "iterator", "lazy", "next", "generator", "chunk", "chunks"],
    ),
    (
        "math",
        &[
            "add", "sub", "subtract", "multiply", "mul", "divide", "div", "mod", "abs", "sqrt",
            "pow", "round", "floor", "ceil", "min", "max", "sum", "avg", "mean",
        ],
    ),
];

pub const OTHER_CATEGORY: &str = "other";

/// Category for a function or pattern name.
///
/// Whole words are matched first (`read_file` → file-io). Names that are a
/// single run of lower-case letters (`readline`) fall back to a prefix match
/// on keywords of four or more characters.
pub fn categorize(name: &str) -> &'static str {
    let tokens = words(name);
    for (category, keywords) in CATEGORY_KEYWORDS {
        if tokens.iter().any(|t| keywords.contains(&t.as_str())) {
            return category;
        }
    }
    if let [single] = tokens.as_slice() {
        for (category, keywords) in CATEGORY_KEYWORDS {
            if keywords
                .iter()
                .any(|k| k.len() >= 4 && single.starts_with(k))
            {
                return category;
            }
        }
    }
    OTHER_CATEGORY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_categories() {
        assert_eq!(categorize("split"), "string");
        assert_eq!(categorize("toUpperCase"), "string");
        assert_eq!(categorize("filter_map"), "collection");
        assert_eq!(categorize("readFile"), "file-io");
        assert_eq!(categorize("now"), "time");
        assert_eq!(categorize("unwrap_or"), "result");
        assert_eq!(categorize("lazy_seq"), "stream");
        assert_eq!(categorize("divide"), "math");
    }

    #[test]
    fn test_no_substring_false_positives() {
        // "stream" contains "str", "address" contains "add"
        assert_eq!(categorize("stream"), "stream");
        assert_eq!(categorize("address"), "other");
    }

    #[test]
    fn test_prefix_fallback_for_run_together_names() {
        assert_eq!(categorize("readline"), "file-io");
        assert_eq!(categorize("splitlines"), "string");
        assert_eq!(categorize("frobnicate"), "other");
    }
}
