//! Identifier case conversions shared by the matcher and the emitters.

/// Split an identifier into lower-case words at case changes, digits
/// boundaries and `_ - . space` separators. `parseJSONValue` gives
/// `parse`, `json`, `value`.
pub fn words(ident: &str) -> Vec<String> {
    let chars: Vec<char> = ident.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &ch) in chars.iter().enumerate() {
        if matches!(ch, '_' | '-' | '.' | ' ' | '$') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

pub fn snake_case(ident: &str) -> String {
    words(ident).join("_")
}

pub fn camel_case(ident: &str) -> String {
    let mut out = String::new();
    for (i, word) in words(ident).iter().enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

pub fn pascal_case(ident: &str) -> String {
    words(ident).iter().map(|w| capitalize(w)).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_handles_acronyms_and_separators() {
        assert_eq!(words("parseJSONValue"), vec!["parse", "json", "value"]);
        assert_eq!(words("to_upper-case"), vec!["to", "upper", "case"]);
        assert_eq!(words("ReadAll"), vec!["read", "all"]);
        assert_eq!(words("utf8Len"), vec!["utf8", "len"]);
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(snake_case("toUpperCase"), "to_upper_case");
        assert_eq!(camel_case("to_upper_case"), "toUpperCase");
        assert_eq!(pascal_case("split_lines"), "SplitLines");
        assert_eq!(snake_case("Divide"), "divide");
    }
}
