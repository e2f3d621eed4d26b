//! Default scoring heuristics and ecosystem priors.
//!
//! Performance, safety and text support have no signal in a signature, so
//! they come from coarse per-ecosystem tables. Tests inject `TablePriors`
//! instead of relying on the built-in numbers.

use std::collections::HashMap;

use crate::models::{FunctionSignature, TypeRef};

/// Prior used for any ecosystem missing from a table.
pub const NEUTRAL_PRIOR: f64 = 0.5;

pub trait EcosystemPriors: Send + Sync {
    fn performance(&self, ecosystem: &str) -> f64;
    fn safety(&self, ecosystem: &str) -> f64;
    fn text_support(&self, ecosystem: &str) -> f64;
    /// How much the ecosystem's idioms favor point-free composition.
    fn composition(&self, ecosystem: &str) -> f64;
}

/// (ecosystem, performance, safety, text support, composition)
const BUILTIN_TABLE: &[(&str, f64, f64, f64, f64)] = &[
    ("elixir", 0.6, 0.8, 0.9, 0.9),
    ("go", 0.85, 0.75, 0.8, 0.5),
    ("haskell", 0.7, 0.95, 0.6, 1.0),
    ("java", 0.75, 0.75, 0.7, 0.5),
    ("python", 0.4, 0.6, 0.9, 0.6),
    ("rust", 0.95, 0.95, 0.9, 0.8),
    ("typescript", 0.6, 0.7, 0.8, 0.7),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPriors;

impl BuiltinPriors {
    fn row(ecosystem: &str) -> Option<&'static (&'static str, f64, f64, f64, f64)> {
        BUILTIN_TABLE.iter().find(|row| row.0 == ecosystem)
    }
}

impl EcosystemPriors for BuiltinPriors {
    fn performance(&self, ecosystem: &str) -> f64 {
        Self::row(ecosystem).map(|r| r.1).unwrap_or(NEUTRAL_PRIOR)
    }

    fn safety(&self, ecosystem: &str) -> f64 {
        Self::row(ecosystem).map(|r| r.2).unwrap_or(NEUTRAL_PRIOR)
    }

    fn text_support(&self, ecosystem: &str) -> f64 {
        Self::row(ecosystem).map(|r| r.3).unwrap_or(NEUTRAL_PRIOR)
    }

    fn composition(&self, ecosystem: &str) -> f64 {
        Self::row(ecosystem).map(|r| r.4).unwrap_or(NEUTRAL_PRIOR)
    }
}

/// Explicit per-ecosystem values, e.g. deterministic fixtures in tests.
#[derive(Debug, Default, Clone)]
pub struct TablePriors {
    rows: HashMap<String, [f64; 4]>,
    fallback: f64,
}

impl TablePriors {
    /// Every ecosystem gets `value` for every prior.
    pub fn uniform(value: f64) -> Self {
        Self {
            rows: HashMap::new(),
            fallback: value,
        }
    }

    /// Set `[performance, safety, text_support, composition]` for one ecosystem.
    pub fn with(mut self, ecosystem: &str, values: [f64; 4]) -> Self {
        self.rows.insert(ecosystem.to_string(), values);
        self
    }

    fn get(&self, ecosystem: &str, idx: usize) -> f64 {
        self.rows
            .get(ecosystem)
            .map(|r| r[idx])
            .unwrap_or(self.fallback)
    }
}

impl EcosystemPriors for TablePriors {
    fn performance(&self, ecosystem: &str) -> f64 {
        self.get(ecosystem, 0)
    }

    fn safety(&self, ecosystem: &str) -> f64 {
        self.get(ecosystem, 1)
    }

    fn text_support(&self, ecosystem: &str) -> f64 {
        self.get(ecosystem, 2)
    }

    fn composition(&self, ecosystem: &str) -> f64 {
        self.get(ecosystem, 3)
    }
}

// ---------------------------------------------------------------------------
// Signature heuristics
// ---------------------------------------------------------------------------

const RESULT_TYPES: &[&str] = &["result", "either", "expected", "try", "outcome", "validation"];
const OPTION_TYPES: &[&str] = &["option", "optional", "maybe", "nullable"];
const NULLISH: &[&str] = &["null", "undefined", "none", "nil"];

pub fn is_result_shaped(ty: &TypeRef) -> bool {
    let name = ty.name.to_ascii_lowercase();
    if RESULT_TYPES.contains(&name.as_str()) {
        return true;
    }
    // Go style `(T, error)`
    name == "tuple"
        && ty
            .params
            .last()
            .is_some_and(|last| last.name.eq_ignore_ascii_case("error"))
}

pub fn is_option_shaped(ty: &TypeRef) -> bool {
    let name = ty.name.to_ascii_lowercase();
    if OPTION_TYPES.contains(&name.as_str()) {
        return true;
    }
    name == "union"
        && ty
            .params
            .iter()
            .any(|p| NULLISH.contains(&p.name.to_ascii_lowercase().as_str()))
}

fn documents_throwing(sig: &FunctionSignature) -> bool {
    if sig.metadata.contains_key("throws") {
        return true;
    }
    let doc = sig.documentation.to_ascii_lowercase();
    ["throw", "raise", "panic"].iter().any(|w| doc.contains(w))
}

/// 1.0 result/either return, 0.7 optional return, 0.3 documented throwing,
/// 0.5 otherwise.
pub fn error_handling_score(sig: &FunctionSignature) -> f64 {
    if is_result_shaped(&sig.return_type) {
        1.0
    } else if is_option_shaped(&sig.return_type) {
        0.7
    } else if documents_throwing(sig) {
        0.3
    } else {
        0.5
    }
}

/// Short name, named parameters, substantial docs, examples.
pub fn clarity_score(sig: &FunctionSignature) -> f64 {
    let name_len = sig.name.chars().count();
    let name = if name_len <= 12 {
        1.0
    } else {
        (1.0 - (name_len - 12) as f64 / 20.0).max(0.0)
    };

    let params = if sig.parameters.is_empty() {
        1.0
    } else {
        let named = sig
            .parameters
            .iter()
            .filter(|p| !p.name.is_empty() && !p.name.starts_with('_') && !is_synthesized_name(&p.name))
            .count();
        named as f64 / sig.parameters.len() as f64
    };

    let docs = (sig.documentation.trim().chars().count() as f64 / 80.0).min(1.0);
    let examples = if sig.examples.is_empty() { 0.0 } else { 1.0 };

    0.3 * name + 0.2 * params + 0.3 * docs + 0.2 * examples
}

/// `arg<N>`: the placeholder name adapters give unnamed parameters.
fn is_synthesized_name(name: &str) -> bool {
    name.strip_prefix("arg")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Non-void return, few parameters, plus the ecosystem's composition prior.
pub fn composability_score(sig: &FunctionSignature, composition_prior: f64) -> f64 {
    let returns = if sig.return_type.is_void() {
        0.0
    } else if sig.return_type.is_unknown() {
        0.5
    } else {
        1.0
    };
    let arity = match sig.parameters.len() {
        0..=2 => 1.0,
        3 => 0.5,
        _ => 0.0,
    };
    0.4 * returns + 0.3 * arity + 0.3 * composition_prior
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Parameter, SourceLocation};

    fn sig(name: &str, ret: &str) -> FunctionSignature {
        let mut f = FunctionSignature::new(name, "m", SourceLocation::new("m", 1, 1));
        f.return_type = TypeRef::parse(ret);
        f
    }

    #[test]
    fn test_error_handling_levels() {
        assert_eq!(error_handling_score(&sig("d", "Result<i32, String>")), 1.0);
        assert_eq!(error_handling_score(&sig("d", "(int, error)")), 1.0);
        assert_eq!(error_handling_score(&sig("d", "Optional[int]")), 0.7);
        assert_eq!(error_handling_score(&sig("d", "number | undefined")), 0.7);

        let mut throws = sig("d", "int");
        throws.documentation = "Throws DivideByZero when b is 0".into();
        assert_eq!(error_handling_score(&throws), 0.3);

        let mut java = sig("d", "int");
        java.metadata.insert("throws".into(), "ArithmeticException".into());
        assert_eq!(error_handling_score(&java), 0.3);

        assert_eq!(error_handling_score(&sig("d", "int")), 0.5);
    }

    #[test]
    fn test_clarity_rewards_docs_and_examples() {
        let bare = sig("x", "int");
        let mut documented = sig("x", "int");
        documented.documentation = "a".repeat(100);
        documented.examples.push("x()".into());
        assert!(clarity_score(&documented) > clarity_score(&bare));
        assert!((clarity_score(&documented) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clarity_penalizes_long_names_and_anonymous_params() {
        let mut f = sig("a_very_long_function_name_here", "int");
        f.parameters.push(Parameter::new("_x", TypeRef::unknown()));
        let score = clarity_score(&f);
        assert!(score < 0.3);
    }

    #[test]
    fn test_only_synthesized_arg_names_are_anonymous() {
        let mut real = sig("f", "int");
        real.parameters = vec![
            Parameter::new("argument", TypeRef::unknown()),
            Parameter::new("argv_index", TypeRef::unknown()),
        ];
        let mut synthesized = sig("f", "int");
        synthesized.parameters = vec![
            Parameter::new("arg0", TypeRef::unknown()),
            Parameter::new("arg1", TypeRef::unknown()),
        ];
        assert!((clarity_score(&real) - clarity_score(&sig("f", "int"))).abs() < 1e-9);
        assert!((clarity_score(&real) - clarity_score(&synthesized) - 0.2).abs() < 1e-9);
        assert!(is_synthesized_name("arg12"));
        assert!(!is_synthesized_name("arg"));
    }

    #[test]
    fn test_composability() {
        let mut f = sig("f", "void");
        assert!((composability_score(&f, 0.0) - 0.3).abs() < 1e-9);
        f.return_type = TypeRef::named("int");
        assert!((composability_score(&f, 1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_priors_fallback() {
        let builtin = BuiltinPriors;
        assert_eq!(builtin.performance("cobol"), NEUTRAL_PRIOR);
        assert!(builtin.performance("go") > builtin.performance("python"));

        let table = TablePriors::uniform(0.5).with("go", [1.0, 0.0, 0.2, 0.3]);
        assert_eq!(table.performance("go"), 1.0);
        assert_eq!(table.safety("python"), 0.5);
    }
}
