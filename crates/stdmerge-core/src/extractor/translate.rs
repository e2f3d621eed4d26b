//! Translation capability keyed by (source ecosystem, target ecosystem).

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::TranslationError;
use crate::extractor::emit::{self, FunctionSpec, SUPPORTED_TARGETS};
use crate::models::{FunctionSignature, Translation, TypeRef};

pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    /// Translate one function. `target_code` of the result is function
    /// level; the extractor wraps it into a module.
    fn translate(
        &self,
        sig: &FunctionSignature,
        from: &str,
        to: &str,
    ) -> Result<Translation, TranslationError>;
}

#[derive(Clone, Default)]
pub struct TranslatorRegistry {
    translators: HashMap<(String, String), Arc<dyn Translator>>,
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `SignatureTranslator` for every ordered pair of
    /// distinct supported ecosystems.
    pub fn with_signature_translation() -> Self {
        let mut registry = Self::new();
        let translator: Arc<dyn Translator> = Arc::new(SignatureTranslator);
        for from in SUPPORTED_TARGETS {
            for to in SUPPORTED_TARGETS {
                if from != to {
                    registry.register(from, to, Arc::clone(&translator));
                }
            }
        }
        registry
    }

    pub fn register(&mut self, from: &str, to: &str, translator: Arc<dyn Translator>) {
        self.translators
            .insert((from.to_string(), to.to_string()), translator);
    }

    pub fn get(&self, from: &str, to: &str) -> Option<&Arc<dyn Translator>> {
        self.translators.get(&(from.to_string(), to.to_string()))
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    pub fn translate(
        &self,
        sig: &FunctionSignature,
        from: &str,
        to: &str,
    ) -> Result<Translation, TranslationError> {
        let translator = self.get(from, to).ok_or_else(|| TranslationError::Unavailable {
            from: from.to_string(),
            to: to.to_string(),
        })?;
        let mut translation = translator.translate(sig, from, to)?;
        translation.confidence = translation.confidence.clamp(0.0, 1.0);
        Ok(translation)
    }
}

/// Ports the signature through the type-mapping table and leaves the body
/// as a "not implemented" stub for a manual port.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureTranslator;

pub const SIGNATURE_CONFIDENCE: f64 = 0.5;

impl Translator for SignatureTranslator {
    fn name(&self) -> &str {
        "signature"
    }

    fn translate(
        &self,
        sig: &FunctionSignature,
        from: &str,
        to: &str,
    ) -> Result<Translation, TranslationError> {
        if !emit::is_supported(to) {
            return Err(TranslationError::Failed(format!(
                "no emitter for target '{to}'"
            )));
        }
        let name = emit::conventional_name(&sig.name, to);
        let spec = FunctionSpec {
            name: name.clone(),
            params: sig
                .parameters
                .iter()
                .map(|p| (emit::sanitize_ident(&p.name, to), map_type(&p.type_ref, to)))
                .collect(),
            return_type: map_return(&sig.return_type, to),
            doc: (!sig.documentation.trim().is_empty()).then(|| sig.documentation.clone()),
            message: format!(
                "{name}: signature ported from {from} {}, body requires a manual port",
                sig.qualified_name()
            ),
        };

        let mut warnings = vec![format!(
            "body of {} not translated from {from} to {to}; signature only",
            sig.qualified_name()
        )];
        let unmapped: Vec<String> = sig
            .parameters
            .iter()
            .map(|p| &p.type_ref)
            .chain(std::iter::once(&sig.return_type))
            .filter(|t| !t.is_unknown() && !t.is_void() && canonical(t) == Canonical::Opaque)
            .map(|t| t.to_string())
            .collect();
        if !unmapped.is_empty() {
            warnings.push(format!(
                "types kept verbatim without a mapping: {}",
                unmapped.join(", ")
            ));
        }

        Ok(Translation {
            source_ecosystem: from.to_string(),
            target_ecosystem: to.to_string(),
            source_code: sig.source_text.clone().unwrap_or_else(|| sig.render()),
            target_code: emit::render_stub(to, &spec),
            confidence: SIGNATURE_CONFIDENCE,
            warnings,
        })
    }
}

// ---------------------------------------------------------------------------
// Type mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Canonical {
    Int,
    Float,
    Str,
    Bool,
    Any,
    List(TypeRef),
    Map(TypeRef, TypeRef),
    Optional(TypeRef),
    /// `Result<T, E>`, `Either<E, T>` or Go `(T, error)`: the success type.
    Fallible(TypeRef),
    Tuple(Vec<TypeRef>),
    Opaque,
}

fn canonical(ty: &TypeRef) -> Canonical {
    let lower = ty.name.to_ascii_lowercase();
    let param = |i: usize| ty.params.get(i).cloned().unwrap_or_else(TypeRef::unknown);
    match lower.as_str() {
        "int" | "integer" | "long" | "short" | "i32" | "i64" | "int32" | "int64" | "uint" => {
            Canonical::Int
        }
        "float" | "double" | "float32" | "float64" | "number" | "f64" | "f32" => Canonical::Float,
        "str" | "string" | "char" | "rune" => Canonical::Str,
        "bool" | "boolean" => Canonical::Bool,
        "any" | "object" | "interface{}" | "unknown" => Canonical::Any,
        "list" | "array" | "arraylist" | "sequence" | "iterable" | "slice" | "vec" | "set" => {
            Canonical::List(param(0))
        }
        "dict" | "map" | "hashmap" | "record" | "mapping" => Canonical::Map(param(0), param(1)),
        "optional" | "option" | "maybe" | "nullable" => Canonical::Optional(param(0)),
        "result" | "expected" => Canonical::Fallible(param(0)),
        "either" => Canonical::Fallible(param(1)),
        "pointer" => canonical(&param(0)),
        "tuple" => {
            let is_go_error = ty
                .params
                .last()
                .is_some_and(|t| t.name.eq_ignore_ascii_case("error"));
            if is_go_error && ty.params.len() == 2 {
                Canonical::Fallible(param(0))
            } else {
                Canonical::Tuple(ty.params.clone())
            }
        }
        "union" => {
            let nullish = ["null", "undefined", "none", "nil"];
            let rest: Vec<&TypeRef> = ty
                .params
                .iter()
                .filter(|p| !nullish.contains(&p.name.to_ascii_lowercase().as_str()))
                .collect();
            if rest.len() == 1 && rest.len() < ty.params.len() {
                Canonical::Optional(rest[0].clone())
            } else {
                Canonical::Any
            }
        }
        _ => Canonical::Opaque,
    }
}

/// `ty` in `target` syntax, or `None` when the target gets no annotation.
pub fn map_type(ty: &TypeRef, target: &str) -> Option<String> {
    if ty.is_unknown() {
        return match target {
            "python" => None,
            other => any_type(other),
        };
    }
    Some(render(ty, target, false))
}

/// Like `map_type` but void returns become `None`.
pub fn map_return(ty: &TypeRef, target: &str) -> Option<String> {
    if ty.is_void() {
        return match target {
            "python" => Some("None".to_string()),
            "typescript" => Some("void".to_string()),
            _ => None,
        };
    }
    if ty.is_unknown() && target == "go" {
        return None;
    }
    map_type(ty, target)
}

fn any_type(target: &str) -> Option<String> {
    match target {
        "python" => Some("Any".to_string()),
        "typescript" => Some("any".to_string()),
        "go" => Some("interface{}".to_string()),
        "java" => Some("Object".to_string()),
        _ => None,
    }
}

/// `boxed` selects Java reference types inside generics.
fn render(ty: &TypeRef, target: &str, boxed: bool) -> String {
    let inner = |t: &TypeRef| {
        if t.is_unknown() {
            any_type(target).unwrap_or_else(|| "Any".to_string())
        } else {
            render(t, target, true)
        }
    };
    if ty.name == "Pointer" {
        if let Some(pointee) = ty.params.first() {
            return match target {
                "go" => format!("*{}", render(pointee, target, boxed)),
                _ => render(pointee, target, boxed),
            };
        }
    }
    match (canonical(ty), target) {
        (Canonical::Int, "python") => "int".into(),
        (Canonical::Int, "typescript") => "number".into(),
        (Canonical::Int, "go") => "int".into(),
        (Canonical::Int, _) => (if boxed { "Integer" } else { "int" }).into(),

        (Canonical::Float, "python") => "float".into(),
        (Canonical::Float, "typescript") => "number".into(),
        (Canonical::Float, "go") => "float64".into(),
        (Canonical::Float, _) => (if boxed { "Double" } else { "double" }).into(),

        (Canonical::Str, "python") => "str".into(),
        (Canonical::Str, "java") => "String".into(),
        (Canonical::Str, _) => "string".into(),

        (Canonical::Bool, "python" | "go") => "bool".into(),
        (Canonical::Bool, "typescript") => "boolean".into(),
        (Canonical::Bool, _) => (if boxed { "Boolean" } else { "boolean" }).into(),

        (Canonical::Any, t) => any_type(t).unwrap_or_else(|| ty.name.clone()),

        (Canonical::List(el), "python") => format!("list[{}]", inner(&el)),
        (Canonical::List(el), "typescript") => format!("{}[]", inner(&el)),
        (Canonical::List(el), "go") => format!("[]{}", inner(&el)),
        (Canonical::List(el), _) => format!("List<{}>", inner(&el)),

        (Canonical::Map(k, v), "python") => format!("dict[{}, {}]", inner(&k), inner(&v)),
        (Canonical::Map(k, v), "typescript") => format!("Map<{}, {}>", inner(&k), inner(&v)),
        (Canonical::Map(k, v), "go") => format!("map[{}]{}", inner(&k), inner(&v)),
        (Canonical::Map(k, v), _) => format!("Map<{}, {}>", inner(&k), inner(&v)),

        (Canonical::Optional(t), "python") => format!("Optional[{}]", inner(&t)),
        (Canonical::Optional(t), "typescript") => format!("{} | undefined", inner(&t)),
        (Canonical::Optional(t), "go") => format!("*{}", inner(&t)),
        (Canonical::Optional(t), _) => format!("Optional<{}>", inner(&t)),

        (Canonical::Fallible(t), "go") => format!("({}, error)", inner(&t)),
        (Canonical::Fallible(t), _) => render_or_any(&t, target, boxed),

        (Canonical::Tuple(items), "python") => format!(
            "tuple[{}]",
            items.iter().map(inner).collect::<Vec<_>>().join(", ")
        ),
        (Canonical::Tuple(items), "typescript") => format!(
            "[{}]",
            items.iter().map(inner).collect::<Vec<_>>().join(", ")
        ),
        (Canonical::Tuple(items), "go") => format!(
            "({})",
            items.iter().map(inner).collect::<Vec<_>>().join(", ")
        ),
        (Canonical::Tuple(_), _) => "Object[]".into(),

        (Canonical::Opaque, _) => ty.to_string(),
    }
}

fn render_or_any(ty: &TypeRef, target: &str, boxed: bool) -> String {
    if ty.is_unknown() {
        any_type(target).unwrap_or_else(|| "Any".to_string())
    } else {
        render(ty, target, boxed)
    }
}
