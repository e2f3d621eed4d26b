//! Markdown reports written next to the unified modules.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::info;

use crate::errors::StdResult;
use crate::models::{ExtractedModule, ExtractionKind, Pattern, Ranking, StrippedLibrary};

pub const SIMILARITY_REPORT: &str = "SIMILARITY-REPORT.md";
pub const RANKING_REPORT: &str = "RANKING-REPORT.md";
pub const COMPOSITION_GUIDE: &str = "COMPOSITION-GUIDE.md";
pub const MIGRATION_GUIDE: &str = "MIGRATION-GUIDE.md";

/// Everything the reports are rendered from.
#[derive(Clone, Copy, Default)]
pub struct ReportInputs<'a> {
    pub ecosystems: &'a [String],
    pub patterns: &'a [Pattern],
    pub rankings: &'a [Ranking],
    pub extracted: &'a [ExtractedModule],
    pub stripped: &'a [StrippedLibrary],
    pub warnings: &'a [String],
}

/// Write all reports under `output_root`. Returns report name → path in a
/// fixed order.
pub fn write_reports(output_root: &Path, inputs: &ReportInputs<'_>) -> StdResult<IndexMap<String, PathBuf>> {
    std::fs::create_dir_all(output_root)?;
    let documents = [
        (SIMILARITY_REPORT, similarity_report(inputs.patterns, inputs.ecosystems)),
        (RANKING_REPORT, ranking_report(inputs.rankings)),
        (COMPOSITION_GUIDE, composition_guide(inputs.rankings, inputs.extracted)),
        (MIGRATION_GUIDE, migration_guide(inputs.stripped, inputs.warnings)),
    ];
    let mut paths = IndexMap::new();
    for (name, body) in documents {
        let path = output_root.join(name);
        std::fs::write(&path, body)?;
        paths.insert(name.to_string(), path);
    }
    info!(reports = paths.len(), output = %output_root.display(), "reports written");
    Ok(paths)
}

pub fn similarity_report(patterns: &[Pattern], ecosystems: &[String]) -> String {
    let mut out = String::new();
    let universal = patterns.iter().filter(|p| p.is_universal).count();
    let _ = writeln!(out, "# Similarity Report\n");
    let _ = writeln!(out, "- Libraries analyzed: {}", ecosystems.join(", "));
    let _ = writeln!(out, "- Patterns found: {}", patterns.len());
    let _ = writeln!(out, "- Universal patterns: {universal}\n");

    if patterns.is_empty() {
        let _ = writeln!(out, "No cross-library patterns were found.");
        return out;
    }

    let mut by_category: IndexMap<&str, Vec<&Pattern>> = IndexMap::new();
    for p in patterns {
        by_category.entry(p.category.as_str()).or_default().push(p);
    }
    by_category.sort_keys();

    for (category, group) in by_category {
        let _ = writeln!(out, "## {category}\n");
        let _ = writeln!(out, "| Pattern | Id | Similarity | Universal | Implementations |");
        let _ = writeln!(out, "|---|---|---|---|---|");
        for p in group {
            let impls: Vec<String> = p
                .implementations
                .iter()
                .map(|(eco, sig)| format!("{eco}: `{}`", sig.qualified_name()))
                .collect();
            let semantic = p
                .metadata
                .get("semantic_confidence")
                .map(|c| format!(" (semantic {c})"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "| {} | `{}` | {:.2}{semantic} | {} | {} |",
                p.name,
                p.id,
                p.similarity_score,
                if p.is_universal { "yes" } else { "no" },
                impls.join("<br>")
            );
        }
        let _ = writeln!(out);
    }
    out
}

pub fn ranking_report(rankings: &[Ranking]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Ranking Report\n");
    if rankings.is_empty() {
        let _ = writeln!(out, "No patterns were ranked.");
        return out;
    }

    let mut wins: IndexMap<&str, usize> = IndexMap::new();
    for r in rankings {
        *wins.entry(r.best_ecosystem.as_str()).or_default() += 1;
    }
    wins.sort_by(|a, _, b, _| a.cmp(b));
    let _ = writeln!(out, "## Wins per ecosystem\n");
    for (eco, count) in &wins {
        let _ = writeln!(out, "- {eco}: {count}");
    }
    let _ = writeln!(out);

    for r in rankings {
        let _ = writeln!(out, "## {}\n", r.pattern.name);
        let _ = writeln!(out, "Winner: **{}** (`{}`)\n", r.best_ecosystem, r.best_implementation.render());

        let criteria: Vec<&String> = r
            .criterion_scores
            .values()
            .next()
            .map(|c| c.keys().collect())
            .unwrap_or_default();
        let mut header = String::from("| Ecosystem | Score |");
        let mut rule = String::from("|---|---|");
        for name in &criteria {
            header.push_str(&format!(" {name} |"));
            rule.push_str("---|");
        }
        let _ = writeln!(out, "{header}\n{rule}");
        for (eco, score) in &r.scores {
            let mut row = format!("| {eco} | {score:.2} |");
            for name in &criteria {
                let value = r
                    .criterion_scores
                    .get(eco)
                    .and_then(|c| c.get(name.as_str()))
                    .copied()
                    .unwrap_or(0.0);
                row.push_str(&format!(" {value:.2} |"));
            }
            let _ = writeln!(out, "{row}");
        }
        let _ = writeln!(out, "\n{}\n", r.justification);
    }
    out
}

/// Unified API grouped by category, with the functions that chain well.
pub fn composition_guide(rankings: &[Ranking], extracted: &[ExtractedModule]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Composition Guide\n");
    if rankings.is_empty() {
        let _ = writeln!(out, "The unified library is empty.");
        return out;
    }

    let modules: IndexMap<&str, &ExtractedModule> = extracted
        .iter()
        .map(|m| (m.pattern.id.as_str(), m))
        .collect();

    let mut by_category: IndexMap<&str, Vec<&Ranking>> = IndexMap::new();
    for r in rankings {
        by_category.entry(r.pattern.category.as_str()).or_default().push(r);
    }
    by_category.sort_keys();

    for (category, group) in by_category {
        let _ = writeln!(out, "## {category}\n");
        for r in &group {
            let status = match modules.get(r.pattern.id.as_str()) {
                Some(m) => {
                    let file = m
                        .output_path
                        .file_name()
                        .map(|f| f.to_string_lossy().to_string())
                        .unwrap_or_default();
                    match m.kind {
                        ExtractionKind::Placeholder => format!("`{file}` (placeholder)"),
                        _ => format!("`{file}`"),
                    }
                }
                None => "not extracted".to_string(),
            };
            let _ = writeln!(
                out,
                "- `{}` from {}: {status}",
                r.best_implementation.render(),
                r.best_ecosystem
            );
        }

        let chainable: Vec<&str> = group
            .iter()
            .filter(|r| {
                let sig = &r.best_implementation;
                !sig.return_type.is_void() && !sig.parameters.is_empty() && sig.parameters.len() <= 2
            })
            .map(|r| r.pattern.name.as_str())
            .collect();
        if chainable.len() > 1 {
            let _ = writeln!(
                out,
                "\nChainable: {} return values and take at most two arguments, so they compose into pipelines.",
                chainable.iter().map(|n| format!("`{n}`")).collect::<Vec<_>>().join(", ")
            );
        }
        let _ = writeln!(out);
    }
    out
}

pub fn migration_guide(stripped: &[StrippedLibrary], warnings: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Migration Guide\n");
    if stripped.is_empty() {
        let _ = writeln!(out, "No libraries were stripped.");
    }
    for lib in stripped {
        let _ = writeln!(out, "## {}\n", lib.library.ecosystem);
        let _ = writeln!(out, "- Mode: {}", lib.mode);
        let _ = writeln!(out, "- Functions removed: {}", lib.removed.len());
        let _ = writeln!(out, "- Details: `{}`\n", lib.migration_note.display());
        if !lib.added_references.is_empty() {
            let _ = writeln!(out, "```{}", lib.library.ecosystem);
            for reference in &lib.added_references {
                let _ = writeln!(out, "{reference}");
            }
            let _ = writeln!(out, "```\n");
        }
    }
    if !warnings.is_empty() {
        let _ = writeln!(out, "## Warnings\n");
        for warning in warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FunctionSignature, SourceLocation};
    use std::collections::BTreeMap;

    fn pattern(name: &str, category: &str, universal: bool) -> Pattern {
        let mut implementations = IndexMap::new();
        for eco in ["go", "python"] {
            implementations.insert(
                eco.to_string(),
                FunctionSignature::new(name, "m", SourceLocation::new("m", 1, 1)).with_ecosystem(eco),
            );
        }
        Pattern {
            id: format!("{name}00"),
            name: name.into(),
            implementations,
            similarity_score: 0.9,
            is_universal: universal,
            category: category.into(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_similarity_report_groups_by_category() {
        let patterns = vec![pattern("split", "string", true), pattern("add", "math", false)];
        let report = similarity_report(&patterns, &["go".into(), "python".into()]);
        assert!(report.contains("- Patterns found: 2"));
        assert!(report.contains("- Universal patterns: 1"));
        let math = report.find("## math").unwrap();
        let string = report.find("## string").unwrap();
        assert!(math < string);
        assert!(report.contains("go: `m.split`"));
    }

    #[test]
    fn test_empty_reports_say_so() {
        assert!(similarity_report(&[], &[]).contains("No cross-library patterns"));
        assert!(ranking_report(&[]).contains("No patterns were ranked"));
        assert!(migration_guide(&[], &[]).contains("No libraries were stripped"));
    }

    #[test]
    fn test_write_reports_records_paths() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_reports(dir.path(), &ReportInputs::default()).unwrap();
        let names: Vec<&str> = paths.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![SIMILARITY_REPORT, RANKING_REPORT, COMPOSITION_GUIDE, MIGRATION_GUIDE]
        );
        assert!(paths.values().all(|p| p.exists()));
    }
}
