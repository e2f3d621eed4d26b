//! Criterion benchmarks for stdmerge-core.
//!
//! ## Benchmark groups
//!
//! 1. **name_similarity** — normalization and edit distance.
//! 2. **clustering** — greedy name clustering on synthetic libraries.
//! 3. **ranking** — scoring one pattern and ranking many in parallel.
//! 4. **parsing** — signature extraction from a synthetic python module.
//! 5. **similarity_cache** — in-memory and SQLite-backed lookups.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/stdmerge-core/Cargo.toml
//! # Run only the clustering group:
//! cargo bench --manifest-path crates/stdmerge-core/Cargo.toml -- clustering
//! ```

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;

use stdmerge_core::matcher::cluster::cluster_functions;
use stdmerge_core::matcher::similarity::{levenshtein, name_similarity, normalize_name};
use stdmerge_core::models::{FunctionSignature, Parameter, Pattern, SourceLocation, TypeRef};
use stdmerge_core::parser::{LanguageAdapter, PythonAdapter};
use stdmerge_core::ranker::{rank, rank_all, QualityCriteria};
use stdmerge_core::store::SimilarityCache;

const ECOSYSTEMS: [&str; 4] = ["go", "java", "python", "typescript"];
const STEMS: [&str; 12] = [
    "split", "join", "trim", "replace", "map", "filter", "fold", "sort", "read_file", "write_file",
    "now", "parse_date",
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn signature(name: &str, ecosystem: &str, returns: &str) -> FunctionSignature {
    let mut sig = FunctionSignature::new(name, "bench", SourceLocation::new("bench", 1, 1))
        .with_ecosystem(ecosystem);
    sig.parameters = vec![
        Parameter::new("text", TypeRef::named("string")),
        Parameter::new("sep", TypeRef::named("string")),
    ];
    sig.return_type = TypeRef::parse(returns);
    sig.documentation = format!("{name} as implemented by the {ecosystem} library.");
    sig
}

/// `per_library` functions in each of the four ecosystems, spelled the way
/// each ecosystem would spell them.
fn synthetic_functions(per_library: usize) -> Vec<FunctionSignature> {
    let mut functions = Vec::with_capacity(per_library * ECOSYSTEMS.len());
    for eco in ECOSYSTEMS {
        for i in 0..per_library {
            let stem = STEMS[i % STEMS.len()];
            let base = if i < STEMS.len() {
                stem.to_string()
            } else {
                format!("{stem}_{}", i / STEMS.len())
            };
            let name = match eco {
                "go" => stdmerge_core::naming::pascal_case(&base),
                "java" | "typescript" => stdmerge_core::naming::camel_case(&base),
                _ => base,
            };
            functions.push(signature(&name, eco, "string"));
        }
    }
    functions
}

fn pattern(name: &str) -> Pattern {
    let mut implementations = IndexMap::new();
    let returns = [("go", "(string, error)"), ("java", "Optional<String>"), ("python", "str"), ("typescript", "Result<string, Error>")];
    for (eco, ret) in returns {
        implementations.insert(eco.to_string(), signature(name, eco, ret));
    }
    Pattern {
        id: format!("{name}-bench"),
        name: name.to_string(),
        implementations,
        similarity_score: 0.9,
        is_universal: true,
        category: "string".to_string(),
        metadata: BTreeMap::new(),
    }
}

fn python_module(functions: usize) -> String {
    let mut source = String::from("\"\"\"Synthetic module.\"\"\"\n\n");
    for i in 0..functions {
        source.push_str(&format!(
            "def helper_{i}(text: str, sep: str = \",\") -> list[str]:\n    \"\"\"Split text.\n\n    >>> helper_{i}(\"a,b\")\n    \"\"\"\n    return text.split(sep)\n\n\n"
        ));
    }
    source
}

// ---------------------------------------------------------------------------
// Benchmark: name similarity
// ---------------------------------------------------------------------------

fn bench_name_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_similarity");

    group.bench_function("normalize_name", |b| {
        b.iter(|| normalize_name(black_box("read_all_lines_from_file")))
    });
    group.bench_function("levenshtein_short", |b| {
        b.iter(|| levenshtein(black_box("split"), black_box("splt")))
    });
    group.bench_function("levenshtein_long", |b| {
        b.iter(|| {
            levenshtein(
                black_box("readallbytesfromfileasync"),
                black_box("readallbytesfromstreamasync"),
            )
        })
    });
    group.bench_function("name_similarity_cross_case", |b| {
        b.iter(|| name_similarity(black_box("read_file"), black_box("ReadFile")))
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: clustering
// ---------------------------------------------------------------------------

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering");

    for &per_library in &[12, 48, 120] {
        let functions = synthetic_functions(per_library);
        group.bench_with_input(
            BenchmarkId::new("cluster_functions", functions.len()),
            &functions,
            |b, functions| b.iter(|| cluster_functions(black_box(functions), 0.8)),
        );
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: ranking
// ---------------------------------------------------------------------------

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    let criteria = QualityCriteria::default();

    let single = pattern("split");
    group.bench_function("rank_one_pattern", |b| {
        b.iter(|| rank(black_box(&single), &criteria))
    });

    for &count in &[10, 100, 500] {
        let patterns: Vec<Pattern> = (0..count).map(|i| pattern(&format!("op_{i}"))).collect();
        group.bench_with_input(BenchmarkId::new("rank_all", count), &patterns, |b, patterns| {
            b.iter(|| rank_all(black_box(patterns), &criteria))
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: parsing
// ---------------------------------------------------------------------------

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    for &functions in &[10, 100] {
        let source = python_module(functions);
        group.bench_with_input(
            BenchmarkId::new("python_module", functions),
            &source,
            |b, source| b.iter(|| PythonAdapter.parse_source(black_box(source), "bench/text.py")),
        );
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: similarity cache
// ---------------------------------------------------------------------------

fn bench_similarity_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity_cache");
    let fragments: Vec<String> = (0..4).map(|i| format!("split(text, sep) -> list #{i}")).collect();

    group.bench_function("key", |b| b.iter(|| SimilarityCache::key(black_box(&fragments))));

    let memory = SimilarityCache::in_memory();
    let key = SimilarityCache::key(&fragments);
    memory.put(&key, 0.9, "bench", "bench");
    group.bench_function("in_memory_hit", |b| b.iter(|| memory.get(black_box(&key))));

    let dir = tempfile::tempdir().unwrap();
    group.bench_function("sqlite_miss_then_hit", |b| {
        b.iter_with_setup(
            || SimilarityCache::persistent(&dir.path().join("cache.db")).unwrap(),
            |cache| {
                black_box(cache.get(&key));
                cache.put(&key, 0.9, "bench", "bench");
            },
        );
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Register all benchmark groups
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_name_similarity,
    bench_clustering,
    bench_ranking,
    bench_parsing,
    bench_similarity_cache,
);
criterion_main!(benches);
