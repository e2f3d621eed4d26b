//! stdmerge core library: consolidates the standard libraries of several
//! ecosystems into one unified library.
//!
//! The pipeline parses each library into signatures, clusters equivalent
//! functions across libraries into patterns, ranks the implementations of
//! every pattern, emits one unified module per pattern and strips the
//! redundant functions from copies of the original libraries.

pub mod config;
pub mod errors;
pub mod extractor;
pub mod matcher;
pub mod models;
pub mod naming;
pub mod parser;
pub mod pipeline;
pub mod ranker;
pub mod report;
pub mod store;
pub mod stripper;

pub use config::MergeConfig;
pub use errors::{MergeError, Stage, StdResult};
pub use extractor::{extract, Extractor};
pub use matcher::{find_patterns, PatternMatcher};
pub use models::{
    ExtractedModule, FunctionSignature, Library, MergeResult, Pattern, Ranking, StrippedLibrary,
};
pub use parser::{parse_library, ParserRegistry};
pub use pipeline::{merge, LibraryInput, Pipeline};
pub use ranker::{rank, QualityCriteria};
pub use stripper::{strip, Stripper};
