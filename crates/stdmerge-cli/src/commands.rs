//! Command handlers. Each builds a `Pipeline` from the shared input
//! arguments and prints a short summary on stdout.

use anyhow::{bail, Result};
use stdmerge_core::{MergeConfig, MergeResult, Pipeline, Ranking};
use tracing::debug;

use crate::cli::{AnalyzeArgs, Command, InputArgs, RankArgs, RunArgs};

pub fn execute(command: Command) -> Result<()> {
    match command {
        Command::Merge(args) => run(&args, "merge", |p, a| p.merge(&a.inputs.libraries, &a.output)),
        Command::Extract(args) => run(&args, "extract", |p, a| {
            p.extract_only(&a.inputs.libraries, &a.output)
        }),
        Command::Strip(args) => run(&args, "strip", |p, a| p.strip_only(&a.inputs.libraries, &a.output)),
        Command::Report(args) => run(&args, "report", |p, a| {
            p.report_only(&a.inputs.libraries, &a.output)
        }),
        Command::Analyze(args) => analyze(&args),
        Command::Rank(args) => rank(&args),
    }
}

fn pipeline(inputs: &InputArgs) -> Result<Pipeline> {
    let pipeline = match &inputs.config {
        Some(path) => Pipeline::from_config_file(path)?,
        None => {
            let mut config = MergeConfig::default();
            config.apply_env_overrides();
            Pipeline::new(config)?
        }
    };
    debug!(config = ?pipeline.config(), "configuration loaded");
    Ok(pipeline)
}

fn run<F>(args: &RunArgs, name: &str, op: F) -> Result<()>
where
    F: FnOnce(&Pipeline, &RunArgs) -> stdmerge_core::StdResult<MergeResult>,
{
    let pipeline = pipeline(&args.inputs)?;
    let result = op(&pipeline, args)?;
    println!("{name} finished, output in {}", args.output.display());
    print_summary(&result);
    Ok(())
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    let result = pipeline(&args.inputs)?.analyze(&args.inputs.libraries)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.patterns)?);
        return Ok(());
    }
    for pattern in &result.patterns {
        let ecosystems: Vec<&str> = pattern.implementations.keys().map(String::as_str).collect();
        println!(
            "{:<24} {:<10} {:.2} {}{}",
            pattern.name,
            pattern.category,
            pattern.similarity_score,
            ecosystems.join(","),
            if pattern.is_universal { " (universal)" } else { "" }
        );
    }
    print_summary(&result);
    Ok(())
}

fn rank(args: &RankArgs) -> Result<()> {
    let pipeline = pipeline(&args.inputs)?;
    let Some(ranking) = pipeline.rank_pattern(&args.inputs.libraries, &args.pattern)? else {
        bail!("no pattern named '{}' was found", args.pattern);
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&ranking)?);
    } else {
        print_ranking(&ranking);
    }
    Ok(())
}

fn print_ranking(ranking: &Ranking) {
    println!("{} ({})", ranking.pattern.name, ranking.pattern.category);
    for (ecosystem, score) in &ranking.scores {
        let marker = if *ecosystem == ranking.best_ecosystem { "*" } else { " " };
        println!(" {marker} {ecosystem:<12} {score:.3}");
    }
    println!("\n{}", ranking.justification);
}

fn print_summary(result: &MergeResult) {
    for (key, value) in &result.statistics {
        if *value > 0 {
            println!("  {key}: {value}");
        }
    }
    for path in result.reports.values() {
        println!("  report: {}", path.display());
    }
    if !result.warnings.is_empty() {
        println!("  {} warning(s):", result.warnings.len());
        for warning in &result.warnings {
            println!("    - {warning}");
        }
    }
}
