use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use prism_merge_core::{merge, MergeError, MergeOptions, MethodMatchRefiner, Preference, Side};

/// Merges a destination source file against its template, preserving
/// freeze regions and structural identity rather than line position.
#[derive(Parser)]
#[command(name = "prism-merge", about = "Structural three-way-less merge for Ruby source")]
struct Cli {
    /// The canonical upstream source file.
    template: PathBuf,

    /// The customized downstream source file.
    destination: PathBuf,

    /// Which side wins a signature match by default.
    #[arg(long, value_enum, default_value = "destination")]
    prefer: SidePref,

    /// Per merge-type preference override, `<type>=<template|destination>`. Repeatable.
    #[arg(long = "prefer-type", value_parser = parse_prefer_type)]
    prefer_type: Vec<(String, SidePref)>,

    /// Keep template-only nodes that have no destination counterpart.
    #[arg(long)]
    add_template_only_nodes: bool,

    /// Token prefix for freeze marker comments (`<token>:freeze` / `<token>:unfreeze`).
    #[arg(long, default_value = "prism-merge")]
    freeze_token: String,

    /// Maximum recursion depth into matched compound nodes. Unbounded if omitted.
    #[arg(long)]
    max_recursion_depth: Option<usize>,

    /// Enable the built-in fuzzy method-rename refiner.
    #[arg(long)]
    refine_methods: bool,

    /// Use the provenance-returning entry point and print a per-line report to stderr.
    #[arg(long)]
    provenance: bool,

    /// Print the decision tally to stderr.
    #[arg(long)]
    stats: bool,

    /// Report format for `--provenance` and `--stats`.
    #[arg(long, value_enum, default_value = "text")]
    format: ReportFormat,

    /// Write merged output here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(serde::Serialize)]
struct ProvenanceLine {
    line: usize,
    #[serde(flatten)]
    provenance: prism_merge_core::LineProvenance,
}

#[derive(serde::Serialize)]
struct Report {
    provenance: Option<Vec<ProvenanceLine>>,
    stats: Option<HashMap<String, usize>>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum SidePref {
    Template,
    Destination,
}

impl From<SidePref> for Side {
    fn from(value: SidePref) -> Self {
        match value {
            SidePref::Template => Side::Template,
            SidePref::Destination => Side::Destination,
        }
    }
}

fn parse_prefer_type(raw: &str) -> Result<(String, SidePref), String> {
    let (ty, side) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `<type>=<template|destination>`, got `{raw}`"))?;
    let side = match side {
        "template" => SidePref::Template,
        "destination" => SidePref::Destination,
        other => return Err(format!("unrecognized side `{other}`, expected `template` or `destination`")),
    };
    Ok((ty.to_string(), side))
}

/// `EX_USAGE`, matching the BSD `sysexits.h` convention the teacher follows
/// for CLI argument errors.
const EXIT_USAGE: i32 = 64;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = run(cli).unwrap_or_else(|err| {
        eprintln!("prism-merge: {err}");
        EXIT_USAGE
    });
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let template_src = fs::read_to_string(&cli.template)?;
    let destination_src = fs::read_to_string(&cli.destination)?;

    let preference = if cli.prefer_type.is_empty() {
        Preference::Global(cli.prefer.into())
    } else {
        let overrides: HashMap<String, Side> =
            cli.prefer_type.iter().map(|(ty, side)| (ty.clone(), (*side).into())).collect();
        Preference::ByType { default: cli.prefer.into(), overrides }
    };

    let refiner = MethodMatchRefiner::default();
    let mut options = MergeOptions {
        preference,
        add_template_only_nodes: cli.add_template_only_nodes,
        freeze_token: cli.freeze_token.clone(),
        max_recursion_depth: cli.max_recursion_depth,
        signature_generator: None,
        node_typing: None,
        match_refiners: Vec::new(),
    };
    if cli.refine_methods {
        options.match_refiners.push(Box::new(refiner));
    }

    tracing::debug!(template = %cli.template.display(), destination = %cli.destination.display(), "starting merge");

    let result = match merge(&template_src, &destination_src, &options) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("prism-merge: {err}");
            return Ok(exit_code_for(&err));
        }
    };

    match cli.format {
        ReportFormat::Text => {
            if cli.provenance {
                for (line_no, provenance) in result.provenance().iter().enumerate() {
                    eprintln!(
                        "{:>5} {:<16} template={:?} destination={:?}",
                        line_no + 1,
                        provenance.decision,
                        provenance.template_line,
                        provenance.destination_line
                    );
                }
            }
            if cli.stats {
                for (decision, count) in result.decision_tally() {
                    eprintln!("{decision}: {count}");
                }
            }
        }
        ReportFormat::Json => {
            if cli.provenance || cli.stats {
                let report = Report {
                    provenance: cli.provenance.then(|| {
                        result
                            .provenance()
                            .iter()
                            .enumerate()
                            .map(|(line_no, provenance)| ProvenanceLine { line: line_no + 1, provenance: *provenance })
                            .collect()
                    }),
                    stats: cli.stats.then(|| {
                        result.decision_tally().into_iter().map(|(decision, count)| (decision.to_string(), count)).collect()
                    }),
                };
                eprintln!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
    }

    let text = result.into_text();
    match cli.output {
        Some(path) => fs::write(path, text)?,
        None => std::io::stdout().write_all(text.as_bytes())?,
    }

    tracing::info!("merge complete");
    Ok(0)
}

fn exit_code_for(err: &MergeError) -> i32 {
    match err {
        MergeError::TemplateParseError { .. } => 2,
        MergeError::DestinationParseError { .. } => 3,
        MergeError::InvalidFreezeStructure { .. } => 4,
    }
}
