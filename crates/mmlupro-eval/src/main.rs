//! Evaluation binary for MMLU-Pro

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mmlupro_core::detect::{FORCE_THINKING_VAR, MODEL_NAME_VAR};
use mmlupro_core::{
    default_description, detect, filter_by_subject, is_math_subject, load_documents,
    FewShotContext, ModelSignal,
};
use mmlupro_eval::{
    aggregate, child_detection, load_samples, run_configuration, score_completions,
    EvaluationReport, HarnessConfig, HarnessRunner, MultiRunReport, Profile, RunRequest,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for evaluation
#[derive(Parser, Debug)]
#[command(name = "mmlupro-eval")]
#[command(about = "Evaluate language models on MMLU-Pro")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the harness several times and average the scores
    MultiRun(MultiRunArgs),
    /// Score saved completions offline
    Score(ScoreArgs),
    /// Print the prompt for one document
    Render(RenderArgs),
    /// Print the model-family verdict for the current environment
    Detect,
}

#[derive(Args, Debug)]
struct MultiRunArgs {
    /// Model arguments passed to the harness
    #[arg(long)]
    model: String,

    /// Number of runs
    #[arg(long, default_value = "3")]
    runs: usize,

    /// Evaluation profile
    #[arg(long, value_enum, default_value_t = Profile::Standard)]
    profile: Profile,

    /// Task name (default: the profile's task)
    #[arg(long)]
    task: Option<String>,

    /// Number of few-shot examples
    #[arg(long, default_value = "5")]
    num_fewshot: usize,

    /// Output file (default: the profile's file name)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Harness configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Export the profile's model name to the harness for detection
    #[arg(long)]
    set_model_name: bool,

    /// Override the directive decision in the harness
    #[arg(long)]
    force_thinking: Option<bool>,

    /// Also write a Markdown report next to the JSON one
    #[arg(long)]
    markdown: bool,

    /// Extra arguments appended to every harness invocation
    #[arg(last = true)]
    harness_args: Vec<String>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// JSONL file of documents with a `completion` field
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Output directory for the scoring report
    #[arg(long, short = 'o', default_value = "./eval_results")]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// JSONL file of documents
    #[arg(long, short = 'd')]
    data: PathBuf,

    /// Index of the document to render
    #[arg(long, default_value = "0")]
    index: usize,

    /// JSONL file of exemplars with worked answers
    #[arg(long)]
    fewshot_data: Option<PathBuf>,

    /// Number of exemplars to include
    #[arg(long, default_value = "0")]
    num_fewshot: usize,

    /// Evaluation profile (selects the system prompt)
    #[arg(long, value_enum, default_value_t = Profile::Standard)]
    profile: Profile,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::MultiRun(args) => multi_run(args),
        Command::Score(args) => score(args),
        Command::Render(args) => render(args),
        Command::Detect => {
            let signal = ModelSignal::from_env();
            let detection = detect(&signal);
            println!("{}", serde_json::to_string_pretty(&signal)?);
            println!("{}", serde_json::to_string_pretty(&detection)?);
            println!("family: {:?}", detection.family());
            Ok(())
        }
    }
}

fn multi_run(args: MultiRunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    config.extra_args.extend(args.harness_args.iter().cloned());

    let mut runner = HarnessRunner::new(config);
    if args.set_model_name {
        runner = runner.env(MODEL_NAME_VAR, args.profile.model_name_hint());
    }
    if let Some(force) = args.force_thinking {
        runner = runner.env(FORCE_THINKING_VAR, force.to_string());
    }

    let request = RunRequest {
        model_args: args.model.clone(),
        task: args
            .task
            .clone()
            .unwrap_or_else(|| args.profile.default_task().to_string()),
        num_fewshot: args.num_fewshot,
        gen_kwargs: args.profile.generation().map(|g| g.to_gen_kwargs()),
    };
    let detection = child_detection(&runner);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.profile.default_output());

    println!(
        "Running {} evaluation {} times...",
        args.profile.display_name(),
        args.runs
    );
    info!(
        "Model family {:?}, directive forced: {}",
        detection.family(),
        detection.should_force_directive
    );

    let outcome = aggregate(args.runs, |_| {
        let scores = runner.run_once(&request)?;
        match scores.get(&request.task) {
            Some(score) => info!("Overall accuracy: {:.4}", score),
            None => info!("Overall accuracy: N/A"),
        }
        Ok(scores)
    });
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let configuration = run_configuration(args.profile, &request, args.runs, &detection);
    let report = MultiRunReport::new(configuration, outcome);
    report.save(&output)?;
    if args.markdown {
        report.save_markdown(&output.with_extension("md"))?;
    }

    println!("\n=== FINAL AVERAGED RESULTS ({}) ===", args.profile.display_name());
    for line in report.summary_lines() {
        println!("{}", line);
    }
    println!("\nResults saved to {:?}", output);

    Ok(())
}

fn score(args: ScoreArgs) -> Result<()> {
    let samples = load_samples(&args.input)?;
    info!("Loaded {} samples from {:?}", samples.len(), args.input);

    let summary = score_completions(&samples)?;
    let report = EvaluationReport::generate_report(&summary.by_category);

    std::fs::create_dir_all(&args.output_dir)?;

    let report_json_path = args.output_dir.join("report.json");
    let report_json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&report_json_path, report_json)?;
    println!("Report saved to {:?}", report_json_path);

    let report_md_path = args.output_dir.join("report.md");
    std::fs::write(&report_md_path, report.to_markdown())?;
    println!("Markdown report saved to {:?}", report_md_path);

    println!("\n=== Scoring Summary ===");
    println!(
        "Overall: {:.2}% ({} / {}), {} without an extractable answer",
        summary.overall.score * 100.0,
        summary.overall.correct,
        summary.overall.total_samples,
        summary.extraction_misses
    );
    for result in &report.benchmarks {
        println!(
            "  {}: {:.2}% ({} / {})",
            result.benchmark_name,
            result.score * 100.0,
            result.correct,
            result.total_samples
        );
    }

    Ok(())
}

fn render(args: RenderArgs) -> Result<()> {
    let documents = load_documents(&args.data)?;
    let target = documents.get(args.index).with_context(|| {
        format!(
            "Document index {} out of range ({} documents)",
            args.index,
            documents.len()
        )
    })?;

    let exemplars = match &args.fewshot_data {
        Some(path) if args.num_fewshot > 0 => {
            let mut pool = filter_by_subject(&load_documents(path)?, &target.category);
            pool.truncate(args.num_fewshot);
            pool
        }
        _ => Vec::new(),
    };

    let detection = detect(&ModelSignal::from_env());
    let mut context = FewShotContext::new().description(default_description(&target.category));
    if let Some(system_prompt) = args.profile.system_prompt() {
        context = context.system_prompt(system_prompt);
    }

    let prompt = context.build(
        &exemplars,
        target,
        is_math_subject(&target.category),
        &detection,
    )?;

    if let Some(system) = &prompt.system {
        println!("[system]\n{}\n", system);
    }
    println!("[user]\n{}", prompt.user);

    Ok(())
}
