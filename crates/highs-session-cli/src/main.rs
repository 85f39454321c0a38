use clap::{Parser, Subcommand, ValueEnum};
use highs_session::{
    Info, ModelDescriptor, OptionValue, Session, SessionConfig, Solution,
    SolutionStyle, SolveOptions, SolveProgress, highs_version, init_logging, read_progress,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "highs-session")]
#[command(about = "Solve optimization models through a HiGHS session")]
struct Cli {
    /// Log filter, e.g. `info` or `highs_session=debug`
    #[arg(long, global = true)]
    trace: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a model, solve it and report the outcome
    Solve(SolveArgs),
    /// Read a model and write it back out in the format implied by the extension
    Convert(ConvertArgs),
    /// Print the linked HiGHS version
    Version,
}

#[derive(Parser)]
struct SolveArgs {
    /// Model file: `.json` descriptor, or any format HiGHS reads (`.mps`, `.lp`, ...)
    model: PathBuf,
    /// JSON session configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Engine option override, repeatable
    #[arg(long = "option", value_name = "NAME=VALUE", value_parser = parse_option_assignment)]
    options: Vec<(String, OptionValue)>,
    /// Redirect engine output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Write the solution to this file after solving
    #[arg(long)]
    solution: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "raw")]
    style: StyleArg,
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
    /// Report non-optimal outcomes instead of failing
    #[arg(long)]
    allow_non_optimal: bool,
    /// Include column and row values in the report
    #[arg(long)]
    values: bool,
}

#[derive(Parser)]
struct ConvertArgs {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StyleArg {
    Raw,
    Pretty,
}

impl From<StyleArg> for SolutionStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Raw => SolutionStyle::Raw,
            StyleArg::Pretty => SolutionStyle::Pretty,
        }
    }
}

#[derive(Debug, Serialize)]
struct SolveReport {
    model: String,
    status: &'static str,
    status_code: i32,
    objective_value: f64,
    run_time_secs: f64,
    columns: usize,
    rows: usize,
    info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<SolveProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution: Option<Solution>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.trace.as_deref())?;
    match cli.command {
        Commands::Solve(args) => solve(args),
        Commands::Convert(args) => convert(&args),
        Commands::Version => {
            println!("{}", highs_version());
            Ok(())
        }
    }
}

fn solve(args: SolveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    let session = Session::with_config(&config)?;
    load_model(&session, &args.model)?;

    let status = session.solve_with(SolveOptions::default().allow_non_optimal(args.allow_non_optimal))?;
    info!(
        component = "cli",
        operation = "solve",
        status = "success",
        model_status = %status,
        "Solve finished"
    );

    let progress = match session.log_file() {
        Some(path) => read_progress(path)?,
        None => None,
    };
    let report = SolveReport {
        model: args.model.display().to_string(),
        status: status.as_str(),
        status_code: status.code(),
        objective_value: session.objective_value()?,
        run_time_secs: session.run_time()?,
        columns: session.num_columns()?,
        rows: session.num_rows()?,
        info: session.get_info()?,
        progress,
        solution: if args.values {
            Some(session.get_solution()?)
        } else {
            None
        },
    };

    if let Some(path) = &args.solution {
        session.write_solution(path, args.style.into())?.wait()?;
    }

    match args.format {
        OutputFormat::Table => print_report_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn convert(args: &ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new()?;
    session.set_option("output_flag", false)?;
    load_model(&session, &args.input)?;
    session.write_model(&args.output)?.wait()?;
    println!(
        "wrote {} ({} columns, {} rows)",
        args.output.display(),
        session.num_columns()?,
        session.num_rows()?
    );
    Ok(())
}

fn build_config(args: &SolveArgs) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_path(path)?,
        None => SessionConfig::new(),
    };
    if let Some(path) = &args.log_file {
        config = config.with_log_file(path);
    }
    for (name, value) in &args.options {
        config = config.with_option(name.clone(), value.clone());
    }
    Ok(config)
}

fn load_model(session: &Session, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if is_json_model(path) {
        let model = ModelDescriptor::from_path(path)?;
        session.pass_model(&model)?;
    } else {
        session.read_model(path)?.wait()?;
    }
    Ok(())
}

fn is_json_model(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn parse_option_assignment(text: &str) -> Result<(String, OptionValue), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{text}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing option name in '{text}'"));
    }
    Ok((name.to_string(), OptionValue::parse_literal(value.trim())))
}

fn print_report_table(report: &SolveReport) {
    println!("{:<28} {}", "model", report.model);
    println!("{:<28} {} ({})", "status", report.status, report.status_code);
    println!("{:<28} {}", "objective_value", format_float(report.objective_value));
    println!("{:<28} {:.3}", "run_time_secs", report.run_time_secs);
    println!("{:<28} {}", "columns", report.columns);
    println!("{:<28} {}", "rows", report.rows);
    for (name, value) in report.info.iter() {
        let text = value
            .as_i64()
            .map_or_else(|| format_float(value.as_f64()), |count| count.to_string());
        println!("{:<28} {}", name, text);
    }
    if let Some(progress) = &report.progress {
        print_progress_table(progress);
    }
    if let Some(solution) = &report.solution {
        print_solution_table(solution);
    }
}

fn print_progress_table(progress: &SolveProgress) {
    println!();
    println!(
        "{:>14} {:>14} {:>10} {:>8} {:>12}",
        "primal_bound", "dual_bound", "rel_gap", "cuts", "lp_iters"
    );
    println!(
        "{:>14} {:>14} {:>10} {:>8} {:>12}",
        format_float(progress.primal_bound),
        format_float(progress.dual_bound),
        progress
            .relative_gap
            .map_or_else(|| "Large".to_string(), format_float),
        progress.cut_count,
        progress.lp_iteration_count
    );
}

fn print_solution_table(solution: &Solution) {
    println!();
    println!("{:<8} {:>8} {:>16} {:>16}", "kind", "index", "value", "dual");
    for (index, value) in solution.column_values.iter().enumerate() {
        println!(
            "{:<8} {:>8} {:>16} {:>16}",
            "column",
            index,
            format_validity(*value, solution.is_value_valid),
            format_validity(solution.column_dual_values[index], solution.is_dual_valid)
        );
    }
    for (index, value) in solution.row_values.iter().enumerate() {
        println!(
            "{:<8} {:>8} {:>16} {:>16}",
            "row",
            index,
            format_validity(*value, solution.is_value_valid),
            format_validity(solution.row_dual_values[index], solution.is_dual_valid)
        );
    }
}

fn format_validity(value: f64, valid: bool) -> String {
    if valid {
        format_float(value)
    } else {
        "-".to_string()
    }
}

fn format_float(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{value:.6}")
    }
}
