//! CLI tool for compiling CSV test scripts into conversations.
//!
//! Accepts a single CSV file or a directory of them. Capabilities come from an
//! optional JSON file plus `--cap KEY=VALUE` overrides.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use csv_convo_compiler_core::{
    compile_all_files, compile_file, write_jsonl, write_jsonl_output, Capabilities, CsvCompiler,
    FileResult, PipelineResult, ScriptType,
};

/// Compile CSV scripts into me/bot conversations.
#[derive(Parser, Debug)]
#[command(name = "csv-convo-compile")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV file or directory containing CSV files
    input: PathBuf,

    /// JSON file with capabilities
    #[arg(long)]
    caps: Option<PathBuf>,

    /// Capability override, KEY=VALUE (repeatable)
    #[arg(long = "cap", value_name = "KEY=VALUE")]
    cap_overrides: Vec<String>,

    /// Destination script type (convo, pconvo, utterances, scripting_memory)
    #[arg(long, default_value = "convo")]
    script_type: String,

    /// Output JSONL file (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the resolved table layout instead of conversations
    #[arg(long)]
    analyze: bool,
}

fn load_capabilities(args: &Args) -> Result<Capabilities, Box<dyn std::error::Error>> {
    let mut caps = match &args.caps {
        Some(path) => Capabilities::from_json_str(&std::fs::read_to_string(path)?)?,
        None => Capabilities::new(),
    };
    for assignment in &args.cap_overrides {
        caps.apply_override(assignment)?;
    }
    Ok(caps)
}

fn analyze(args: &Args, caps: Capabilities) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = CsvCompiler::new(caps);
    compiler.validate()?;

    let data = std::fs::read(&args.input)?;
    match compiler.analyze_script(&data)? {
        Some(layout) => println!("{}", serde_json::to_string_pretty(&layout)?),
        None => println!("null"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let caps = load_capabilities(&args)?;
    let script_type: ScriptType = args.script_type.parse()?;

    if args.analyze {
        return analyze(&args, caps);
    }

    let results: Vec<FileResult> = if args.input.is_dir() {
        info!("Compiling CSV files from {:?}...", args.input);
        compile_all_files(&args.input, &caps, script_type)?
    } else {
        vec![compile_file(&args.input, &caps, script_type)?]
    };

    let result: PipelineResult = match &args.output {
        Some(path) => {
            info!("Writing output to {:?}...", path);
            write_jsonl_output(&results, path)?
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let summary = write_jsonl(&results, &mut out)?;
            out.flush()?;
            summary
        }
    };

    info!(
        "[summary] files: {}, conversations: {}, partial conversations: {}, steps: {}",
        result.total_files, result.total_conversations, result.partial_conversations, result.total_steps
    );

    Ok(())
}
