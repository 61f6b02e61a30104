//! Pipeline for compiling CSV script files into conversations.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::caps::CapabilityLookup;
use crate::compiler::{CsvCompiler, ScriptContext, ScriptType};
use crate::conversation::{Convo, ConvoStep};
use crate::error::{CompileError, Result};

/// Result of compiling a single file.
#[derive(Debug)]
pub struct FileResult {
    pub context: ScriptContext,
    pub source_path: String,
}

/// Summary of a pipeline run.
#[derive(Debug, Default, Serialize)]
pub struct PipelineResult {
    pub total_files: usize,
    pub total_conversations: usize,
    pub partial_conversations: usize,
    pub total_steps: usize,
}

/// One output line.
#[derive(Debug, Serialize)]
pub struct ConvoRecord<'a> {
    pub source: &'a str,
    pub kind: &'static str,
    pub name: &'a str,
    pub conversation: &'a [ConvoStep],
}

/// Discover all CSV files in a directory.
pub fn discover_csv_files(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "csv"))
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

/// Compile a single CSV file.
pub fn compile_file<C>(csv_path: &Path, caps: &C, script_type: ScriptType) -> Result<FileResult>
where
    C: CapabilityLookup,
{
    let data = std::fs::read(csv_path)?;
    let compiler = CsvCompiler::new(caps);
    compiler.validate()?;

    let mut context = ScriptContext::default();
    let convos = compiler.compile(&data, script_type, &mut context)?;
    debug!("Compiled {} conversations from {:?}", convos.len(), csv_path);

    Ok(FileResult {
        context,
        source_path: csv_path.to_string_lossy().to_string(),
    })
}

/// Compile all CSV files under `csv_root` in parallel.
///
/// Failing files are logged and skipped. The capabilities must be `Sync` to
/// be shared across threads.
pub fn compile_all_files<C>(
    csv_root: &Path,
    caps: &C,
    script_type: ScriptType,
) -> Result<Vec<FileResult>>
where
    C: CapabilityLookup + Sync,
{
    let csv_files = discover_csv_files(csv_root);

    if csv_files.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("No CSV files found under {:?}", csv_root),
        )
        .into());
    }

    let total_files = csv_files.len();
    let processed_count = AtomicUsize::new(0);
    let error_count = AtomicUsize::new(0);

    let results: Vec<FileResult> = csv_files
        .into_par_iter()
        .filter_map(|csv_path| {
            let result = compile_file(&csv_path, caps, script_type);
            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

            match result {
                Ok(file_result) => {
                    if count % 100 == 0 || count == total_files {
                        info!("Compiled {}/{} files...", count, total_files);
                    }
                    Some(file_result)
                }
                Err(e) => {
                    error_count.fetch_add(1, Ordering::Relaxed);
                    warn!("Error compiling {:?}: {}", csv_path, e);
                    None
                }
            }
        })
        .collect();

    let errors = error_count.load(Ordering::Relaxed);
    if errors > 0 {
        warn!("{} files failed to compile", errors);
    }

    Ok(results)
}

fn write_records<W: Write>(
    out: &mut W,
    source: &str,
    kind: &'static str,
    convos: &[Convo],
    summary: &mut PipelineResult,
) -> Result<()> {
    for convo in convos {
        let record = ConvoRecord {
            source,
            kind,
            name: &convo.name,
            conversation: &convo.conversation,
        };
        let json_line = serde_json::to_string(&record)
            .map_err(|e| CompileError::Io(std::io::Error::other(e)))?;
        writeln!(out, "{}", json_line)?;
        summary.total_steps += convo.conversation.len();
    }
    Ok(())
}

/// Write conversations as JSON lines to `out`.
pub fn write_jsonl<W: Write>(file_results: &[FileResult], out: &mut W) -> Result<PipelineResult> {
    let mut summary = PipelineResult {
        total_files: file_results.len(),
        ..Default::default()
    };

    for file in file_results {
        write_records(out, &file.source_path, "convo", &file.context.convos, &mut summary)?;
        write_records(
            out,
            &file.source_path,
            "partial_convo",
            &file.context.partial_convos,
            &mut summary,
        )?;
        summary.total_conversations += file.context.convos.len();
        summary.partial_conversations += file.context.partial_convos.len();
    }

    Ok(summary)
}

/// Write conversations to a JSONL file, creating parent directories.
pub fn write_jsonl_output(file_results: &[FileResult], output_path: &Path) -> Result<PipelineResult> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(output_path)?);
    let summary = write_jsonl(file_results, &mut out)?;
    out.flush()?;
    Ok(summary)
}
