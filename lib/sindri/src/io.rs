use crate::error::{PipelineError, Result};
use crate::model::{FinalResult, SourceCounts, WorkItemStore};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `'<token>' => {<source>=<count>, ...}`, one line per token.
    #[default]
    Text,
    /// A single JSON object: token -> source -> count.
    Json,
}

pub fn list_files_recursive(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path.as_ref()).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.as_ref().to_path_buf());
            PipelineError::InputUnavailable { path, source: e.into() }
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Reads every file under `inputs` (files or directories) into a store keyed by file name.
pub fn load_work_items<P: AsRef<Path>>(inputs: &[P]) -> Result<WorkItemStore> {
    let mut store = WorkItemStore::new();
    let mut origins: HashMap<String, PathBuf> = HashMap::new();
    for input in inputs {
        for path in list_files_recursive(input)? {
            let key = source_key(&path);
            if let Some(first) = origins.get(&key) {
                return Err(PipelineError::DuplicateSource { key, first: first.clone(), second: path });
            }
            let content = fs::read_to_string(&path)
                .map_err(|source| PipelineError::InputUnavailable { path: path.clone(), source })?;
            store.insert(key.clone(), content);
            origins.insert(key, path);
        }
    }
    Ok(store)
}

fn source_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn format_entry(token: &str, counts: &SourceCounts) -> String {
    let inner: Vec<String> = counts.iter().map(|(source, n)| format!("{}={}", source, n)).collect();
    format!("'{}' => {{{}}}", token, inner.join(", "))
}

pub fn write_results<W: Write>(writer: &mut W, result: &FinalResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for (token, counts) in result {
                writeln!(writer, "{}", format_entry(token, counts))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, result).map_err(std::io::Error::from)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn open_writer(path: impl AsRef<Path>) -> Result<BufWriter<File>> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(BufWriter::new(file))
}
