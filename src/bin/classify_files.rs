//! Classify local files from the command line.
//!
//! Reads the given files (walking directories when `--recursive` is set), applies the same
//! extension allow-list as the HTTP surface, and prints `{ "results": { ... } }` JSON to stdout.
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use rustyclassify::{
    api::{SKIPPED_RESULT, allowed_file},
    classification::{ClassificationService, FileUpload, RenderedResults},
    config,
    logging::{self, LogTarget},
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "classify-files",
    about = "Classify local documents into the configured categories"
)]
struct Cli {
    /// Files or directories to classify.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Descend into sub-directories of directory arguments.
    #[arg(long, short)]
    recursive: bool,
    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing_for(LogTarget::Cli);
    let config = config::get_config();

    let files = collect_files(&cli.paths, cli.recursive)?;
    if files.len() > config.max_files_per_request {
        bail!(
            "Too many files. Maximum allowed is {}",
            config.max_files_per_request
        );
    }

    let mut uploads = Vec::new();
    let mut skipped = Vec::new();
    for LocalFile { path, name } in files {
        if !allowed_file(&name, &config.allowed_extensions) {
            skipped.push(name);
            continue;
        }
        let bytes =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        uploads.push(FileUpload::new(name, bytes));
    }
    if uploads.is_empty() {
        bail!("No valid files to classify");
    }

    let service = ClassificationService::new(config);
    let classified = service.classify_uploads(uploads).await;
    let mut results: BTreeMap<String, String> =
        RenderedResults::new(&classified, service.settings().categories.unknown_label())
            .into_strings();
    for filename in skipped {
        results.insert(filename, SKIPPED_RESULT.to_string());
    }

    let report = serde_json::json!({ "results": results });
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("failed to serialize results")?;
    println!("{rendered}");
    Ok(())
}

/// A local file and the name it is reported under.
#[derive(Debug)]
struct LocalFile {
    path: PathBuf,
    name: String,
}

/// Gather files from the arguments, naming directory entries relative to their argument.
///
/// Fails when two files would be reported under the same name.
fn collect_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<LocalFile>> {
    let mut files = Vec::new();
    let mut names = HashSet::new();
    let mut push = |path: PathBuf, name: String| -> Result<()> {
        if !names.insert(name.clone()) {
            bail!(
                "{} collides with another input named {name}",
                path.display()
            );
        }
        files.push(LocalFile { path, name });
        Ok(())
    };

    for path in paths {
        let metadata =
            fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
        if metadata.is_file() {
            push(path.clone(), display_name(path))?;
            continue;
        }
        let max_depth = if recursive { usize::MAX } else { 1 };
        for entry in WalkDir::new(path).max_depth(max_depth).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() {
                let name = relative_name(path, entry.path());
                push(entry.into_path(), name)?;
            }
        }
    }
    Ok(files)
}

/// Bare file name, as an upload would carry it.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `/`-separated path of `path` below `root`.
fn relative_name(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => display_name(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(&path, b"content").expect("write file");
        path
    }

    fn names(files: &[LocalFile]) -> Vec<&str> {
        files.iter().map(|file| file.name.as_str()).collect()
    }

    #[test]
    fn same_basename_in_two_directories_stays_distinct() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(dir.path(), "a/invoice.txt");
        write(dir.path(), "b/invoice.txt");

        let files = collect_files(&[dir.path().to_path_buf()], true).expect("collect");

        assert_eq!(names(&files), vec!["a/invoice.txt", "b/invoice.txt"]);
    }

    #[test]
    fn non_recursive_walk_only_reads_top_level_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(dir.path(), "top.pdf");
        write(dir.path(), "nested/inner.pdf");

        let files = collect_files(&[dir.path().to_path_buf()], false).expect("collect");

        assert_eq!(names(&files), vec!["top.pdf"]);
    }

    #[test]
    fn file_arguments_sharing_a_name_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = write(dir.path(), "a/invoice.txt");
        let second = write(dir.path(), "b/invoice.txt");

        let error = collect_files(&[first, second], false).expect_err("collision");

        assert!(error.to_string().contains("invoice.txt"), "{error}");
    }
}
