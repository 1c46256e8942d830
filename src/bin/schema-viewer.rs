//! Schema Viewer CLI
//!
//! Command-line host for loading, viewing, checking and exporting JSON Schemas.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schema_viewer::{
    check, download_as_file, default_file_name, explorer_rows, list_samples, parse_source,
    render_explorer, serialize, LoadOutcome, LoadSource, SchemaGraph, SessionHandle, Severity,
    ViewMode, ViewerSession,
};
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "schema-viewer")]
#[command(about = "Explore JSON Schema documents as trees, graphs and source")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a schema in one of the three views
    View {
        /// Schema source: file path, URL, sample:<name>, or - for stdin
        source: String,

        /// View mode: explorer (default), graph or source
        #[arg(long, short, default_value = "explorer")]
        mode: String,

        /// Expand every explorer node (default: only the root)
        #[arg(long)]
        expand_all: bool,

        /// Expand the explorer node at this JSON Pointer (repeatable)
        #[arg(long, conflicts_with = "expand_all")]
        expand: Vec<String>,
    },

    /// Write the schema as formatted JSON
    Export {
        /// Schema source: file path, URL, sample:<name>, or - for stdin
        source: String,

        /// Output file or directory (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check a schema for broken references and meta-schema violations
    Check {
        /// Schema source: file path, URL, sample:<name>, or - for stdin
        source: String,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// List bundled sample schemas
    Samples,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::View {
            source,
            mode,
            expand_all,
            expand,
        } => run_view(&source, &mode, expand_all, &expand).await,
        Commands::Export { source, output } => run_export(&source, output).await,
        Commands::Check {
            source,
            format,
            strict,
        } => run_check(&source, &format, strict).await,
        Commands::Samples => {
            run_samples();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Load a source into a fresh session. Errors are reported on stderr.
async fn load(source_arg: &str) -> Result<SessionHandle, u8> {
    let handle = SessionHandle::new(ViewerSession::new());

    let outcome = match parse_source(source_arg) {
        LoadSource::Text => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .map_err(|e| {
                    eprintln!("Error reading stdin: {}", e);
                    3u8
                })?;
            handle.with(|s| s.load_text(&text))
        }
        LoadSource::File(path) => handle.with(|s| s.load_file(&path)),
        LoadSource::Url(url) => load_url(&handle, &url).await?,
        LoadSource::Sample(name) => handle.load_sample(&name).await,
    };

    if let LoadOutcome::Failed(_) = outcome {
        return Err(handle.with(|s| match s.error() {
            Some(e) => {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            }
            None => 2,
        }));
    }

    Ok(handle)
}

#[cfg(feature = "remote")]
async fn load_url(handle: &SessionHandle, url: &str) -> Result<LoadOutcome, u8> {
    let fetcher = schema_viewer::HttpFetcher::new(&schema_viewer::FetchOptions::default())
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    Ok(handle.load_url(&fetcher, url).await)
}

#[cfg(not(feature = "remote"))]
async fn load_url(_handle: &SessionHandle, url: &str) -> Result<LoadOutcome, u8> {
    eprintln!("Error: cannot fetch {}: built without the remote feature", url);
    Err(3)
}

async fn run_view(
    source: &str,
    mode: &str,
    expand_all: bool,
    expand: &[String],
) -> Result<(), u8> {
    let mode = ViewMode::parse(mode).ok_or_else(|| {
        eprintln!(
            "Error: unknown view mode \"{}\": expected explorer, graph or source",
            mode
        );
        2u8
    })?;

    let handle = load(source).await?;

    let output = handle.with(|session| {
        session.set_view_mode(mode);
        if expand_all {
            session.expand_all();
        } else {
            session.expand("");
            for pointer in expand {
                session.expand(pointer);
            }
        }

        if let Some(err) = session.error() {
            eprintln!("Warning: {} (showing source)", err);
        }
        render(session)
    })?;

    print!("{}", output);
    Ok(())
}

fn render(session: &ViewerSession) -> Result<String, u8> {
    let Some(document) = session.document() else {
        eprintln!("Error: no document loaded");
        return Err(2);
    };

    let mode = session.effective_mode();
    let tree = match (mode, session.schema()) {
        (ViewMode::Source, _) => None,
        (_, Some(tree)) => Some(tree),
        (_, None) => {
            eprintln!("Error: schema could not be normalized");
            return Err(2);
        }
    };

    match (mode, tree) {
        (ViewMode::Explorer, Some(tree)) => {
            Ok(render_explorer(&explorer_rows(tree, &session.view().expanded)))
        }
        (ViewMode::Graph, Some(tree)) => Ok(SchemaGraph::from_tree(tree).to_dot()),
        _ => serialize(document.value())
            .map(|text| text + "\n")
            .map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            }),
    }
}

async fn run_export(source: &str, output: Option<PathBuf>) -> Result<(), u8> {
    let handle = load(source).await?;
    let Some(document) = handle.with(|s| s.document().map(|d| d.value().clone())) else {
        eprintln!("Error: no document loaded");
        return Err(2);
    };

    match output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(default_file_name(&document))
            } else {
                path
            };
            let written = download_as_file(&document, &path).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
            eprintln!("Wrote {}", written.display());
        }
        None => {
            let text = serialize(&document).map_err(|e| {
                eprintln!("Error serializing output: {}", e);
                e.exit_code() as u8
            })?;
            println!("{}", text);
        }
    }

    Ok(())
}

async fn run_check(source: &str, format: &str, strict: bool) -> Result<(), u8> {
    let handle = load(source).await?;
    let (document, unreadable) = handle.with(|s| {
        (
            s.document().map(|d| d.value().clone()),
            matches!(s.tree(), Some(Err(_))),
        )
    });
    let Some(document) = document else {
        eprintln!("Error: no document loaded");
        return Err(2);
    };

    let report = check(&document);

    if format == "json" {
        let text = serde_json::to_string_pretty(&report).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", text);
    } else {
        for diag in &report.diagnostics {
            let (color, label) = match diag.severity {
                Severity::Error => ("\x1b[31m", "error"),
                Severity::Warning => ("\x1b[33m", "warning"),
            };
            println!(
                "  {}{}[{}]\x1b[0m: {} - {}",
                color, label, diag.code, diag.path, diag.message
            );
        }
        if report.is_ok() && (!strict || report.warnings == 0) {
            println!("\x1b[32m✓ {} passed\x1b[0m", source);
        } else {
            println!(
                "\x1b[31m✗ {} failed ({} errors, {} warnings)\x1b[0m",
                source, report.errors, report.warnings
            );
        }
    }

    if unreadable {
        Err(2)
    } else if report.is_ok() && (!strict || report.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_samples() {
    for sample in list_samples() {
        println!("{:<10} {}", sample.name, sample.summary);
    }
}
