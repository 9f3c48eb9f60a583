//! Snare route file checker
//!
//! Loads declarative route files and registers every route on a scratch mock
//! instance, reporting the routes that would fail to register.
//!
//! Usage:
//!   snare-check <file>... [--strict] [--output text|json]

use clap::Parser;
use serde_json::json;
use snare::config::{RouteFile, RouteIssue};
use std::path::PathBuf;
use tracing::debug;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Snare route file checker
#[derive(Parser, Debug)]
#[command(name = "snare-check")]
#[command(author, version, about = "Validate Snare route files before tests load them")]
struct Args {
    /// Route files (YAML or JSON)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format: text (default), json
    #[arg(short, long, default_value = "text", env = "SNARE_CHECK_OUTPUT")]
    output: String,

    /// Strict mode - treat warnings as errors
    #[arg(short, long)]
    strict: bool,
}

/// Outcome for one file.
struct FileReport {
    path: PathBuf,
    routes: usize,
    load_error: Option<String>,
    issues: Vec<RouteIssue>,
    warnings: Vec<String>,
}

impl FileReport {
    fn errors(&self) -> usize {
        self.issues.len() + usize::from(self.load_error.is_some())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let reports: Vec<FileReport> = args.files.iter().map(check_file).collect();

    if args.output == "json" {
        print_json(&reports)?;
    } else {
        print_text(&reports);
    }

    std::process::exit(exit_code(&reports, args.strict));
}

/// 1 on any error, or on any warning in strict mode.
fn exit_code(reports: &[FileReport], strict: bool) -> i32 {
    let errors: usize = reports.iter().map(FileReport::errors).sum();
    let warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();
    if errors > 0 || (strict && warnings > 0) {
        1
    } else {
        0
    }
}

fn check_file(path: &PathBuf) -> FileReport {
    debug!("Checking {}", path.display());
    report(path.clone(), RouteFile::from_file(path))
}

fn report(path: PathBuf, loaded: anyhow::Result<RouteFile>) -> FileReport {
    match loaded {
        Ok(file) => FileReport {
            path,
            routes: file.routes.len(),
            load_error: None,
            issues: file.check(),
            warnings: warnings(&file),
        },
        Err(e) => FileReport {
            path,
            routes: 0,
            load_error: Some(format!("{e:#}")),
            issues: Vec::new(),
            warnings: Vec::new(),
        },
    }
}

/// Suspicious but registrable content.
fn warnings(file: &RouteFile) -> Vec<String> {
    let mut warnings = Vec::new();
    if file.routes.is_empty() {
        warnings.push("file declares no routes".to_string());
    }
    for (index, route) in file.routes.iter().enumerate() {
        if route.pass_through == Some(true)
            && (route.body.is_some() || route.status.is_some() || route.content_type.is_some())
        {
            warnings.push(format!(
                "route {index}: response fields are ignored on a pass-through route"
            ));
        }
    }
    warnings
}

fn print_text(reports: &[FileReport]) {
    println!("{BOLD}{CYAN}Snare Route Check{RESET}");
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");

    for report in reports {
        println!("\n{BOLD}{}{RESET} {DIM}({} routes){RESET}", report.path.display(), report.routes);
        if let Some(error) = &report.load_error {
            println!("  {RED}✗ error{RESET} {error}");
        }
        for issue in &report.issues {
            println!(
                "  {RED}✗ route {}{RESET} {DIM}{}{RESET}: {}",
                issue.index, issue.route, issue.error
            );
        }
        for warning in &report.warnings {
            println!("  {YELLOW}⚠ warning{RESET} {warning}");
        }
        if report.errors() == 0 && report.warnings.is_empty() {
            println!("  {GREEN}✓ ok{RESET}");
        }
    }

    let errors: usize = reports.iter().map(FileReport::errors).sum();
    let warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");
    let color = if errors > 0 { RED } else { GREEN };
    println!(
        "{BOLD}Files:{RESET} {}  {BOLD}Errors:{RESET} {color}{errors}{RESET}  {BOLD}Warnings:{RESET} {YELLOW}{warnings}{RESET}",
        reports.len()
    );
}

fn print_json(reports: &[FileReport]) -> anyhow::Result<()> {
    let files: Vec<_> = reports
        .iter()
        .map(|report| {
            json!({
                "path": report.path.display().to_string(),
                "routes": report.routes,
                "loadError": report.load_error,
                "issues": report.issues.iter().map(|issue| json!({
                    "index": issue.index,
                    "route": issue.route,
                    "error": issue.error.to_string(),
                })).collect::<Vec<_>>(),
                "warnings": report.warnings,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json!({ "files": files }))?);
    Ok(())
}
