use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outliner_schema::{validate, SchemaIssue};
use std::path::{Path, PathBuf};

use super::{find_json_files, read_document};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input document, or a directory of .json documents
    pub input: PathBuf,

    /// List clean files too
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Returns false when any document has issues
pub fn check(args: CheckArgs, _cwd: &str) -> Result<bool> {
    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_json_files(&args.input)
    } else {
        return Err(anyhow::anyhow!(
            "Input path does not exist: {}",
            args.input.display()
        ));
    };

    let json = args.format == "json";
    let mut total_issues = 0;
    let mut reports = Vec::new();
    for file in &files {
        let issues = check_file(file)?;
        total_issues += issues.len();
        if json {
            reports.push(file_report(file, &issues));
        } else {
            print_issues(file, &issues, args.verbose);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(total_issues == 0);
    }

    println!(
        "✨ {} Checked {} file(s)",
        if total_issues > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        },
        files.len()
    );
    if total_issues > 0 {
        println!("   {} {}", "Issues:".red(), total_issues);
    } else {
        println!("   {} No issues found!", "✓".green());
    }

    Ok(total_issues == 0)
}

fn check_file(file: &Path) -> Result<Vec<SchemaIssue>> {
    let document = read_document(file)?;
    Ok(validate(&document))
}

fn file_report(file: &Path, issues: &[SchemaIssue]) -> serde_json::Value {
    serde_json::json!({
        "file": file.display().to_string(),
        "issues": issues,
    })
}

fn print_issues(file: &Path, issues: &[SchemaIssue], verbose: bool) {
    if issues.is_empty() {
        if verbose {
            println!("{} {}", "✓".green(), file.display());
        }
        return;
    }

    println!("{}", file.display());
    for issue in issues {
        println!(
            "  {} [{}] {}",
            "error".red().bold(),
            issue.code,
            issue.message()
        );
        println!("    {} {}", "at".dimmed(), issue.path.to_string().dimmed());
    }
    println!();
}
