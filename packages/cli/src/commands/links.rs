use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outliner_model::{
    collect_links, transform_for_persistence, transform_for_runtime, SerializedDocument,
};
use std::path::{Path, PathBuf};

use super::{read_document, write_output};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Input document
    pub input: PathBuf,

    /// Id of the document the file holds
    #[arg(long)]
    pub doc_id: Option<String>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Strip `docId` from links into the same document
pub fn persist(args: LinkArgs, cwd: &str) -> Result<()> {
    let doc_id = Config::load(cwd)?.resolve_doc_id(args.doc_id)?;
    let document = read_document(&args.input)?;
    let persisted = transform_for_persistence(&document, &doc_id);
    report(&document, &persisted, &args.input);
    write_output(args.output.as_deref(), &persisted)
}

/// Give every link without a `docId` the document's id
pub fn hydrate(args: LinkArgs, cwd: &str) -> Result<()> {
    let doc_id = Config::load(cwd)?.resolve_doc_id(args.doc_id)?;
    let document = read_document(&args.input)?;
    let runtime = transform_for_runtime(&document, &doc_id);
    report(&document, &runtime, &args.input);
    write_output(args.output.as_deref(), &runtime)
}

/// Number of links whose `docId` differs between the two forms
fn rewritten_links(before: &SerializedDocument, after: &SerializedDocument) -> usize {
    collect_links(&before.root)
        .iter()
        .zip(&collect_links(&after.root))
        .filter(|(before, after)| before.0 != after.0)
        .count()
}

// On stderr so stdout stays valid JSON.
fn report(before: &SerializedDocument, after: &SerializedDocument, input: &Path) {
    eprintln!(
        "{} {} link(s) rewritten in {}",
        "✓".green(),
        rewritten_links(before, after),
        input.display()
    );
}
