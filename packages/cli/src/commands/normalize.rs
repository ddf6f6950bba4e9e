use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outliner_model::{transform_for_persistence, transform_for_runtime, NoteIdGenerator};
use outliner_schema::Normalizer;
use std::path::PathBuf;

use super::{read_document, write_output};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Input document
    pub input: PathBuf,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Id of the document; fresh note ids avoid it and links keep their persisted form
    #[arg(long)]
    pub doc_id: Option<String>,

    /// Seed for reproducible note ids
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn normalize(args: NormalizeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let doc_id = args.doc_id.or(config.doc_id);
    let document = read_document(&args.input)?;

    let mut generator = match args.seed {
        Some(seed) => NoteIdGenerator::seeded(seed),
        None => NoteIdGenerator::new(),
    };

    let outcome = match &doc_id {
        Some(doc_id) => {
            let runtime = transform_for_runtime(&document, doc_id);
            let mut outcome = Normalizer::new(&mut generator).exclude(doc_id).run(&runtime)?;
            outcome.document = transform_for_persistence(&outcome.document, doc_id);
            outcome
        }
        None => Normalizer::new(&mut generator).run(&document)?,
    };

    // Report on stderr so stdout stays valid JSON.
    for repair in &outcome.repairs {
        let note = repair
            .note_id
            .as_deref()
            .map(|id| format!(" → {id}"))
            .unwrap_or_default();
        eprintln!("  {} [{}] {}{}", "fixed".green(), repair.code, repair.path, note);
    }
    for issue in &outcome.residual {
        eprintln!("  {} {}", "unrepaired".red().bold(), issue);
    }
    eprintln!(
        "{} {} repair(s) in {}",
        "✓".green(),
        outcome.repairs.len(),
        args.input.display()
    );

    write_output(args.output.as_deref(), &outcome.document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::write_output;
    use outliner_model::{collect_links, SerializedDocument, SerializedNode as N};
    use outliner_schema::validate;
    use std::fs;

    fn damaged() -> SerializedDocument {
        let mut linked = N::note(Some("b"), "see ");
        linked.push_child(N::note_link("a", Some("doc-1")));
        SerializedDocument::from_items(vec![
            N::note(None, "no id"),
            N::note(Some("a"), "A"),
            linked,
            N::note(Some("a"), "copy"),
        ])
    }

    fn args(input: PathBuf, output: PathBuf) -> NormalizeArgs {
        NormalizeArgs {
            input,
            output: Some(output),
            doc_id: Some("doc-1".to_string()),
            seed: Some(7),
        }
    }

    #[test]
    fn test_writes_repaired_document() {
        let temp = tempfile::tempdir().unwrap();
        let cwd = temp.path().display().to_string();
        let input = temp.path().join("doc.json");
        let output = temp.path().join("fixed.json");
        write_output(Some(&input), &damaged()).unwrap();
        assert!(!validate(&read_document(&input).unwrap()).is_empty());

        normalize(args(input.clone(), output.clone()), &cwd).unwrap();
        let fixed = read_document(&output).unwrap();
        assert!(validate(&fixed).is_empty());

        let items = fixed.root.children()[0].children();
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|item| item.note_id().is_some()));
        assert_eq!(fixed.root.note_ids().len(), 4);
        assert!(!fixed.root.note_ids().contains("doc-1"));

        // Same-document links keep their persisted form.
        assert_eq!(collect_links(&fixed.root), vec![(None, "a".to_string())]);

        let again = temp.path().join("again.json");
        normalize(args(input, again.clone()), &cwd).unwrap();
        assert_eq!(
            fs::read_to_string(&again).unwrap(),
            fs::read_to_string(&output).unwrap()
        );
    }

    #[test]
    fn test_clean_document_is_unchanged() {
        let temp = tempfile::tempdir().unwrap();
        let cwd = temp.path().display().to_string();
        let input = temp.path().join("doc.json");
        let output = temp.path().join("out.json");
        let clean = SerializedDocument::from_items(vec![N::note(Some("a"), "A")]);
        write_output(Some(&input), &clean).unwrap();

        normalize(args(input.clone(), output.clone()), &cwd).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            fs::read_to_string(&input).unwrap()
        );
    }
}
