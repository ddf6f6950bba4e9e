use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use outliner_editor::{Document, EditSession, KeyChord, NodeKey, Outline};
use outliner_model::{CheckState, NoteIdGenerator};
use std::collections::HashSet;
use std::path::PathBuf;

use super::{read_document, write_output};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct OutlineArgs {
    /// Input document
    pub input: PathBuf,

    /// Id of the document (defaults to config, then the file stem)
    #[arg(long)]
    pub doc_id: Option<String>,

    /// Place the caret before replaying keys: `noteId` or `noteId:offset`
    #[arg(long)]
    pub caret: Option<String>,

    /// Comma-separated key chords to replay, e.g. `Shift+ArrowDown,Tab`
    #[arg(long, value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Also print the children of folded notes
    #[arg(short, long)]
    pub all: bool,

    /// Write the edited document here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed for reproducible note ids
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn outline(args: OutlineArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let doc_id = match args.doc_id.or_else(|| config.doc_id.clone()) {
        Some(doc_id) => doc_id,
        None => args
            .input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Cannot derive a document id from {}", args.input.display()))?,
    };

    let session_config = config.session_config();
    let generator = match args.seed {
        Some(seed) => NoteIdGenerator::seeded(seed),
        None => NoteIdGenerator::new(),
    };
    let document = Document::from_persisted(
        &read_document(&args.input)?,
        &doc_id,
        session_config.document_options(),
        generator,
    )?;
    if !document.load_repairs().is_empty() {
        eprintln!(
            "{} repaired {} issue(s) while loading",
            "⚠️".yellow(),
            document.load_repairs().len()
        );
    }

    let mut session = EditSession::new("cli", document, &session_config)?;
    if let Some(caret) = &args.caret {
        let (note_id, offset) = match caret.split_once(':') {
            Some((note_id, offset)) => (note_id, offset.parse::<usize>()?),
            None => (caret.as_str(), 0),
        };
        session.set_caret(note_id, offset)?;
    }
    for chord in &args.keys {
        let chord = KeyChord::parse(chord.trim())?;
        match session.handle_key(chord)? {
            Some(command) => tracing::info!(%chord, ?command, "replayed key"),
            None => eprintln!("{} {} is not bound", "⚠️".yellow(), chord),
        }
    }

    let selected: HashSet<NodeKey> = session.selection().heads().iter().copied().collect();
    let caret = session
        .selection()
        .range()
        .and_then(|range| session.outline().content_owner(range.focus.item));
    print_outline(session.outline(), &selected, caret, args.all);

    if let Some(output) = &args.output {
        write_output(Some(output), &session.document().to_persisted_document())?;
        println!("  {} Wrote {}", "✓".green(), output.display());
    }
    Ok(())
}

fn print_outline(outline: &Outline, selected: &HashSet<NodeKey>, caret: Option<NodeKey>, all: bool) {
    let mut stack: Vec<(NodeKey, usize)> = outline
        .top_level_items()
        .into_iter()
        .rev()
        .map(|item| (item, 0))
        .collect();

    while let Some((item, depth)) = stack.pop() {
        let children = outline.logical_children(item);
        let folded = outline.is_folded(item);
        let bullet = if folded && !children.is_empty() { "▸" } else { "•" };
        let check = match outline.check_state(item) {
            CheckState::Checked => "[x] ",
            CheckState::Unchecked => "[ ] ",
            CheckState::Unset => "",
        };
        let text = outline.text_of(item);
        let line = format!("{}{} {}{}", "  ".repeat(depth), bullet, check, text);
        let id = outline.note_id(item).unwrap_or_default();

        let line = if selected.contains(&item) {
            line.on_blue().to_string()
        } else if Some(item) == caret {
            line.bold().to_string()
        } else {
            line
        };
        println!("{}  {}", line, id.dimmed());

        if !folded || all {
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
    }
}
