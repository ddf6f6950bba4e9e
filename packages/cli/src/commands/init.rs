use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outliner_model::{NoteIdGenerator, SerializedDocument, SerializedNode};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Document id to record in the config
    #[arg(long, default_value = "outline")]
    pub doc_id: String,

    /// Directory for local replica caches
    #[arg(long)]
    pub persistence_dir: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing outline...".bright_blue().bold());

    // Create a starter document if it doesn't exist
    let document_name = format!("{}.json", args.doc_id);
    let document_path = PathBuf::from(cwd).join(&document_name);
    if !document_path.exists() {
        let mut generator = NoteIdGenerator::new();
        let mut taken: HashSet<String> = HashSet::from([args.doc_id.clone()]);
        let mut note = |text: &str| {
            let id = generator.create_note_id(&taken);
            taken.insert(id.clone());
            SerializedNode::note(Some(&id), text)
        };
        let document = SerializedDocument::from_items(vec![
            note("Welcome"),
            SerializedNode::wrapper(vec![note("Press Tab to indent a note")]),
            note("Shift+ArrowDown selects whole notes"),
        ]);
        fs::write(&document_path, document.to_json_string_pretty()?)?;
        println!("  {} Created {}", "✓".green(), document_name);
    }

    let config = Config {
        doc_id: Some(args.doc_id.clone()),
        persistence_dir: args.persistence_dir,
        ..Config::default()
    };

    // Write config file
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Outline initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: outliner check {}", document_name);
    println!("  2. Run: outliner outline {} --caret <noteId> --keys Tab", document_name);

    Ok(())
}
