pub mod check;
pub mod init;
pub mod keys;
pub mod links;
pub mod normalize;
pub mod outline;
pub mod probe;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use keys::{keys, KeysArgs};
pub use links::{hydrate, persist, LinkArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use outline::{outline, OutlineArgs};
pub use probe::{probe, ProbeArgs};

use anyhow::{Context, Result};
use outliner_model::SerializedDocument;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub(crate) fn read_document(path: &Path) -> Result<SerializedDocument> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    SerializedDocument::from_json_str(&source)
        .with_context(|| format!("Not an outline document: {}", path.display()))
}

/// Write pretty JSON to `output`, or stdout
pub(crate) fn write_output(output: Option<&Path>, document: &SerializedDocument) -> Result<()> {
    let json = document.to_json_string_pretty()?;
    match output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub(crate) fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == "json"))
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name != crate::config::DEFAULT_CONFIG_NAME)
        })
        .collect();
    files.sort();
    files
}
