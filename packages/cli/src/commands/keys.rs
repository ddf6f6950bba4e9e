use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outliner_editor::Keymap;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct KeysArgs {
    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Print the effective key bindings
pub fn keys(args: KeysArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let keymap = Keymap::with_overrides(&config.keymap)?;
    let bindings = keymap.bindings();

    if args.format == "json" {
        let map: serde_json::Map<String, serde_json::Value> = bindings
            .iter()
            .map(|(chord, command)| -> Result<(String, serde_json::Value)> {
                Ok((chord.to_string(), serde_json::to_value(command)?))
            })
            .collect::<Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    for (chord, command) in bindings {
        let overridden = config.keymap.keys().any(|text| {
            outliner_editor::KeyChord::parse(text).is_ok_and(|parsed| parsed == chord)
        });
        let command = serde_json::to_value(command)?;
        let command = command.as_str().unwrap_or_default().to_string();
        if overridden {
            println!("  {:<20} {} {}", chord.to_string().bright_white(), command, "(config)".dimmed());
        } else {
            println!("  {:<20} {}", chord.to_string().bright_white(), command);
        }
    }
    Ok(())
}
