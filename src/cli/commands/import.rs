//! `import`: bulk-load secrets from a file.
//!
//! Supported formats:
//! - `.env`-style `location=secret` lines (default)
//! - JSON object of `location → secret` (by `.json` extension or `json`)
//!
//! New locations are added, existing ones get their secret replaced.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use super::{env_parser, expect_args, CommandContext, CommandKind, Reply};
use crate::errors::{CaskError, Result};
use crate::vault::validate_location;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Import, args, 1, 2)?;
    let source = Path::new(&args[0]);

    if !source.exists() {
        return Err(CaskError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    let format = match args.get(1) {
        Some(f) => f.as_str(),
        None => detect_format(source),
    };

    let content = Zeroizing::new(
        fs::read_to_string(source)
            .map_err(|e| CaskError::CommandFailed(format!("failed to read file: {e}")))?,
    );

    let pairs = match format {
        "env" => env_parser::parse(&content)?,
        "json" => parse_json(&content)?,
        other => {
            return Err(CaskError::CommandFailed(format!(
                "unknown import format '{other}' — use 'env' or 'json'"
            )));
        }
    };

    if pairs.is_empty() {
        return Ok(Reply::message("No secrets found in the import file."));
    }

    // Validate everything first so a bad name doesn't leave a half import.
    for location in pairs.keys() {
        validate_location(location)?;
    }

    let (mut added, mut updated) = (0, 0);
    for (location, secret) in &pairs {
        if ctx.vault.get(location).is_ok() {
            ctx.vault.edit(location, secret)?;
            updated += 1;
        } else {
            ctx.vault.add(location, secret, BTreeMap::new())?;
            added += 1;
        }
    }

    tracing::info!(added, updated, source = %source.display(), "import finished");

    Ok(Reply::message(format!(
        "Imported {} secret(s) from {}: {added} added, {updated} updated",
        pairs.len(),
        source.display()
    )))
}

/// Detect the file format from its extension.
fn detect_format(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "json",
        _ => "env",
    }
}

/// Parse a JSON object; non-string values are stored as their JSON text.
fn parse_json(content: &str) -> Result<BTreeMap<String, Zeroizing<String>>> {
    let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| CaskError::CommandFailed(format!("invalid JSON: {e}")))?;

    Ok(map
        .into_iter()
        .map(|(location, value)| {
            let secret = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (location, Zeroizing::new(secret))
        })
        .collect())
}
