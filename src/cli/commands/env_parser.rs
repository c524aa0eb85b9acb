//! Parsing of `.env`-style `location=secret` files for `import`.

use std::collections::BTreeMap;

use zeroize::Zeroizing;

use crate::errors::{CaskError, Result};

/// Parse a single line into a (location, secret) pair.
///
/// Returns `Ok(None)` for blank lines and comments.  Handles an optional
/// `export` prefix, surrounding single/double quotes and secrets that
/// themselves contain `=`.
pub fn parse_line(line: &str) -> Result<Option<(&str, &str)>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);

    let (location, secret) = trimmed
        .split_once('=')
        .ok_or_else(|| CaskError::CommandFailed("expected `location=secret`".into()))?;
    let location = location.trim();
    let secret = secret.trim();

    if location.is_empty() {
        return Err(CaskError::CommandFailed("missing location before `=`".into()));
    }

    let secret = secret
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| secret.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(secret);

    Ok(Some((location, secret)))
}

/// Parse a whole file's contents.  A later line for the same location
/// replaces an earlier one.
pub fn parse(content: &str) -> Result<BTreeMap<String, Zeroizing<String>>> {
    let mut pairs = BTreeMap::new();

    for (n, line) in content.lines().enumerate() {
        let parsed = parse_line(line).map_err(|e| match e {
            CaskError::CommandFailed(reason) => {
                CaskError::CommandFailed(format!("line {}: {reason}", n + 1))
            }
            other => other,
        })?;
        if let Some((location, secret)) = parsed {
            pairs.insert(location.to_string(), Zeroizing::new(secret.to_string()));
        }
    }

    Ok(pairs)
}
