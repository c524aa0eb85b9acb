//! `search`: case-insensitive match over locations and metadata values.

use super::list::summaries_table;
use super::{CommandContext, CommandKind, Reply};
use crate::errors::Result;
use crate::vault::EntrySummary;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    if args.is_empty() {
        return Err(CommandKind::Search.usage_error());
    }
    let query = args.join(" ");

    let hits: Vec<EntrySummary> = ctx
        .vault
        .search(&query)
        .into_iter()
        .map(EntrySummary::from)
        .collect();

    if hits.is_empty() {
        return Ok(Reply::message(format!("No locations match '{query}'.")));
    }

    Ok(Reply::message(format!(
        "{}\n{} match(es) for '{query}'",
        summaries_table(&hits),
        hits.len()
    )))
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn matches_location_and_metadata() {
        let mut h = Harness::new();
        let meta = BTreeMap::from([("username".to_string(), "Alice".to_string())]);
        h.vault.add("bank", "1", meta).unwrap();
        h.vault.add("mail", "2", BTreeMap::new()).unwrap();

        let text = h.text(CommandKind::Search, &["alice"]);
        assert!(text.contains("bank"));
        assert!(!text.contains("mail"));

        let text = h.text(CommandKind::Search, &["MAI"]);
        assert!(text.contains("mail"));
    }

    #[test]
    fn hits_are_listed_by_location() {
        let mut h = Harness::new();
        let meta = BTreeMap::from([("note".to_string(), "shared with Team".to_string())]);
        h.vault.add("zoo-team", "1", BTreeMap::new()).unwrap();
        h.vault.add("mail", "2", meta).unwrap();
        h.vault.add("alpha-team", "3", BTreeMap::new()).unwrap();

        let text = h.text(CommandKind::Search, &["team"]);
        let alpha = text.find("alpha-team").unwrap();
        let mail = text.find("mail").unwrap();
        let zoo = text.find("zoo-team").unwrap();
        assert!(alpha < mail && mail < zoo);
        assert!(text.contains("3 match(es)"));
    }

    #[test]
    fn no_hits() {
        let mut h = Harness::new();
        assert!(h.text(CommandKind::Search, &["zzz"]).contains("No locations match"));
    }

    #[test]
    fn needs_a_query() {
        let mut h = Harness::new();
        assert!(h.run(CommandKind::Search, &[]).is_err());
    }
}
