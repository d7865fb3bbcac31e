// src/project/assemble.rs
//! Routing raw entries into client portfolios.

use super::client::Client;
use crate::error::{Result, UnicityError};
use crate::fuzzy;
use crate::lang::{extension, ParserRegistry};
use crate::parse;
use crate::roster::Roster;
use crate::source::RawEntry;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;

/// Everything routing needs besides the entries themselves.
pub(crate) struct Router<'a> {
    pub expected: &'a [String],
    pub ignore: &'a [String],
    pub roster: Option<&'a Roster>,
    pub threshold: u8,
    pub parsers: &'a ParserRegistry,
}

/// A file that won a slot, parsed once routing is done.
struct Claim {
    score: u8,
    entry: RawEntry,
}

/// Builds the sorted client map.
///
/// # Errors
/// Returns `UnknownAuthor` or `UnexpectedFile` on the first entry that
/// cannot be routed.
pub(crate) fn assemble(entries: Vec<RawEntry>, router: &Router) -> Result<BTreeMap<String, Client>> {
    let globs = ignore_globs(router.ignore)?;
    let mut clients: BTreeMap<String, Client> = BTreeMap::new();
    let mut claims: BTreeMap<(String, String), Claim> = BTreeMap::new();
    let seen = entries.len();

    for entry in entries {
        let Some((author, file_name)) = split_author(&entry) else {
            if is_ignored(&entry.raw_name, router, &globs) {
                tracing::debug!(entry = %entry.raw_name, "ignored unattributed entry");
                continue;
            }
            return Err(unexpected(String::new(), &entry.raw_name, router));
        };
        if let Some(roster) = router.roster {
            if !roster.contains(&author) {
                return Err(UnicityError::UnknownAuthor {
                    author,
                    entry: entry.raw_name,
                });
            }
        }
        let client = clients
            .entry(author.clone())
            .or_insert_with(|| Client::new(&author));

        match accept(&file_name, router) {
            Some((slot, score)) => {
                let key = (author.clone(), slot.to_string());
                match claims.get_mut(&key) {
                    Some(held) if score > held.score => {
                        tracing::debug!(client = %author, slot, displaced = %held.entry.raw_name, "better match replaces slot holder");
                        client.extras.push(held.entry.raw_name.clone());
                        *held = Claim { score, entry };
                    }
                    Some(_) => client.extras.push(entry.raw_name),
                    None => {
                        claims.insert(key, Claim { score, entry });
                    }
                }
            }
            None if is_ignored(&file_name, router, &globs) => client.ignored += 1,
            None => return Err(unexpected(author, &entry.raw_name, router)),
        }
    }

    for ((author, slot), claim) in claims {
        let file = parse::build(
            &slot,
            &claim.entry.raw_name,
            &claim.entry.bytes,
            Some(claim.entry.origin),
            router.parsers,
        );
        if let Some(client) = clients.get_mut(&author) {
            client.slot_scores.insert(slot.clone(), claim.score);
            client.files.insert(slot, file);
        }
    }

    if let Some(roster) = router.roster {
        for name in roster.names() {
            clients.entry(name.to_string()).or_insert_with(|| Client::new(name));
        }
    }
    for client in clients.values_mut() {
        if let Some(attrs) = router.roster.and_then(|r| r.attributes(&client.name)) {
            client.attributes.clone_from(attrs);
        }
        client.missing = router
            .expected
            .iter()
            .filter(|e| !client.files.contains_key(*e))
            .cloned()
            .collect();
    }
    tracing::info!(entries = seen, clients = clients.len(), "portfolios assembled");
    Ok(clients)
}

/// Author prefix and the remaining file name. Entries from a nested
/// archive take the author from the archive's name.
pub(crate) fn split_author(entry: &RawEntry) -> Option<(String, String)> {
    if let Some(hint) = &entry.author_hint {
        let stem = hint.rsplit_once('.').map_or(hint.as_str(), |(s, _)| s);
        let author = stem.split_once('_').map_or(stem, |(a, _)| a);
        if author.is_empty() {
            return None;
        }
        let file = entry
            .raw_name
            .strip_prefix(&format!("{author}_"))
            .unwrap_or(&entry.raw_name);
        return Some((author.to_string(), file.to_string()));
    }
    let (author, file) = entry.raw_name.split_once('_')?;
    if author.is_empty() || file.is_empty() {
        return None;
    }
    Some((author.to_string(), file.to_string()))
}

/// Best expected slot if it clears the threshold and shares the extension.
fn accept<'a>(file_name: &str, router: &Router<'a>) -> Option<(&'a str, u8)> {
    let (slot, score) = fuzzy::best_match(file_name, router.expected.iter().map(String::as_str))?;
    let same_ext = match (extension(file_name), extension(slot)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    };
    (score >= router.threshold && same_ext).then_some((slot, score))
}

fn is_ignored(name: &str, router: &Router, globs: &GlobSet) -> bool {
    globs.is_match(name)
        || router
            .ignore
            .iter()
            .any(|pattern| fuzzy::ratio(name, pattern) >= router.threshold)
}

fn ignore_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn unexpected(author: String, raw_name: &str, router: &Router) -> UnicityError {
    let (best, score) = fuzzy::best_match(raw_name, router.expected.iter().map(String::as_str))
        .map_or((String::new(), 0), |(b, s)| (b.to_string(), s));
    UnicityError::UnexpectedFile {
        author,
        entry: raw_name.to_string(),
        best,
        score,
    }
}
