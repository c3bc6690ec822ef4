use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{Entity, Relationship};

/// Alias of the base entity's table.
pub const BASE_ALIAS: &str = "BASE";

const MAX_ALIAS_CANDIDATES: usize = 100;

// Two-letter words an alias must not collide with.
const RESERVED: &[&str] = &[
    "AS", "AT", "BY", "DO", "GO", "IF", "IN", "IS", "NO", "OF", "ON", "OR", "TO", "ALL", "AND",
    "ANY", "ASC", "END", "FOR", "KEY", "NOT", "SET", "TOP",
];

/// A relationship hop reached while resolving a path.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedHop<'m> {
    pub source: &'m Entity,
    pub relationship: &'m Relationship,
    pub destination: &'m Entity,
}

/// Relationship path bookkeeping for one expression.
#[derive(Debug, Default)]
pub(crate) struct AliasTable<'m> {
    path_to_alias: BTreeMap<String, String>,
    path_to_hop: HashMap<String, ResolvedHop<'m>>,
    // Key-path prefix as written (may use flattened names) to its expanded path.
    prefix_to_path: HashMap<String, (String, &'m Entity)>,
    used: HashSet<String>,
    fallback_counter: usize,
}

impl<'m> AliasTable<'m> {
    pub(crate) fn new() -> Self {
        let mut table = Self::default();
        table
            .path_to_alias
            .insert(String::new(), BASE_ALIAS.to_string());
        table.used.insert(BASE_ALIAS.to_string());
        table
    }

    pub(crate) fn aliases(&self) -> &BTreeMap<String, String> {
        &self.path_to_alias
    }

    pub(crate) fn hop(&self, path: &str) -> Option<&ResolvedHop<'m>> {
        self.path_to_hop.get(path)
    }

    pub(crate) fn insert_hop(&mut self, path: &str, hop: ResolvedHop<'m>) {
        self.path_to_hop.entry(path.to_string()).or_insert(hop);
    }

    pub(crate) fn cached_prefix(&self, prefix: &str) -> Option<&(String, &'m Entity)> {
        self.prefix_to_path.get(prefix)
    }

    pub(crate) fn cache_prefix(&mut self, prefix: &str, path: String, destination: &'m Entity) {
        self.prefix_to_path
            .insert(prefix.to_string(), (path, destination));
    }

    /// Relationship paths other than the base, parents before children.
    pub(crate) fn joined_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .path_to_alias
            .keys()
            .map(String::as_str)
            .filter(|p| !p.is_empty() && self.path_to_hop.contains_key(*p))
            .collect();
        paths.sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));
        paths
    }

    pub(crate) fn alias_for_path(&mut self, path: &str) -> String {
        if let Some(alias) = self.path_to_alias.get(path) {
            return alias.clone();
        }
        let hop_name = path.rsplit('.').next().unwrap_or(path);
        let alias = self.allocate(&initials(hop_name));
        self.path_to_alias.insert(path.to_string(), alias.clone());
        alias
    }

    fn allocate(&mut self, stem: &str) -> String {
        if !stem.is_empty() && self.is_free(stem) {
            return self.claim(stem.to_string());
        }
        let stem = if stem.is_empty() { "T" } else { stem };
        for i in 0..MAX_ALIAS_CANDIDATES {
            let candidate = format!("{stem}{i}");
            if self.is_free(&candidate) {
                return self.claim(candidate);
            }
        }
        tracing::warn!(stem, "alias candidates exhausted; using sequential alias");
        loop {
            let candidate = format!("T{}", self.fallback_counter);
            self.fallback_counter += 1;
            if self.is_free(&candidate) {
                return self.claim(candidate);
            }
        }
    }

    fn is_free(&self, candidate: &str) -> bool {
        !self.used.contains(candidate) && !RESERVED.contains(&candidate)
    }

    fn claim(&mut self, alias: String) -> String {
        self.used.insert(alias.clone());
        alias
    }
}

pub(crate) fn depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('.').count()
    }
}

pub(crate) fn parent_path(path: &str) -> &str {
    path.rsplit_once('.').map_or("", |(parent, _)| parent)
}

/// `toProjectManager` -> `PM`, `roles` -> `R`.
fn initials(hop_name: &str) -> String {
    let trimmed = match hop_name.strip_prefix("to") {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()) => rest,
        _ => hop_name,
    };
    let mut letters = String::new();
    for (i, c) in trimmed.chars().enumerate() {
        if !c.is_ascii_alphabetic() {
            continue;
        }
        if i == 0 || c.is_ascii_uppercase() {
            letters.push(c.to_ascii_uppercase());
        }
    }
    letters
}
