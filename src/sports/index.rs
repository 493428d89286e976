//! Country/league index construction.
//!
//! Adapters feed every fixture's country and league through an
//! `IndexBuilder`; the country id it hands back is the join key between
//! fixtures and the snapshot's indexes.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Country, SnapshotIndexes};

/// Country used when the upstream gives none (international fixtures).
pub const DEFAULT_COUNTRY: &str = "World";

/// Country id: lowercased name with whitespace runs replaced by hyphens.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Default)]
pub struct IndexBuilder {
    countries: BTreeMap<String, Country>,
    leagues: BTreeMap<String, BTreeSet<String>>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fixture's country and league; returns
    /// `(country display name, country id)`.
    ///
    /// The first display name and first non-empty flag seen for an id win.
    pub fn observe(
        &mut self,
        country: Option<&str>,
        flag: Option<&str>,
        league: &str,
    ) -> (String, String) {
        let name = country
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COUNTRY);
        let id = slugify(name);

        let entry = self.countries.entry(id.clone()).or_insert_with(|| Country {
            id: id.clone(),
            name: name.to_string(),
            flag: None,
        });
        if entry.flag.is_none() {
            entry.flag = flag.filter(|f| !f.is_empty()).map(str::to_string);
        }

        self.leagues
            .entry(id.clone())
            .or_default()
            .insert(league.to_string());

        (entry.name.clone(), id)
    }

    pub fn build(self) -> SnapshotIndexes {
        let mut countries: Vec<Country> = self.countries.into_values().collect();
        countries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let leagues = self
            .leagues
            .into_iter()
            .map(|(id, names)| (id, names.into_iter().collect()))
            .collect();

        SnapshotIndexes { countries, leagues }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("England"), "england");
        assert_eq!(slugify("South  Korea"), "south-korea");
        assert_eq!(slugify("Bosnia and Herzegovina"), "bosnia-and-herzegovina");
        assert_eq!(slugify("Côte d'Ivoire"), "côte-d'ivoire");
    }

    #[test]
    fn test_slugify_is_deterministic() {
        let names = ["USA", "Czech Republic", "FRANCE", "  Saudi Arabia "];
        for name in names {
            assert_eq!(slugify(name), slugify(name));
        }
        assert_eq!(slugify("FRANCE"), slugify("France"));
    }

    #[test]
    fn test_same_country_collapses_to_one_entry() {
        let mut b = IndexBuilder::new();
        let (_, id1) = b.observe(Some("Spain"), None, "La Liga");
        let (_, id2) = b.observe(Some("Spain"), Some("https://flags/es.svg"), "Segunda");
        let (_, id3) = b.observe(Some("Spain"), None, "La Liga");
        assert_eq!(id1, id2);
        assert_eq!(id2, id3);

        let idx = b.build();
        assert_eq!(idx.countries.len(), 1);
        assert_eq!(idx.countries[0].flag.as_deref(), Some("https://flags/es.svg"));
        assert_eq!(idx.leagues["spain"], vec!["La Liga", "Segunda"]);
    }

    #[test]
    fn test_sorted_output() {
        let mut b = IndexBuilder::new();
        b.observe(Some("Italy"), None, "Serie B");
        b.observe(Some("England"), None, "Premier League");
        b.observe(Some("Italy"), None, "Serie A");
        b.observe(Some("England"), None, "Championship");

        let idx = b.build();
        let names: Vec<&str> = idx.countries.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["England", "Italy"]);
        assert_eq!(idx.leagues["italy"], vec!["Serie A", "Serie B"]);
        assert_eq!(idx.leagues["england"], vec!["Championship", "Premier League"]);
    }

    #[test]
    fn test_missing_country_defaults_to_world() {
        let mut b = IndexBuilder::new();
        let (name, id) = b.observe(None, None, "Friendlies");
        assert_eq!(name, "World");
        assert_eq!(id, "world");
        let (_, id2) = b.observe(Some("   "), None, "Friendlies");
        assert_eq!(id2, "world");
    }
}
