//! The shrinking set of cities that may still be named.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    ops::Bound,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{dataset::CityRecord, error::CatalogError};

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("failed to compile whitespace regex"));

/// Normalize a city name for matching: trim, collapse whitespace runs and
/// lower-case. Applying it twice changes nothing.
pub fn normalize(name: &str) -> String {
    WHITESPACE_RE
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

/// Normalized city name, the identity used for lookups and removal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CityName(String);

impl CityName {
    /// Normalize `raw` into a name.
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// The normalized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether nothing was left after normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First character of the normalized name.
    pub fn first_letter(&self) -> Option<char> {
        self.0.chars().next()
    }
}

impl fmt::Display for CityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cities still available in the current session, keyed by normalized name.
///
/// Ordered so that iteration, and therefore the computer's choice, never
/// depends on hashing.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cities: BTreeMap<CityName, CityRecord>,
}

impl Catalog {
    /// Seed a catalog from dataset records. Blank names are skipped and only
    /// the first record of a duplicated name is kept.
    pub fn from_records(records: impl IntoIterator<Item = CityRecord>) -> Self {
        let mut cities = BTreeMap::new();
        for record in records {
            let name = CityName::new(&record.name);
            if name.is_empty() {
                warn!("Skipping dataset record without a name");
                continue;
            }
            if cities.contains_key(&name) {
                warn!(city = %name, "Skipping duplicate dataset record");
                continue;
            }
            cities.insert(name, record);
        }
        Self { cities }
    }

    /// Catalog of bare names, without metadata.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_records(names.into_iter().map(CityRecord::named))
    }

    /// Number of cities still available.
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Whether every city has been used.
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Whether `name` is still available.
    pub fn contains(&self, name: &CityName) -> bool {
        self.cities.contains_key(name)
    }

    /// Record of an available city.
    pub fn get(&self, name: &CityName) -> Option<&CityRecord> {
        self.cities.get(name)
    }

    /// Remove a city for good, returning its record.
    pub fn remove(&mut self, name: &CityName) -> Result<CityRecord, CatalogError> {
        self.cities
            .remove(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    /// Cities whose normalized name starts with `letter`, smallest first.
    pub fn starting_with(
        &self,
        letter: char,
    ) -> impl Iterator<Item = (&CityName, &CityRecord)> + '_ {
        let start = CityName(letter.to_string());
        self.cities
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(move |(name, _)| name.first_letter() == Some(letter))
    }

    /// Distinct first letters of every city in the catalog.
    pub fn first_letters(&self) -> BTreeSet<char> {
        self.cities.keys().filter_map(CityName::first_letter).collect()
    }

    /// Available names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &CityName> + '_ {
        self.cities.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_trims_collapses_and_lowercases() {
        assert_eq!(normalize("  Нижний   Новгород "), "нижний новгород");
        assert_eq!(normalize("МОСКВА"), "москва");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn duplicates_and_blank_names_are_dropped() {
        let catalog = Catalog::from_names(["Москва", "москва ", "  ", "Тверь"]);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(&CityName::new("МОСКВА")));
    }

    #[test]
    fn first_record_wins_for_duplicates() {
        let mut first = CityRecord::named("Тверь");
        first.population = 1;
        let mut second = CityRecord::named("ТВЕРЬ");
        second.population = 2;

        let catalog = Catalog::from_records([first, second]);
        let kept = catalog.get(&CityName::new("тверь")).map(|r| r.population);
        assert_eq!(kept, Some(1));
    }

    #[test]
    fn removed_cities_are_gone_for_good() {
        let mut catalog = Catalog::from_names(["Омск", "Орёл"]);
        let name = CityName::new("Омск");

        let record = catalog.remove(&name).expect("present");
        assert_eq!(record.name, "Омск");
        assert!(!catalog.contains(&name));
        assert_eq!(
            catalog.remove(&name),
            Err(CatalogError::NotFound("омск".to_string()))
        );
    }

    #[test]
    fn starting_with_is_sorted_and_bounded() {
        let catalog = Catalog::from_names(["Тула", "Омск", "Тверь", "Томск", "Уфа", "Сочи"]);
        let names: Vec<_> = catalog
            .starting_with('т')
            .map(|(name, _)| name.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["тверь", "томск", "тула"]);
        assert_eq!(catalog.starting_with('я').count(), 0);
    }

    #[test]
    fn first_letters_cover_the_catalog() {
        let catalog = Catalog::from_names(["Тула", "Омск", "Тверь"]);
        assert_eq!(catalog.first_letters(), BTreeSet::from(['о', 'т']));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in "\\PC{0,24}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
