//! Game alphabet, bad letters and the required-letter transition rule.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{normalize, Catalog, CityName},
    error::InputError,
};

/// Letters of the Russian alphabet, in order.
pub const RUSSIAN: &str = "абвгдеёжзийклмнопрстуфхцчшщъыьэюя";

/// Fixed, ordered set of letters valid in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alphabet {
    letters: Vec<char>,
}

impl Alphabet {
    /// Build an alphabet from the characters of `letters`, lower-cased, keeping
    /// the first occurrence of each and ignoring whitespace.
    pub fn new(letters: &str) -> Self {
        let mut seen = BTreeSet::new();
        let letters = letters
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|ch| !ch.is_whitespace())
            .filter(|ch| seen.insert(*ch))
            .collect();
        Self { letters }
    }

    /// The default Russian alphabet.
    pub fn russian() -> Self {
        Self::new(RUSSIAN)
    }

    /// Whether `letter` belongs to the alphabet.
    pub fn contains(&self, letter: char) -> bool {
        self.letters.contains(&letter)
    }

    /// Letters in order.
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// Number of letters.
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    /// Whether the alphabet has no letters.
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::russian()
    }
}

/// Letters that start no city of the catalog the session began with.
///
/// Built once before the first turn and never refreshed, even as cities are
/// used up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadLetterIndex {
    alphabet: Alphabet,
    bad: BTreeSet<char>,
}

impl BadLetterIndex {
    /// Compute bad letters from the catalog a game starts with.
    pub fn build(initial: &Catalog, alphabet: Alphabet) -> Self {
        let starts = initial.first_letters();
        let bad = alphabet
            .letters()
            .iter()
            .copied()
            .filter(|letter| !starts.contains(letter))
            .collect();
        Self { alphabet, bad }
    }

    /// Alphabet the index was built for.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Letters no city starts with.
    pub fn bad_letters(&self) -> &BTreeSet<char> {
        &self.bad
    }

    /// Whether no city starts with `letter`.
    pub fn is_bad(&self, letter: char) -> bool {
        self.bad.contains(&letter)
    }

    /// Whether `letter` may become a required letter.
    pub fn is_playable(&self, letter: char) -> bool {
        self.alphabet.contains(letter) && !self.is_bad(letter)
    }

    /// Letter the next city must start with after `city` was named.
    ///
    /// Walks back from the end of the name past bad letters and anything
    /// outside the alphabet. `None` means the name has no playable letter at
    /// all.
    pub fn next_letter(&self, city: &CityName) -> Option<char> {
        city.as_str()
            .chars()
            .rev()
            .find(|ch| self.is_playable(*ch))
    }

    /// Whether any letter at all can open a game.
    pub fn has_playable_letters(&self) -> bool {
        self.bad.len() < self.alphabet.len()
    }

    /// Parse a first-letter entry: exactly one alphabet letter that starts at
    /// least one city.
    ///
    /// When no letter starts a city (an empty catalog) any alphabet letter is
    /// accepted, so the game can start and end on the computer's first turn
    /// instead of prompting forever.
    pub fn validate_first_letter(&self, input: &str) -> Result<char, InputError> {
        let normalized = normalize(input);
        let mut chars = normalized.chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(letter), None) if self.alphabet.contains(letter) => letter,
            _ => return Err(InputError::InvalidFirstLetter(input.trim().to_string())),
        };
        if self.is_bad(letter) && self.has_playable_letters() {
            return Err(InputError::NoCityForLetter(letter));
        }
        Ok(letter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn index(names: &[&str]) -> BadLetterIndex {
        BadLetterIndex::build(&Catalog::from_names(names.iter().copied()), Alphabet::russian())
    }

    #[test]
    fn alphabet_lowercases_and_deduplicates() {
        let alphabet = Alphabet::new("AbBa c");
        assert_eq!(alphabet.letters(), &['a', 'b', 'c']);
        assert_eq!(Alphabet::russian().len(), 33);
    }

    #[test]
    fn bad_letters_are_alphabet_minus_first_letters() {
        let index = index(&["Москва", "Астана"]);
        assert!(!index.is_bad('м'));
        assert!(!index.is_bad('а'));
        assert!(index.is_bad('ы'));
        assert_eq!(index.bad_letters().len(), 31);
    }

    #[test]
    fn transition_uses_last_letter_when_playable() {
        let index = index(&["Москва", "Астана"]);
        assert_eq!(index.next_letter(&CityName::new("Москва")), Some('а'));
    }

    #[test]
    fn transition_skips_back_over_bad_letters() {
        let index = index(&["Тверь", "Ростов", "Елец", "Вологда"]);
        // ь is bad, р starts Ростов
        assert_eq!(index.next_letter(&CityName::new("Тверь")), Some('р'));
        // ц is bad, е starts Елец
        assert_eq!(index.next_letter(&CityName::new("Елец")), Some('е'));
    }

    #[test]
    fn transition_skips_several_bad_letters_and_punctuation() {
        let index = index(&["Анадырь", "Мыски"]);
        // ь, р, ы, д are bad; а is the first playable letter from the end
        assert_eq!(index.next_letter(&CityName::new("Анадырь")), Some('а'));
        assert_eq!(
            index.next_letter(&CityName::new("Тверь")),
            None,
            "no letter of the name starts a city"
        );
        assert_eq!(index.next_letter(&CityName::new("Мыски-1")), Some('м'));
    }

    #[test]
    fn first_letter_validation() {
        let index = index(&["Москва", "Астана"]);
        assert_eq!(index.validate_first_letter(" М "), Ok('м'));
        assert_eq!(
            index.validate_first_letter("7"),
            Err(InputError::InvalidFirstLetter("7".to_string()))
        );
        assert_eq!(
            index.validate_first_letter("ма"),
            Err(InputError::InvalidFirstLetter("ма".to_string()))
        );
        assert_eq!(
            index.validate_first_letter(""),
            Err(InputError::InvalidFirstLetter(String::new()))
        );
        assert_eq!(
            index.validate_first_letter("ы"),
            Err(InputError::NoCityForLetter('ы'))
        );
    }

    #[test]
    fn empty_catalog_accepts_any_alphabet_letter() {
        let index = index(&[]);
        assert!(!index.has_playable_letters());
        assert_eq!(index.validate_first_letter("Я"), Ok('я'));
        assert_eq!(
            index.validate_first_letter("q"),
            Err(InputError::InvalidFirstLetter("q".to_string()))
        );
    }

    proptest! {
        #[test]
        fn bad_letters_never_start_a_city(names in proptest::collection::vec("[а-я]{1,8}", 0..20)) {
            let catalog = Catalog::from_names(names.iter().cloned());
            let index = BadLetterIndex::build(&catalog, Alphabet::russian());
            let starts = catalog.first_letters();
            for letter in Alphabet::russian().letters() {
                prop_assert_eq!(index.is_bad(*letter), !starts.contains(letter));
                if index.is_bad(*letter) && !catalog.is_empty() {
                    prop_assert!(index.validate_first_letter(&letter.to_string()).is_err());
                }
            }
        }
    }
}
