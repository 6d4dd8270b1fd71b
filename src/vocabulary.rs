//! Game modes and token normalization
//!
//! Every string that enters the engine, whether decoded from an optical code,
//! typed on a keyboard or read from the hardware line, goes through
//! [`Token::new`] so that comparisons between the scanned token and the chosen
//! answer do not depend on the source.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A trimmed, case-folded, non-empty string
///
/// Tokens are used both for scanned codes and for answer values. The only way
/// to build one is through [`Token::new`], which guarantees the normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, derive_more::Display)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Normalizes raw input into a token
    ///
    /// # Returns
    ///
    /// `None` if the input is empty after trimming.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Returns the normalized text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A named group of tokens sharing one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Category {
    /// Answer value players must choose for members of this category
    #[garde(length(min = 1))]
    pub name: String,
    /// Tokens that belong to this category
    #[garde(length(min = 1))]
    pub members: Vec<String>,
}

/// The vocabulary of the active game mode
///
/// The vocabulary decides which scanned tokens may open a round and what the
/// expected answer for that round is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub enum Vocabulary {
    /// A small fixed token set where the scanned token is itself the answer
    /// (for example `betul` / `salah`)
    Tokens(#[garde(length(min = 1))] Vec<String>),
    /// Tokens grouped into categories; the answer is the category name
    Categories(#[garde(length(min = 1), dive)] Vec<Category>),
}

impl Default for Vocabulary {
    /// Rock identification with three categories
    fn default() -> Self {
        let category = |name: &str, members: &[&str]| Category {
            name: name.to_owned(),
            members: members.iter().map(|m| (*m).to_owned()).collect(),
        };

        Self::Categories(vec![
            category("igneous", &["granite", "basalt", "andesite", "rhyolite"]),
            category(
                "sedimentary",
                &["limestone", "sandstone", "shale", "conglomerate"],
            ),
            category("metamorphic", &["gneiss", "schist", "quartzite", "phyllite"]),
        ])
    }
}

impl Vocabulary {
    /// The binary `betul` / `salah` mode
    pub fn true_false() -> Self {
        Self::Tokens(vec!["betul".to_owned(), "salah".to_owned()])
    }

    /// Derives the expected answer for a scanned token
    ///
    /// # Returns
    ///
    /// `None` if the token is not part of this vocabulary.
    pub fn expected_answer(&self, token: &Token) -> Option<Token> {
        match self {
            Self::Tokens(tokens) => tokens
                .iter()
                .filter_map(|t| Token::new(t))
                .find(|t| t == token),
            Self::Categories(categories) => categories
                .iter()
                .find(|c| c.members.iter().any(|m| Token::new(m).as_ref() == Some(token)))
                .and_then(|c| Token::new(&c.name)),
        }
    }

    /// Whether a scanned token may open a round
    pub fn accepts_token(&self, token: &Token) -> bool {
        self.expected_answer(token).is_some()
    }

    /// All answer values players can choose from, in configuration order
    pub fn answers(&self) -> Vec<Token> {
        match self {
            Self::Tokens(tokens) => tokens.iter().filter_map(|t| Token::new(t)).collect_vec(),
            Self::Categories(categories) => {
                categories.iter().filter_map(|c| Token::new(&c.name)).collect_vec()
            }
        }
        .into_iter()
        .unique()
        .collect()
    }

    /// Whether a value is one of the answers of this vocabulary
    pub fn is_answer(&self, value: &Token) -> bool {
        self.answers().contains(value)
    }

    /// Picks a random scannable token, used to simulate scans
    pub fn random_token(&self) -> Option<Token> {
        let tokens = match self {
            Self::Tokens(tokens) => tokens.iter().collect_vec(),
            Self::Categories(categories) => {
                categories.iter().flat_map(|c| c.members.iter()).collect_vec()
            }
        };

        if tokens.is_empty() {
            return None;
        }

        Token::new(tokens[fastrand::usize(..tokens.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> Token {
        Token::new(s).unwrap()
    }

    #[test]
    fn test_token_normalizes() {
        assert_eq!(token("  GRANITE \n").as_str(), "granite");
        assert_eq!(Token::new("   "), None);
        assert_eq!(Token::new(""), None);
    }

    #[test]
    fn test_category_expected_answer() {
        let vocabulary = Vocabulary::default();

        assert_eq!(
            vocabulary.expected_answer(&token("Basalt")),
            Some(token("igneous"))
        );
        assert_eq!(
            vocabulary.expected_answer(&token("gneiss")),
            Some(token("metamorphic"))
        );
        assert_eq!(vocabulary.expected_answer(&token("obsidian")), None);
    }

    #[test]
    fn test_tokens_expected_answer_is_token() {
        let vocabulary = Vocabulary::true_false();

        assert_eq!(
            vocabulary.expected_answer(&token("BETUL")),
            Some(token("betul"))
        );
        assert!(!vocabulary.accepts_token(&token("maybe")));
    }

    #[test]
    fn test_answers() {
        assert_eq!(
            Vocabulary::default().answers(),
            vec![token("igneous"), token("sedimentary"), token("metamorphic")]
        );
        assert!(Vocabulary::true_false().is_answer(&token("salah")));
    }

    #[test]
    fn test_mixed_case_configuration() {
        let vocabulary = Vocabulary::Categories(vec![Category {
            name: "Igneous".to_owned(),
            members: vec![" Granite".to_owned()],
        }]);

        assert_eq!(
            vocabulary.expected_answer(&token("granite")),
            Some(token("igneous"))
        );
    }

    #[test]
    fn test_random_token_is_scannable() {
        let vocabulary = Vocabulary::default();
        for _ in 0..20 {
            let picked = vocabulary.random_token().unwrap();
            assert!(vocabulary.accepts_token(&picked));
        }
    }

    #[test]
    fn test_validation() {
        assert!(Vocabulary::default().validate().is_ok());
        assert!(Vocabulary::Tokens(vec![]).validate().is_err());
        assert!(
            Vocabulary::Categories(vec![Category {
                name: "empty".to_owned(),
                members: vec![],
            }])
            .validate()
            .is_err()
        );
    }
}
