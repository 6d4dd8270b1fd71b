//! Display names for the hall of fame
//!
//! Names typed at the save prompt are trimmed, length-checked and run through
//! a profanity filter before they are written to the leaderboard. When the
//! kiosk is configured with a [`NameStyle`], an empty name is replaced by a
//! generated one instead of being rejected.

use heck::ToTitleCase;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::leaderboard::MAX_NAME_LENGTH;

/// How to name a player who leaves the save prompt blank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, garde::Validate)]
pub enum NameStyle {
    /// A Latin-sounding name of two or three parts
    Roman(#[garde(range(min = 2, max = 3))] usize),
    /// Adjectives followed by an animal
    Petname(#[garde(range(min = 2, max = 3))] usize),
}

impl Default for NameStyle {
    fn default() -> Self {
        Self::Petname(2)
    }
}

impl NameStyle {
    /// Makes up a hall of fame name in title case
    pub fn generate(self) -> String {
        match self {
            Self::Roman(parts) => romanname::romanname(romanname::NameConfig {
                praenomen: parts > 2,
            }),
            Self::Petname(parts) => petname::petname(parts as u8, " ").unwrap_or_default(),
        }
        .to_title_case()
    }
}

/// Why a name was refused at the save prompt
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Nothing but whitespace was typed and no name can be made up
    #[error("enter a name to save your score")]
    Empty,
    /// The profanity filter flagged the name
    #[error("that name cannot go on the hall of fame")]
    Sinful,
    /// Longer than a hall of fame row can show
    #[error("name is too long for the hall of fame")]
    TooLong,
}

/// Cleans a name entered at the save prompt
///
/// # Arguments
///
/// * `name` - The raw name as typed (will be trimmed of whitespace)
/// * `fallback` - Style used to generate a name when `name` is blank
///
/// # Returns
///
/// The cleaned name on success.
///
/// # Errors
///
/// * `Error::TooLong` - Name exceeds 30 characters after trimming
/// * `Error::Empty` - Name is blank and no fallback style is configured
/// * `Error::Sinful` - Name contains inappropriate content
pub fn display_name(name: &str, fallback: Option<NameStyle>) -> Result<String, Error> {
    let name = rustrict::trim_whitespace(name);
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::TooLong);
    }
    if name.is_empty() {
        return fallback.map(NameStyle::generate).ok_or(Error::Empty);
    }
    if name.is_inappropriate() {
        return Err(Error::Sinful);
    }
    Ok(name.to_owned())
}
