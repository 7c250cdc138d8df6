// src/card.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn symbol(self) -> char {
        match self {
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
            Suit::Spades => 'S',
        }
    }

    /// Parses a suit symbol in either case.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'H' => Some(Suit::Hearts),
            'D' => Some(Suit::Diamonds),
            'C' => Some(Suit::Clubs),
            'S' => Some(Suit::Spades),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Ace = 1,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1..=13 => Some(Self::ALL[value as usize - 1]),
            _ => None,
        }
    }

    /// Like [`Rank::from_value`] but never fails: values below 1 become an ace
    /// and values above 13 become a king.
    pub fn clamped(value: u32) -> Self {
        let value = value.clamp(1, 13) as u8;
        Self::ALL[value as usize - 1]
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Single-character code used by the card sprite file names.
    pub fn symbol(self) -> char {
        match self {
            Rank::Ace => 'A',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            other => char::from(b'0' + other.value()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Sprite file name, e.g. `Ah.svg` for the ace of hearts.
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "{}{}.{}",
            self.rank.symbol(),
            self.suit.symbol().to_ascii_lowercase(),
            extension
        )
    }

    pub fn asset_path(&self, asset_dir: impl AsRef<Path>, extension: &str) -> PathBuf {
        asset_dir.as_ref().join(self.file_name(extension))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.symbol())
    }
}

/// Resolves a numeric rank and a suit symbol to the card's SVG sprite path.
///
/// Out-of-range ranks are clamped and unknown suit symbols yield `None`.
pub fn resolve_card_asset(asset_dir: impl AsRef<Path>, rank: u32, suit: char) -> Option<PathBuf> {
    let suit = Suit::from_symbol(suit)?;
    Some(Card::new(Rank::clamped(rank), suit).asset_path(asset_dir, "svg"))
}
