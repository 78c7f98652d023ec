//! Card primitives and the table deck.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ALL_SUITS: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];
pub const ALL_RANKS: [Rank; 13] = [
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
    Rank::Ace,
];

pub const DECK_LEN: usize = 52;

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "T")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

impl Rank {
    /// Numeric rank with ace high (2..=14). The ace-low reading only exists
    /// inside wheel-straight detection in the evaluator.
    pub fn value(self) -> u8 {
        use Rank::*;
        match self {
            Two => 2,
            Three => 3,
            Four => 4,
            Five => 5,
            Six => 6,
            Seven => 7,
            Eight => 8,
            Nine => 9,
            Ten => 10,
            Jack => 11,
            Queen => 12,
            King => 13,
            Ace => 14,
        }
    }

    pub fn from_char(c: char) -> Option<Rank> {
        use Rank::*;
        Some(match c.to_ascii_uppercase() {
            '2' => Two,
            '3' => Three,
            '4' => Four,
            '5' => Five,
            '6' => Six,
            '7' => Seven,
            '8' => Eight,
            '9' => Nine,
            'T' => Ten,
            'J' => Jack,
            'Q' => Queen,
            'K' => King,
            'A' => Ace,
            _ => return None,
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
            other => (b'0' + other.value()) as char,
        };
        write!(f, "{c}")
    }
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "c")]
    Club,
    #[serde(rename = "d")]
    Diamond,
    #[serde(rename = "h")]
    Heart,
    #[serde(rename = "s")]
    Spade,
}

impl Suit {
    pub fn from_char(c: char) -> Option<Suit> {
        Some(match c.to_ascii_lowercase() {
            'c' => Suit::Club,
            'd' => Suit::Diamond,
            'h' => Suit::Heart,
            's' => Suit::Spade,
            _ => return None,
        })
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Suit::Club => 'c',
            Suit::Diamond => 'd',
            Suit::Heart => 'h',
            Suit::Spade => 's',
        };
        write!(f, "{c}")
    }
}

/// A playing card. Cards compare by rank only where ordering matters;
/// suits are never ordered.
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("not a card: {0:?}")]
pub struct ParseCardError(String);

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Card, ParseCardError> {
        let mut chars = s.chars();
        let (Some(r), Some(u), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(ParseCardError(s.to_string()));
        };
        let rank = Rank::from_char(r).ok_or_else(|| ParseCardError(s.to_string()))?;
        let suit = Suit::from_char(u).ok_or_else(|| ParseCardError(s.to_string()))?;
        Ok(Card { rank, suit })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck exhausted: asked for {wanted}, {remaining} left")]
    Exhausted { wanted: usize, remaining: usize },
}

/// Ordered 52-card deck dealt from the front. `reset` repopulates and
/// shuffles; tests build stacked decks instead of shuffling.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    next: usize,
}

impl Deck {
    pub fn new<R: Rng>(rng: &mut R) -> Deck {
        let mut deck = Deck {
            cards: Vec::with_capacity(DECK_LEN),
            next: 0,
        };
        deck.reset(rng);
        deck
    }

    /// A deck that deals exactly `cards`, front first, without shuffling.
    pub fn stacked(cards: Vec<Card>) -> Deck {
        Deck { cards, next: 0 }
    }

    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        self.cards.clear();
        for suit in ALL_SUITS {
            for rank in ALL_RANKS {
                self.cards.push(Card { rank, suit });
            }
        }
        self.cards.shuffle(rng);
        self.next = 0;
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.next
    }

    pub fn deal_one(&mut self) -> Result<Card, DeckError> {
        let card = *self.cards.get(self.next).ok_or(DeckError::Exhausted {
            wanted: 1,
            remaining: 0,
        })?;
        self.next += 1;
        Ok(card)
    }

    pub fn deal(&mut self, count: usize) -> Result<Vec<Card>, DeckError> {
        if self.remaining() < count {
            return Err(DeckError::Exhausted {
                wanted: count,
                remaining: self.remaining(),
            });
        }
        let dealt = self.cards[self.next..self.next + count].to_vec();
        self.next += count;
        Ok(dealt)
    }
}

/// Parse a space-separated card list, e.g. `"As Kd 7c"`. Test helper.
pub fn parse_cards(s: &str) -> Result<Vec<Card>, ParseCardError> {
    s.split_whitespace().map(Card::from_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn fresh_deck_has_52_unique_cards() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut deck = Deck::new(&mut rng);
        let mut seen = HashSet::new();
        while deck.remaining() > 0 {
            assert!(seen.insert(deck.deal_one().unwrap()));
        }
        assert_eq!(seen.len(), DECK_LEN);
    }

    #[test]
    fn remaining_tracks_deals() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut deck = Deck::new(&mut rng);
        deck.deal(5).unwrap();
        deck.deal_one().unwrap();
        assert_eq!(deck.remaining(), DECK_LEN - 6);
    }

    #[test]
    fn exhausted_deck_reports_error() {
        let mut deck = Deck::stacked(parse_cards("As Kd").unwrap());
        deck.deal_one().unwrap();
        assert_eq!(
            deck.deal(2),
            Err(DeckError::Exhausted {
                wanted: 2,
                remaining: 1
            })
        );
    }

    #[test]
    fn reset_restores_full_deck() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut deck = Deck::new(&mut rng);
        deck.deal(20).unwrap();
        deck.reset(&mut rng);
        assert_eq!(deck.remaining(), DECK_LEN);
    }

    #[test]
    fn card_text_round_trips() {
        for s in ["As", "Td", "2c", "Kh", "9s"] {
            let card: Card = s.parse().unwrap();
            assert_eq!(card.to_string(), s);
        }
        assert!("Xs".parse::<Card>().is_err());
        assert!("A".parse::<Card>().is_err());
        assert!("Asx".parse::<Card>().is_err());
    }

    #[test]
    fn card_serde_shape() {
        let card: Card = "Qh".parse().unwrap();
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json, serde_json::json!({"rank": "Q", "suit": "h"}));
        let back: Card = serde_json::from_value(json).unwrap();
        assert_eq!(back, card);
    }
}
