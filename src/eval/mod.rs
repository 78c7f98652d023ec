//! Hand evaluation: classify five cards, pick the best five of seven,
//! select showdown winners.
//!
//! Pure functions, no I/O. Scores compare lexicographically on
//! `(category, tiebreakers)`, which is exactly the derived `Ord`.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cards::Card;

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl HandCategory {
    pub fn label(self) -> &'static str {
        use HandCategory::*;
        match self {
            HighCard => "High Card",
            Pair => "Pair",
            TwoPair => "Two Pair",
            ThreeOfAKind => "Three of a Kind",
            Straight => "Straight",
            Flush => "Flush",
            FullHouse => "Full House",
            FourOfAKind => "Four of a Kind",
            StraightFlush => "Straight Flush",
            RoyalFlush => "Royal Flush",
        }
    }
}

/// Strength of a five-card hand. Tiebreakers are rank values, most
/// significant first: quads give `[quad, kicker]`, two pair gives
/// `[high pair, low pair, kicker]`, flushes and high cards all five ranks
/// descending.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct HandScore {
    pub category: HandCategory,
    pub tiebreakers: Vec<u8>,
}

impl HandScore {
    pub fn name(&self) -> &'static str {
        self.category.label()
    }
}

/// `(is_straight, high_card)` over five distinct-or-not ranks.
/// The wheel `{A,5,4,3,2}` counts as a 5-high straight.
fn straight_high(ranks_desc: &[u8]) -> Option<u8> {
    let unique: Vec<u8> = ranks_desc.iter().copied().dedup().collect();
    if unique.len() != 5 {
        return None;
    }
    if unique[0] - unique[4] == 4 {
        return Some(unique[0]);
    }
    if unique == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

/// Classify exactly five cards.
pub fn evaluate_five(cards: [Card; 5]) -> HandScore {
    let mut ranks: Vec<u8> = cards.iter().map(|c| c.rank.value()).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.suit == cards[0].suit);
    let straight = straight_high(&ranks);

    if let (true, Some(high)) = (is_flush, straight) {
        if high == 14 {
            return HandScore {
                category: HandCategory::RoyalFlush,
                tiebreakers: vec![14],
            };
        }
        return HandScore {
            category: HandCategory::StraightFlush,
            tiebreakers: vec![high],
        };
    }

    // Rank multiset grouped by (count desc, rank desc).
    let mut counts = [0u8; 15];
    for r in &ranks {
        counts[*r as usize] += 1;
    }
    let mut groups: Vec<(u8, u8)> = (2..=14u8)
        .filter(|r| counts[*r as usize] > 0)
        .map(|r| (counts[r as usize], r))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let shape: Vec<u8> = groups.iter().map(|(n, _)| *n).collect();
    let by_group: Vec<u8> = groups.iter().map(|(_, r)| *r).collect();

    match shape.as_slice() {
        [4, 1] => HandScore {
            category: HandCategory::FourOfAKind,
            tiebreakers: by_group,
        },
        [3, 2] => HandScore {
            category: HandCategory::FullHouse,
            tiebreakers: by_group,
        },
        _ if is_flush => HandScore {
            category: HandCategory::Flush,
            tiebreakers: ranks,
        },
        _ if straight.is_some() => HandScore {
            category: HandCategory::Straight,
            tiebreakers: vec![straight.unwrap_or(0)],
        },
        [3, 1, 1] => HandScore {
            category: HandCategory::ThreeOfAKind,
            tiebreakers: by_group,
        },
        [2, 2, 1] => HandScore {
            category: HandCategory::TwoPair,
            tiebreakers: by_group,
        },
        [2, 1, 1, 1] => HandScore {
            category: HandCategory::Pair,
            tiebreakers: by_group,
        },
        _ => HandScore {
            category: HandCategory::HighCard,
            tiebreakers: ranks,
        },
    }
}

/// Best five-card hand out of 5..=7 cards (hole + community), with the
/// cards that make it. All 21 picks of a full seven are enumerated.
pub fn best_of_seven(cards: &[Card]) -> (HandScore, Vec<Card>) {
    debug_assert!((5..=7).contains(&cards.len()));
    cards
        .iter()
        .copied()
        .combinations(5)
        .map(|combo| {
            let five = [combo[0], combo[1], combo[2], combo[3], combo[4]];
            (evaluate_five(five), combo)
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .unwrap_or((
            HandScore {
                category: HandCategory::HighCard,
                tiebreakers: vec![],
            },
            vec![],
        ))
}

/// Indices of every score tied for the maximum.
pub fn winner_indices(scores: &[HandScore]) -> Vec<usize> {
    let Some(best) = scores.iter().max() else {
        return vec![];
    };
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| *s == best)
        .map(|(i, _)| i)
        .collect()
}
