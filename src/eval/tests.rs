use itertools::Itertools;
use proptest::prelude::*;

use super::*;
use crate::cards::{parse_cards, Card, ALL_RANKS, ALL_SUITS};

fn five(s: &str) -> [Card; 5] {
    let cards = parse_cards(s).unwrap();
    [cards[0], cards[1], cards[2], cards[3], cards[4]]
}

fn score(s: &str) -> HandScore {
    evaluate_five(five(s))
}

#[track_caller]
fn assert_hand(cards: &str, category: HandCategory, tiebreakers: &[u8]) {
    let got = score(cards);
    assert_eq!(got.category, category, "category for {cards}");
    assert_eq!(got.tiebreakers, tiebreakers, "tiebreakers for {cards}");
}

#[test]
fn classifies_every_category() {
    assert_hand("As Ks Qs Js Ts", HandCategory::RoyalFlush, &[14]);
    assert_hand("9h 8h 7h 6h 5h", HandCategory::StraightFlush, &[9]);
    assert_hand("5c 4c 3c 2c Ac", HandCategory::StraightFlush, &[5]); // steel wheel
    assert_hand("9c 9d 9h 9s 2c", HandCategory::FourOfAKind, &[9, 2]);
    assert_hand("Ac Ad Ah As Kc", HandCategory::FourOfAKind, &[14, 13]);
    assert_hand("Kc Kd Kh 4c 4d", HandCategory::FullHouse, &[13, 4]);
    assert_hand("2c 2d 2h Ac Ad", HandCategory::FullHouse, &[2, 14]);
    assert_hand("Ah Jh 9h 6h 3h", HandCategory::Flush, &[14, 11, 9, 6, 3]);
    assert_hand("Tc 9d 8h 7s 6c", HandCategory::Straight, &[10]);
    assert_hand("Ac Kd Qh Js Tc", HandCategory::Straight, &[14]);
    assert_hand("Ad 5c 4h 3s 2d", HandCategory::Straight, &[5]); // wheel
    assert_hand("7c 7d 7h Kd 2s", HandCategory::ThreeOfAKind, &[7, 13, 2]);
    assert_hand("Jc Jd 4h 4s 9c", HandCategory::TwoPair, &[11, 4, 9]);
    assert_hand("Qc Qd 9h 6s 2c", HandCategory::Pair, &[12, 9, 6, 2]);
    assert_hand("Kc Jd 8h 5s 2c", HandCategory::HighCard, &[13, 11, 8, 5, 2]);
}

#[test]
fn near_straights_are_not_straights() {
    assert_hand("Ac 2d 3h 4s 6c", HandCategory::HighCard, &[14, 6, 4, 3, 2]);
    // K-A-2-3-4 does not wrap.
    assert_hand("Kc Ad 2h 3s 4c", HandCategory::HighCard, &[14, 13, 4, 3, 2]);
}

#[test]
fn category_ordering_is_standard() {
    assert!(score("9c 9d 9h 9s 2c") > score("Kc Kd Kh 4c 4d")); // quads > boat
    assert!(score("Ah Jh 9h 6h 3h") > score("Ac Kd Qh Js Tc")); // flush > straight
    assert!(score("2c 2d 3h 3s 4c") > score("Ac Ad Kh Qs Jc")); // two pair > pair
}

#[test]
fn tiebreakers_decide_within_category() {
    // Kicker on the flush.
    assert!(score("Ah Jh 9h 6h 3h") > score("Ah Jh 9h 6h 2h"));
    // Wheel is the weakest straight.
    assert!(score("Ad 5c 4h 3s 2d") < score("6c 5d 4h 3s 2c"));
    // Steel wheel is the weakest straight flush.
    assert!(score("5c 4c 3c 2c Ac") < score("6h 5h 4h 3h 2h"));
    // Higher top pair wins two-pair comparisons before the low pair.
    assert!(score("Ac Ad 2h 2s 3c") > score("Kc Kd Qh Qs Ac"));
    // Same pairs: kicker decides.
    assert!(score("Jc Jd 4h 4s 9c") > score("Jh Js 4c 4d 8c"));
}

#[test]
fn equal_hands_score_equal_across_suits() {
    assert_eq!(score("Tc 9d 8h 7s 6c"), score("Th 9s 8c 7d 6h"));
    assert_eq!(score("Ac Ad Kh Qs Jc"), score("Ah As Kd Qc Jd"));
}

#[test]
fn best_of_seven_finds_wheel_on_board() {
    // Community 5c 4d 3s 2h As with hole 7c 9d: the wheel plays.
    let cards = parse_cards("7c 9d 5c 4d 3s 2h As").unwrap();
    let (best, chosen) = best_of_seven(&cards);
    assert_eq!(best.category, HandCategory::Straight);
    assert_eq!(best.tiebreakers, vec![5]);
    assert_eq!(chosen.len(), 5);
}

#[test]
fn best_of_seven_prefers_flush_over_straight() {
    let cards = parse_cards("9h 8h Th Jh 7s 6s Qh").unwrap();
    let (best, _) = best_of_seven(&cards);
    assert_eq!(best.category, HandCategory::Flush);
}

#[test]
fn best_of_seven_picks_highest_kickers() {
    let cards = parse_cards("Ac Ad 2c 7d 9h Js Kc").unwrap();
    let (best, chosen) = best_of_seven(&cards);
    assert_eq!(best.category, HandCategory::Pair);
    assert_eq!(best.tiebreakers, vec![14, 13, 11, 9]);
    assert!(!chosen.iter().any(|c| c.rank.value() == 2));
}

#[test]
fn best_of_seven_handles_exactly_five() {
    let cards = parse_cards("Ac Kd Qh Js Tc").unwrap();
    let (best, chosen) = best_of_seven(&cards);
    assert_eq!(best.category, HandCategory::Straight);
    assert_eq!(chosen, cards);
}

#[test]
fn winner_indices_reports_all_ties() {
    let a = score("Tc 9d 8h 7s 6c");
    let b = score("Th 9s 8c 7d 6h");
    let c = score("Qc Qd 9h 6s 2c");
    assert_eq!(winner_indices(&[a.clone(), b, c]), vec![0, 1]);
    assert_eq!(winner_indices(&[a]), vec![0]);
    assert_eq!(winner_indices(&[]), Vec::<usize>::new());
}

fn full_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(52);
    for suit in ALL_SUITS {
        for rank in ALL_RANKS {
            cards.push(Card { rank, suit });
        }
    }
    cards
}

proptest! {
    // Relabeling suits never changes a hand's strength: flushes map to
    // flushes, everything else ignores suits entirely.
    #[test]
    fn suit_permutation_invariance(
        hand in proptest::sample::subsequence(full_deck(), 5),
        perm in proptest::sample::select(
            ALL_SUITS.iter().copied().permutations(4).collect::<Vec<_>>(),
        ),
    ) {
        let relabel = |c: &Card| {
            let idx = ALL_SUITS.iter().position(|s| *s == c.suit).unwrap();
            Card { rank: c.rank, suit: perm[idx] }
        };
        let original = [hand[0], hand[1], hand[2], hand[3], hand[4]];
        let mapped_vec: Vec<Card> = hand.iter().map(relabel).collect();
        let mapped = [mapped_vec[0], mapped_vec[1], mapped_vec[2], mapped_vec[3], mapped_vec[4]];
        prop_assert_eq!(evaluate_five(original), evaluate_five(mapped));
    }

    // Evaluation is a pure function of the card set, not its order.
    #[test]
    fn order_invariance(hand in proptest::sample::subsequence(full_deck(), 5), rot in 0usize..5) {
        let original = [hand[0], hand[1], hand[2], hand[3], hand[4]];
        let mut rotated = original;
        rotated.rotate_left(rot);
        prop_assert_eq!(evaluate_five(original), evaluate_five(rotated));
    }
}
