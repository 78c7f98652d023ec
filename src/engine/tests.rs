#![cfg(test)]

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::actions::{ActionType, PlayerAction};
use super::errors::{ActionError, TableError};
use super::table::TableEngine;
use super::types::*;
use crate::cards::parse_cards;

fn table_with_players(stacks: &[Chips], sb: Chips, bb: Chips, seed: u64) -> (TableEngine, Vec<PlayerId>) {
    let mut engine = TableEngine::with_rng(TableId(1), sb, bb, StdRng::seed_from_u64(seed));
    let mut ids = Vec::new();
    for (i, stack) in stacks.iter().enumerate() {
        let pid = PlayerId::new();
        assert!(engine.add_player(pid, &format!("bot_{i}"), *stack));
        ids.push(pid);
    }
    (engine, ids)
}

fn act(engine: &mut TableEngine, pid: &PlayerId, action: PlayerAction) {
    engine
        .process_action(pid, &action)
        .unwrap_or_else(|e| panic!("action {action:?} rejected: {e}"));
}

fn fold() -> PlayerAction {
    PlayerAction::of(ActionType::Fold)
}
fn check() -> PlayerAction {
    PlayerAction::of(ActionType::Check)
}
fn call() -> PlayerAction {
    PlayerAction::of(ActionType::Call)
}
fn raise_to(to: Chips) -> PlayerAction {
    PlayerAction::with_amount(ActionType::Raise, to)
}
fn bet(amount: Chips) -> PlayerAction {
    PlayerAction::with_amount(ActionType::Bet, amount)
}
fn all_in() -> PlayerAction {
    PlayerAction::of(ActionType::AllIn)
}

fn total_chips(engine: &TableEngine) -> Chips {
    engine.state().players.values().map(|p| p.chips).sum::<Chips>() + engine.state().total_pot()
}

// On the first hand the dealer button lands on seat 1 (it advances from
// its initial position before dealing). With two players that makes seat 1
// the dealer/small blind and seat 0 the big blind.

#[test]
fn heads_up_dealer_posts_small_blind_and_acts_first() {
    let (mut engine, ids) = table_with_players(&[1_000, 1_000], 10, 20, 1);
    engine.start_hand().unwrap();

    let state = engine.state();
    let dealer = &state.players[&ids[1]];
    let other = &state.players[&ids[0]];
    assert!(dealer.is_dealer && dealer.is_small_blind);
    assert!(other.is_big_blind);
    assert_eq!(dealer.chips, 990);
    assert_eq!(other.chips, 980);
    assert_eq!(state.current_bet, 20);
    // Dealer acts first preflop.
    assert_eq!(state.current_player_id, Some(ids[1]));
}

#[test]
fn heads_up_non_dealer_acts_first_postflop() {
    let (mut engine, ids) = table_with_players(&[1_000, 1_000], 10, 20, 2);
    engine.start_hand().unwrap();

    act(&mut engine, &ids[1], call());
    // Big blind has the option; the round is not over yet.
    assert_eq!(engine.state().betting_round, BettingRound::Preflop);
    assert_eq!(engine.current_player(), Some(ids[0]));
    act(&mut engine, &ids[0], check());

    assert_eq!(engine.state().betting_round, BettingRound::Flop);
    assert_eq!(engine.state().community_cards.len(), 3);
    assert_eq!(engine.current_player(), Some(ids[0]));
}

#[test]
fn big_blind_gets_preflop_option() {
    let (mut engine, ids) = table_with_players(&[1_000, 1_000], 10, 20, 3);
    engine.start_hand().unwrap();

    act(&mut engine, &ids[1], call());
    let options = engine.valid_actions(&ids[0]);
    assert!(options
        .iter()
        .any(|a| a.action_type == ActionType::Check));
    let raise = options
        .iter()
        .find(|a| a.action_type == ActionType::Raise)
        .expect("big blind may raise their option");
    assert_eq!(raise.min_amount, 40); // current bet 20 + min raise 20
    assert!(!options.iter().any(|a| a.action_type == ActionType::Bet));

    // Raising the option reopens action for the limper.
    act(&mut engine, &ids[0], raise_to(60));
    assert_eq!(engine.state().current_bet, 60);
    assert_eq!(engine.current_player(), Some(ids[1]));
}

#[test]
fn min_raise_boundary_is_enforced() {
    // Seats: dealer = 1, sb = 2, bb = 3, first to act = 0.
    let (mut engine, ids) = table_with_players(&[1_000; 4], 10, 20, 4);
    engine.start_hand().unwrap();
    assert_eq!(engine.current_player(), Some(ids[0]));

    // Open to 60: raise increment 40.
    act(&mut engine, &ids[0], raise_to(60));
    assert_eq!(engine.state().min_raise, 40);

    // 90 is below the 100 minimum.
    let err = engine.process_action(&ids[1], &raise_to(90)).unwrap_err();
    match err {
        TableError::Rejected(ActionError::RaiseBelowMinimum { min_to }) => {
            assert_eq!(min_to, 100)
        }
        other => panic!("expected raise rejection, got {other}"),
    }
    // State untouched by the rejection.
    assert_eq!(engine.state().current_bet, 60);
    assert_eq!(engine.current_player(), Some(ids[1]));

    act(&mut engine, &ids[1], raise_to(100));
    assert_eq!(engine.state().current_bet, 100);
    assert_eq!(engine.state().min_raise, 40);
}

#[test]
fn all_in_for_less_call_does_not_move_the_bet() {
    // Seats: dealer = 1 (15 chips), sb = 2, bb = 0 in a 3-handed game.
    let (mut engine, ids) = table_with_players(&[1_000, 15, 1_000], 10, 20, 5);
    engine.start_hand().unwrap();
    assert_eq!(engine.current_player(), Some(ids[1]));

    act(&mut engine, &ids[1], call());
    let state = engine.state();
    let short = &state.players[&ids[1]];
    assert_eq!(short.chips, 0);
    assert_eq!(short.status, PlayerStatus::AllIn);
    assert_eq!(short.current_bet, 15);
    assert_eq!(state.current_bet, 20);
    assert_eq!(state.min_raise, 20);
    // Action moves on to the small blind, nothing reopened.
    assert_eq!(state.current_player_id, Some(ids[2]));
}

#[test]
fn short_all_in_raise_lifts_bet_without_reopening() {
    let (mut engine, ids) = table_with_players(&[1_000, 75, 1_000, 1_000], 10, 20, 6);
    engine.start_hand().unwrap();

    // Seat 0 opens to 60 (full raise, increment 40).
    act(&mut engine, &ids[0], raise_to(60));
    // Seat 1 shoves 75 total: increment 15 < 40, a short raise.
    act(&mut engine, &ids[1], all_in());

    let state = engine.state();
    assert_eq!(state.current_bet, 75);
    assert_eq!(state.min_raise, 40);
    assert_eq!(state.last_raiser_id, Some(ids[0]));
    // The opener is not reopened by the short shove.
    assert!(state.players[&ids[0]].has_acted);
    // Players still to act must match 75.
    assert_eq!(state.current_player_id, Some(ids[2]));
}

#[test]
fn full_raise_reopens_action() {
    let (mut engine, ids) = table_with_players(&[1_000; 4], 10, 20, 7);
    engine.start_hand().unwrap();

    act(&mut engine, &ids[0], raise_to(60));
    act(&mut engine, &ids[1], raise_to(100));
    assert!(!engine.state().players[&ids[0]].has_acted);
    assert_eq!(engine.state().last_raiser_id, Some(ids[1]));
}

#[test]
fn bet_rejected_when_round_already_open() {
    let (mut engine, ids) = table_with_players(&[1_000; 4], 10, 20, 8);
    engine.start_hand().unwrap();
    let err = engine.process_action(&ids[0], &bet(60)).unwrap_err();
    assert!(matches!(
        err,
        TableError::Rejected(ActionError::BetWhenOpened)
    ));
}

#[test]
fn check_rejected_facing_a_bet() {
    let (mut engine, ids) = table_with_players(&[1_000; 4], 10, 20, 9);
    engine.start_hand().unwrap();
    let err = engine.process_action(&ids[0], &check()).unwrap_err();
    assert!(matches!(
        err,
        TableError::Rejected(ActionError::CheckFacingBet { to_call: 20 })
    ));
}

#[test]
fn acting_out_of_turn_is_rejected() {
    let (mut engine, ids) = table_with_players(&[1_000; 4], 10, 20, 10);
    engine.start_hand().unwrap();
    let err = engine.process_action(&ids[2], &call()).unwrap_err();
    assert!(matches!(
        err,
        TableError::Rejected(ActionError::NotYourTurn)
    ));
}

#[test]
fn uncontested_hand_awards_pot_without_showdown() {
    let (mut engine, ids) = table_with_players(&[1_000; 3], 10, 20, 11);
    engine.start_hand().unwrap();

    // Dealer folds, small blind folds; big blind wins blind money.
    act(&mut engine, &ids[1], fold());
    act(&mut engine, &ids[2], fold());

    let state = engine.state();
    assert_eq!(state.phase, GamePhase::HandComplete);
    assert_eq!(state.hand_winners.len(), 1);
    assert_eq!(state.hand_winners[0].hand, "uncontested");
    assert_eq!(state.hand_winners[0].player_id, ids[0]);
    assert_eq!(state.players[&ids[0]].chips, 1_010);
    assert_eq!(state.total_pot(), 0);
}

#[test]
fn split_pot_divides_evenly_on_identical_straights() {
    let (mut engine, ids) = table_with_players(&[250, 250], 10, 20, 12);
    // Seat order deal: seat0 card, seat1 card, seat0, seat1, then board.
    engine.stack_next_deal(parse_cards("2c Kh 2d 3s Tc 9d 8h 7s 6c").unwrap());
    engine.start_hand().unwrap();

    // Dealer (seat 1) shoves, big blind calls all-in; the board runs out.
    act(&mut engine, &ids[1], all_in());
    act(&mut engine, &ids[0], call());

    let state = engine.state();
    assert_eq!(state.phase, GamePhase::HandComplete);
    assert_eq!(state.hand_winners.len(), 2);
    assert!(state
        .hand_winners
        .iter()
        .all(|w| w.amount == 250 && w.hand == "Straight"));
    assert_eq!(state.players[&ids[0]].chips, 250);
    assert_eq!(state.players[&ids[1]].chips, 250);
    assert_eq!(state.total_pot(), 0);
}

#[test]
fn side_pot_goes_to_best_eligible_hand_only() {
    // Seats: dealer = 1 (short, 40), sb = 2, bb = 0.
    let (mut engine, ids) = table_with_players(&[100, 40, 100], 10, 20, 13);
    engine.stack_next_deal(
        parse_cards("Kc Ac Qc Kh Ah Qh 2c 7d 9h Js 3d").unwrap(),
    );
    engine.start_hand().unwrap();

    // Short stack shoves 40, sb re-raises to 80, bb calls.
    act(&mut engine, &ids[1], all_in());
    act(&mut engine, &ids[2], raise_to(80));
    act(&mut engine, &ids[0], call());

    // Main pot 120 (40 x 3), side pot 80 (40 more from seats 0 and 2).
    let pots = &engine.state().pots;
    assert_eq!(pots.len(), 2);
    assert_eq!(pots[0].amount, 120);
    assert_eq!(pots[1].amount, 80);
    assert!(!pots[1].eligible_players.contains(&ids[1]));

    // Two live players check it down.
    for _ in 0..3 {
        act(&mut engine, &ids[2], check());
        act(&mut engine, &ids[0], check());
    }

    let state = engine.state();
    assert_eq!(state.phase, GamePhase::HandComplete);
    // Aces (short stack) win the main pot; kings take the side pot.
    assert_eq!(state.players[&ids[1]].chips, 120);
    assert_eq!(state.players[&ids[0]].chips, 100);
    assert_eq!(state.players[&ids[2]].chips, 20);
}

#[test]
fn busted_player_is_eliminated_at_next_hand_start() {
    let (mut engine, ids) = table_with_players(&[250, 250, 500], 10, 20, 14);
    engine.stack_next_deal(parse_cards("2c Ac 9s 2d Ah 9c Tc 9d 8h 7s Ad").unwrap());
    engine.start_hand().unwrap();

    // Seat 1 (aces) busts seat 0 heads-up in the side action.
    act(&mut engine, &ids[1], all_in());
    act(&mut engine, &ids[2], fold());
    act(&mut engine, &ids[0], call());

    assert_eq!(engine.state().players[&ids[0]].chips, 0);
    engine.start_hand().unwrap();
    let state = engine.state();
    assert_eq!(state.players[&ids[0]].status, PlayerStatus::Eliminated);
    assert!(!state.player_order.contains(&ids[0]));
}

#[test]
fn kicking_the_current_player_advances_the_hand() {
    let (mut engine, ids) = table_with_players(&[1_000; 3], 10, 20, 15);
    engine.start_hand().unwrap();
    let victim = engine.current_player().unwrap();
    engine.kick_player(&victim).unwrap();

    let state = engine.state();
    assert_eq!(state.players[&victim].chips, 0);
    assert_eq!(state.players[&victim].status, PlayerStatus::Folded);
    assert_ne!(state.current_player_id, Some(victim));
    // Forfeited chips left play; the rest is still conserved.
    let _ = ids;
}

#[test]
fn rejected_action_rearms_same_player() {
    let (mut engine, ids) = table_with_players(&[1_000; 3], 10, 20, 16);
    engine.start_hand().unwrap();
    let before = engine.current_player();
    let _ = engine.process_action(&ids[0], &raise_to(25)).unwrap_err();
    assert_eq!(engine.current_player(), before);
}

fn drive_random_hand(seed: u64, stacks: &[Chips]) -> (Chips, Chips, usize) {
    let (mut engine, ids) = table_with_players(stacks, 10, 20, seed);
    let initial: Chips = stacks.iter().sum();
    engine.start_hand().unwrap();
    let mut rng = StdRng::seed_from_u64(seed ^ 0xD1CE);
    let mut steps = 0usize;

    while !engine.hand_complete() {
        steps += 1;
        assert!(steps < 2_000, "hand did not terminate");
        assert_eq!(total_chips(&engine), initial, "conservation broke mid-hand");

        let actor = engine.current_player().expect("betting phase has an actor");
        let options = engine.valid_actions(&actor);
        assert!(!options.is_empty(), "live player with no legal action");

        let choice = &options[rng.gen_range(0..options.len())];
        let action = match choice.action_type {
            ActionType::Fold => fold(),
            ActionType::Check => check(),
            ActionType::Call => call(),
            ActionType::AllIn => all_in(),
            ActionType::Bet => PlayerAction::with_amount(
                ActionType::Bet,
                rng.gen_range(choice.min_amount..=choice.max_amount),
            ),
            ActionType::Raise => PlayerAction::with_amount(
                ActionType::Raise,
                rng.gen_range(choice.min_amount..=choice.max_amount),
            ),
        };
        act(&mut engine, &actor, action);
    }
    let _ = ids;
    (initial, total_chips(&engine), steps)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Any schedule of legal actions conserves chips and terminates.
    #[test]
    fn random_legal_hands_conserve_chips_and_terminate(
        seed in any::<u64>(),
        stacks in prop::collection::vec(20u64..2_000, 2..6),
    ) {
        let (initial, final_total, _steps) = drive_random_hand(seed, &stacks);
        prop_assert_eq!(initial, final_total);
    }
}
