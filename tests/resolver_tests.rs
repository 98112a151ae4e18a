use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use solana_program::pubkey::Pubkey;

use lotkeeper::error::KeeperError;
use lotkeeper::pda::find_ticket_address;
use lotkeeper::resolver::{LotteryView, NoProfiles, ResultResolver};
use lotkeeper::retry::PollBudget;
use lotkeeper::state::{EntryReceipt, Ticket};

mod common;
use common::{base_round_state, make_ticket, MapProfiles, MockLedger, NoopTrigger, RolloverTrigger};

const PAST: u64 = 1_000;
const FAR_FUTURE: u64 = u64::MAX / 2;

fn setup(end_timestamp: u64, current_round: u64) -> Arc<MockLedger> {
    let program_id = Pubkey::new_unique();
    let ledger = Arc::new(MockLedger::new(program_id, Pubkey::new_unique()));
    ledger.seed_round(&base_round_state(
        &program_id,
        ledger.authority,
        current_round,
        end_timestamp,
        4,
    ));
    ledger
}

fn receipt(participant: Pubkey, round_id: u64, ticket_number: u64) -> EntryReceipt {
    EntryReceipt {
        participant,
        round_id,
        ticket_number,
        bump: 255,
    }
}

#[tokio::test]
async fn entered_current_open_round_shows_countdown() {
    let ledger = setup(FAR_FUTURE, 6);
    let participant = Pubkey::new_unique();
    ledger.seed_receipt(&receipt(participant, 6, 2));

    let resolver = ResultResolver::new(Arc::clone(&ledger), ledger.program_id, NoProfiles);
    let view = resolver.resolve(&participant).await.unwrap();

    assert_eq!(
        view,
        LotteryView::Countdown {
            round_id: 6,
            ticket_number: 2,
            end_timestamp: FAR_FUTURE,
            total_participants: 4,
        }
    );
}

#[tokio::test]
async fn entered_current_closed_round_shows_drawing() {
    let ledger = setup(PAST, 6);
    let participant = Pubkey::new_unique();
    ledger.seed_receipt(&receipt(participant, 6, 2));

    let resolver = ResultResolver::new(Arc::clone(&ledger), ledger.program_id, NoProfiles);
    let view = resolver.resolve(&participant).await.unwrap();

    assert_eq!(
        view,
        LotteryView::Drawing {
            round_id: 6,
            ticket_number: 2,
        }
    );
}

#[tokio::test]
async fn winner_of_previous_round_sees_prize() {
    let ledger = setup(FAR_FUTURE, 6);
    let participant = Pubkey::new_unique();
    ledger.seed_receipt(&receipt(participant, 5, 3));
    ledger.seed_ticket(
        5,
        3,
        &Ticket {
            owner: participant,
            round_id: 5,
            is_winner: true,
            prize_amount: 1_500_000_000,
            bump: 255,
        },
    );

    let resolver = ResultResolver::new(Arc::clone(&ledger), ledger.program_id, NoProfiles);
    let view = resolver.resolve(&participant).await.unwrap();

    assert_eq!(
        view,
        LotteryView::Won {
            round_id: 5,
            prize_lamports: 1_500_000_000,
            prize_sol: 1.5,
        }
    );
}

#[tokio::test]
async fn loser_of_previous_round_sees_winner_with_bounded_scan() {
    let ledger = setup(FAR_FUTURE, 6);
    let participant = Pubkey::new_unique();
    let winner = Pubkey::new_unique();

    ledger.seed_receipt(&receipt(participant, 5, 3));
    for index in 0..=7u64 {
        let mut ticket = make_ticket(Pubkey::new_unique(), 5);
        if index == 3 {
            ticket.owner = participant;
        }
        if index == 7 {
            ticket = Ticket {
                owner: winner,
                round_id: 5,
                is_winner: true,
                prize_amount: 2_000_000_000,
                bump: 255,
            };
        }
        ledger.seed_ticket(5, index, &ticket);
    }

    let mut profiles = HashMap::new();
    profiles.insert(winner, "winner.one".to_string());
    let resolver =
        ResultResolver::new(Arc::clone(&ledger), ledger.program_id, MapProfiles(profiles));
    let view = resolver.resolve(&participant).await.unwrap();

    match view {
        LotteryView::Lost { round_id, winner: found } => {
            assert_eq!(round_id, 5);
            let found = found.expect("winning ticket must be surfaced");
            assert_eq!(found.address, winner);
            assert_eq!(found.ticket_index, 7);
            assert_eq!(found.prize_lamports, 2_000_000_000);
            assert_eq!(found.prize_sol, 2.0);
            assert_eq!(found.display_handle.as_deref(), Some("winner.one"));
        }
        other => panic!("expected Lost, got {:?}", other),
    }

    // The scan stopped at the winning index.
    let (past_winner, _) = find_ticket_address(&ledger.program_id, 5, 8);
    assert!(!ledger.fetched(&past_winner));
}

#[tokio::test]
async fn not_entered_still_surfaces_last_round_winner() {
    let ledger = setup(FAR_FUTURE, 6);
    let outsider = Pubkey::new_unique();
    let winner = Pubkey::new_unique();

    ledger.seed_ticket(5, 0, &make_ticket(Pubkey::new_unique(), 5));
    ledger.seed_ticket(
        5,
        1,
        &Ticket {
            owner: winner,
            round_id: 5,
            is_winner: true,
            prize_amount: 3_000_000_000,
            bump: 255,
        },
    );

    let resolver = ResultResolver::new(Arc::clone(&ledger), ledger.program_id, NoProfiles);
    let view = resolver.resolve(&outsider).await.unwrap();

    match view {
        LotteryView::NotEntered { round_id, last_winner } => {
            assert_eq!(round_id, 6);
            let last_winner = last_winner.expect("previous winner should be found");
            assert_eq!(last_winner.address, winner);
            assert_eq!(last_winner.prize_lamports, 3_000_000_000);
            // No profile service configured; resolution still succeeds.
            assert_eq!(last_winner.display_handle, None);
        }
        other => panic!("expected NotEntered, got {:?}", other),
    }
}

#[tokio::test]
async fn not_entered_with_no_history_reports_no_winner() {
    let ledger = setup(FAR_FUTURE, 6);
    let outsider = Pubkey::new_unique();

    let resolver = ResultResolver::new(Arc::clone(&ledger), ledger.program_id, NoProfiles);
    let view = resolver.resolve(&outsider).await.unwrap();

    assert_eq!(
        view,
        LotteryView::NotEntered {
            round_id: 6,
            last_winner: None,
        }
    );
}

#[tokio::test]
async fn check_result_waits_for_rollover_then_resolves() {
    let ledger = setup(PAST, 6);
    let participant = Pubkey::new_unique();
    ledger.seed_receipt(&receipt(participant, 6, 0));
    ledger.seed_ticket(6, 0, &make_ticket(participant, 6));
    ledger.set_pot_balance(1_000_000_000);

    let trigger = RolloverTrigger {
        ledger: Arc::clone(&ledger),
        winner_index: 0,
    };
    let resolver = ResultResolver::new(Arc::clone(&ledger), ledger.program_id, NoProfiles);
    let view = resolver
        .check_result(
            &participant,
            &trigger,
            PollBudget::new(5, Duration::from_millis(1)),
        )
        .await
        .unwrap();

    assert_eq!(
        view,
        LotteryView::Won {
            round_id: 6,
            prize_lamports: 900_000_000,
            prize_sol: 0.9,
        }
    );
}

#[tokio::test]
async fn check_result_times_out_when_rollover_never_lands() {
    let ledger = setup(PAST, 6);
    let participant = Pubkey::new_unique();
    ledger.seed_receipt(&receipt(participant, 6, 0));

    let resolver = ResultResolver::new(Arc::clone(&ledger), ledger.program_id, NoProfiles);
    let err = resolver
        .check_result(
            &participant,
            &NoopTrigger,
            PollBudget::new(2, Duration::from_millis(1)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KeeperError::PollTimeout { attempts: 2 }));
    assert!(!err.user_message().is_empty());
}
