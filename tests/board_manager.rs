//! Integration tests for the board manager against file-backed databases.
//!
//! These exercise behaviour that only shows up with real files: several
//! connections writing the same board, reopening a database, and long
//! sequences of mixed operations keeping every board consistent.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use kanban::board::{BoardDb, BoardManager, ChangeFeed, ManagerSettings};
use kanban::errors::BoardError;
use kanban_common::*;
use tempfile::TempDir;

fn actor() -> Actor {
    Actor::new(7)
}

fn open_manager(path: &Path) -> BoardManager {
    BoardManager::new(BoardDb::open(path).unwrap(), ManagerSettings::default())
}

fn first_column(manager: &BoardManager, board_id: i64) -> i64 {
    manager.get_board(board_id).unwrap().sequence.ids()[0]
}

// =============================================================================
// Concurrency
// =============================================================================

mod concurrency {
    use super::*;

    #[test]
    fn test_concurrent_adds_to_one_column_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kanban.db");
        let setup = open_manager(&path);
        let board_id = setup
            .create_board(actor(), 1, BoardOwner::Course, None)
            .unwrap()
            .value;
        let column_id = first_column(&setup, board_id);

        const WRITERS: usize = 4;
        const CARDS_EACH: usize = 10;
        let managers: Vec<BoardManager> = (0..WRITERS).map(|_| open_manager(&path)).collect();
        let barrier = Arc::new(Barrier::new(WRITERS));

        let workers: Vec<_> = managers
            .into_iter()
            .enumerate()
            .map(|(w, manager)| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let mut ids = Vec::new();
                    for i in 0..CARDS_EACH {
                        let draft = CardDraft::titled(format!("w{}-{}", w, i));
                        let card = manager.add_card(actor(), column_id, 0, draft).unwrap();
                        ids.push(card.value.id);
                    }
                    ids
                })
            })
            .collect();

        let created: Vec<i64> = workers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        let column = setup.get_column(column_id).unwrap();
        assert_eq!(column.sequence.len(), WRITERS * CARDS_EACH);
        let listed: HashSet<i64> = column.sequence.iter().collect();
        assert_eq!(listed.len(), WRITERS * CARDS_EACH, "no card listed twice");
        for id in &created {
            assert!(listed.contains(id), "card {} lost by a concurrent write", id);
        }
        assert!(setup.verify_board(board_id).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_ensure_board_creates_one_board() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kanban.db");
        // Creates the schema before the writers race.
        open_manager(&path);

        const WRITERS: usize = 4;
        let managers: Vec<BoardManager> = (0..WRITERS).map(|_| open_manager(&path)).collect();
        let barrier = Arc::new(Barrier::new(WRITERS));

        let ids: HashSet<i64> = managers
            .into_iter()
            .map(|manager| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    manager
                        .ensure_board(actor(), 3, BoardOwner::User(11))
                        .unwrap()
                        .value
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_moves_between_columns_from_two_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kanban.db");
        let a = open_manager(&path);
        let b = open_manager(&path);

        let board_id = a.create_board(actor(), 1, BoardOwner::Course, None).unwrap().value;
        let columns = a.get_board(board_id).unwrap().sequence.ids().to_vec();
        let card = a
            .add_card(actor(), columns[0], 0, CardDraft::titled("Shared"))
            .unwrap()
            .value;

        b.move_card(actor(), card.id, 0, Some(columns[1])).unwrap();
        a.move_card(actor(), card.id, 0, Some(columns[0])).unwrap();

        assert_eq!(a.get_card(card.id).unwrap().column_id, columns[0]);
        assert_eq!(b.get_column(columns[0]).unwrap().sequence.ids(), &[card.id]);
        assert!(b.get_column(columns[1]).unwrap().sequence.is_empty());
    }
}

// =============================================================================
// Persistence
// =============================================================================

mod persistence {
    use super::*;

    #[test]
    fn test_board_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kanban.db");

        let (board_id, card_id) = {
            let manager = open_manager(&path);
            let board_id = manager
                .create_board(actor(), 1, BoardOwner::Group(4), None)
                .unwrap()
                .value;
            let column_id = first_column(&manager, board_id);
            let card = manager
                .add_card(actor(), column_id, 0, CardDraft::titled("Persisted"))
                .unwrap()
                .value;
            manager
                .add_discussion_message(actor(), card.id, "first".to_string())
                .unwrap();
            (board_id, card.id)
        };

        let manager = open_manager(&path);
        let snapshot = manager.load_board(board_id).unwrap();
        assert_eq!(snapshot.board.owner, BoardOwner::Group(4));
        assert_eq!(snapshot.columns.len(), 3);
        assert_eq!(snapshot.columns[0].cards[0].id, card_id);
        assert!(snapshot.columns[0].cards[0].has_discussion);
        assert_eq!(manager.list_discussion(card_id).unwrap().len(), 1);
        assert!(!manager.card_history(card_id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_operation_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kanban.db");
        let manager = open_manager(&path);
        let board_id = manager.create_board(actor(), 1, BoardOwner::Course, None).unwrap().value;
        let column_id = first_column(&manager, board_id);
        let before = manager.load_board(board_id).unwrap();

        let err = manager
            .add_card(actor(), column_id, 999, CardDraft::titled("Orphan"))
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidReference { reference: 999, .. }));

        let reopened = open_manager(&path);
        let after = reopened.load_board(board_id).unwrap();
        assert_eq!(after.card_count(), before.card_count());
        assert_eq!(
            after.columns[0].column.sequence,
            before.columns[0].column.sequence
        );
    }

    #[test]
    fn test_delete_board_removes_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kanban.db");
        let manager = open_manager(&path);
        let board_id = manager.create_board(actor(), 1, BoardOwner::Course, None).unwrap().value;
        let column_id = first_column(&manager, board_id);
        let card = manager
            .add_card(actor(), column_id, 0, CardDraft::titled("Gone"))
            .unwrap()
            .value;

        manager.delete_board(actor(), board_id).unwrap();

        assert!(matches!(
            manager.get_board(board_id),
            Err(BoardError::NotFound { kind: EntityKind::Board, .. })
        ));
        assert!(matches!(
            manager.get_card(card.id),
            Err(BoardError::NotFound { kind: EntityKind::Card, .. })
        ));
    }
}

// =============================================================================
// Consistency over mixed operations
// =============================================================================

mod consistency {
    use super::*;

    /// Small deterministic generator so the operation mix is reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 33) as usize) % bound
        }
    }

    fn all_cards(manager: &BoardManager, board_id: i64) -> Vec<i64> {
        manager
            .load_board(board_id)
            .unwrap()
            .columns
            .iter()
            .flat_map(|c| c.cards.iter().map(|card| card.id))
            .collect()
    }

    #[test]
    fn test_random_operations_keep_board_consistent() {
        let manager =
            BoardManager::new(BoardDb::new_in_memory().unwrap(), ManagerSettings::default());
        let board_id = manager.create_board(actor(), 1, BoardOwner::Course, None).unwrap().value;
        let other_board = manager.create_board(actor(), 1, BoardOwner::User(9), None).unwrap().value;
        let mut rng = Lcg(42);

        for step in 0..300 {
            let columns = manager.get_board(board_id).unwrap().sequence.ids().to_vec();
            let cards = all_cards(&manager, board_id);

            let result = match rng.next(8) {
                0 | 1 if !columns.is_empty() => {
                    let column = columns[rng.next(columns.len())];
                    let siblings = manager.get_column(column).unwrap().sequence.ids().to_vec();
                    let after = if siblings.is_empty() || rng.next(3) == 0 {
                        0
                    } else {
                        siblings[rng.next(siblings.len())]
                    };
                    manager
                        .add_card(actor(), column, after, CardDraft::titled(format!("c{}", step)))
                        .map(|_| ())
                }
                2 | 3 if !cards.is_empty() && !columns.is_empty() => {
                    let card = cards[rng.next(cards.len())];
                    let target = columns[rng.next(columns.len())];
                    let siblings = manager.get_column(target).unwrap().sequence.ids().to_vec();
                    let after = match rng.next(siblings.len() + 1) {
                        0 => 0,
                        i => siblings[i - 1],
                    };
                    match manager.move_card(actor(), card, after, Some(target)) {
                        // `after` may be the card itself.
                        Err(BoardError::InvalidReference { .. }) if after == card => Ok(()),
                        other => other.map(|_| ()),
                    }
                }
                4 if !cards.is_empty() => {
                    let card = cards[rng.next(cards.len())];
                    manager.delete_card(actor(), card).map(|_| ())
                }
                5 if columns.len() < 6 => {
                    let after = match rng.next(columns.len() + 1) {
                        0 => 0,
                        i => columns[i - 1],
                    };
                    manager
                        .add_column(actor(), board_id, after, ColumnDraft::titled(format!("k{}", step)))
                        .map(|_| ())
                }
                6 if columns.len() > 1 => {
                    let column = columns[rng.next(columns.len())];
                    let after = match rng.next(columns.len() + 1) {
                        0 => 0,
                        i => columns[i - 1],
                    };
                    match manager.move_column(actor(), column, after) {
                        Err(BoardError::InvalidReference { .. }) if after == column => Ok(()),
                        other => other.map(|_| ()),
                    }
                }
                7 if !cards.is_empty() => {
                    let card = cards[rng.next(cards.len())];
                    manager.duplicate_card(actor(), card, None).map(|_| ())
                }
                _ => Ok(()),
            };
            result.unwrap_or_else(|e| panic!("step {} failed: {}", step, e));

            let problems = manager.verify_board(board_id).unwrap();
            assert!(problems.is_empty(), "step {}: {:?}", step, problems);
        }

        // Nothing leaked onto the other board of the instance.
        assert!(all_cards(&manager, other_board).is_empty());
        assert!(manager.verify_board(other_board).unwrap().is_empty());
    }

    #[test]
    fn test_cross_board_references_are_rejected() {
        let manager =
            BoardManager::new(BoardDb::new_in_memory().unwrap(), ManagerSettings::default());
        let a = manager.create_board(actor(), 1, BoardOwner::Course, None).unwrap().value;
        let b = manager.create_board(actor(), 1, BoardOwner::User(5), None).unwrap().value;
        let a_col = first_column(&manager, a);
        let b_col = first_column(&manager, b);
        let a_card = manager.add_card(actor(), a_col, 0, CardDraft::titled("A")).unwrap().value;
        let b_card = manager.add_card(actor(), b_col, 0, CardDraft::titled("B")).unwrap().value;

        assert!(matches!(
            manager.move_card(actor(), a_card.id, 0, Some(b_col)),
            Err(BoardError::InvalidReference { .. })
        ));
        assert!(matches!(
            manager.add_card(actor(), a_col, b_card.id, CardDraft::titled("C")),
            Err(BoardError::InvalidReference { .. })
        ));
        assert!(matches!(
            manager.move_column(actor(), a_col, b_col),
            Err(BoardError::InvalidReference { .. })
        ));
        assert!(manager.verify_board(a).unwrap().is_empty());
        assert!(manager.verify_board(b).unwrap().is_empty());
    }
}

// =============================================================================
// Change feed
// =============================================================================

mod change_feed {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_committed_batches_only() {
        let feed = ChangeFeed::new(16);
        let mut rx = feed.subscribe();
        let manager =
            BoardManager::new(BoardDb::new_in_memory().unwrap(), ManagerSettings::default())
                .with_feed(feed);

        let board_id = manager.create_board(actor(), 1, BoardOwner::Course, None).unwrap().value;
        let created = rx.recv().await.unwrap();
        assert!(created.iter().any(|e| e.kind == EntityKind::Board
            && e.id == board_id
            && e.action == ChangeAction::Created));

        let column_id = first_column(&manager, board_id);
        assert!(manager.add_card(actor(), column_id, 12345, CardDraft::titled("x")).is_err());
        assert!(rx.try_recv().is_err(), "failed operations publish nothing");

        manager.add_card(actor(), column_id, 0, CardDraft::titled("y")).unwrap();
        let batch = rx.recv().await.unwrap();
        assert!(batch.iter().any(|e| e.kind == EntityKind::Card && e.action == ChangeAction::Created));
        assert!(batch.iter().any(|e| e.kind == EntityKind::Column && e.id == column_id));
    }
}
