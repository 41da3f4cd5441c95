//! End-to-end puzzle flows: library record → puzzle → viewer / session.

use std::time::Duration;

use puzzle_viewer::{
    Command, Event, Feedback, MoveOutcome, Phase, PuzzleViewer, Session, SessionConfig, Timer,
};
use server::library::PuzzleLibrary;
use shakmaty::Square;
use tokio::time::timeout;

fn demo_viewer(id: &str) -> PuzzleViewer {
    let library = PuzzleLibrary::demo();
    PuzzleViewer::new(library.puzzle(id).expect("demo puzzle"))
}

#[test]
fn test_black_solver_plays_en_passant_line() {
    let mut viewer = demo_viewer("demo-en-passant");
    assert_eq!(viewer.board_state().orientation, "black");
    assert_eq!(viewer.phase(), Phase::SolverToMove);

    let solver_moves = [
        (Square::D6, Square::C5),
        (Square::G5, Square::F6),
        (Square::G4, Square::F3),
        (Square::F6, Square::E5),
    ];

    for (i, (orig, dest)) in solver_moves.into_iter().enumerate() {
        match viewer.handle_move(orig, dest).unwrap() {
            MoveOutcome::Correct { played, solved } => {
                assert!(!solved);
                if i == 2 {
                    assert_eq!(played.san, "gxf3+");
                    assert_eq!(played.en_passant_capture, Some(Square::F4));
                }
            }
            other => panic!("move {i} not accepted: {other:?}"),
        }
        assert_eq!(viewer.phase(), Phase::OpponentToMove);
        viewer.fire(Timer::OpponentReply).unwrap();
    }

    assert_eq!(viewer.phase(), Phase::Solved);
    assert_eq!(viewer.mistakes(), 0);
}

#[test]
fn test_wrong_move_then_retry() {
    let mut viewer = demo_viewer("demo-knight-mate");

    match viewer.handle_move(Square::G2, Square::G3).unwrap() {
        MoveOutcome::Incorrect { played } => assert_eq!(played.san, "Qg3"),
        other => panic!("expected incorrect, got {other:?}"),
    }
    assert_eq!(viewer.board_state().feedback, Some(Feedback::Incorrect));

    // Board locked until the blunder is taken back
    assert!(viewer.handle_move(Square::G2, Square::G8).is_err());
    viewer.fire(Timer::TakeBack).unwrap();

    assert!(matches!(
        viewer.handle_move(Square::G2, Square::G8).unwrap(),
        MoveOutcome::Correct { solved: false, .. }
    ));
    assert_eq!(viewer.mistakes(), 1);
}

#[tokio::test]
async fn test_session_reports_en_passant_capture() {
    let puzzle = PuzzleLibrary::demo().puzzle("demo-en-passant").unwrap();
    let config = SessionConfig {
        opponent_delay: Duration::from_millis(5),
        take_back_delay: Duration::from_millis(5),
    };
    let mut handle = Session::spawn(PuzzleViewer::new(puzzle), config);

    let moves = [
        (Square::D6, Square::C5),
        (Square::G5, Square::F6),
        (Square::G4, Square::F3),
    ];

    let mut captured = None;
    for (orig, dest) in moves {
        // Wait until the board is ours again
        loop {
            let event = timeout(Duration::from_secs(2), handle.recv())
                .await
                .expect("timed out")
                .expect("session ended");
            match event {
                Event::Board { state } if state.phase == Phase::SolverToMove => break,
                Event::EnPassant { captured: square } => captured = Some(square),
                _ => {}
            }
        }
        handle.send(Command::Move { orig, dest }).await.unwrap();
    }

    while captured.is_none() {
        let event = timeout(Duration::from_secs(2), handle.recv())
            .await
            .expect("timed out")
            .expect("session ended");
        if let Event::EnPassant { captured: square } = event {
            captured = Some(square);
        }
    }
    assert_eq!(captured.as_deref(), Some("f4"));

    handle.send(Command::Close).await.unwrap();
}
