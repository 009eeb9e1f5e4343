use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use wordbench::archive::{FailureArchive, MemoryStorage};
use wordbench::client_wrapper::{ClientWrapper, Completion, Message, Role, TokenUsage, TransportError};
use wordbench::episode::{EpisodeState, TieBreak, TurnLoop};
use wordbench::event::{EpisodeEvent, EpisodeEventHandler};
use wordbench::games::bracket::BracketPuzzle;
use wordbench::games::wordle::WordlePuzzle;
use wordbench::healing::HealingCoordinator;
use wordbench::invoker::ModelInvoker;
use wordbench::parser::{ClueAnswerGrammar, ClueMove, GuessGrammar, MoveGrammar};
use wordbench::prompts::PromptTemplate;
use wordbench::puzzle::{EngineRejection, MoveVerdict, PuzzleEngine};
use wordbench::retry::RetryPolicy;

// Mock client: scripted replies first, then a fixed fallback (or an error) forever.
struct MockClient {
    script: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    calls: AtomicUsize,
}

impl MockClient {
    fn replying(script: &[&str], fallback: Option<&str>) -> Self {
        MockClient {
            script: Mutex::new(script.iter().map(|s| s.to_string()).collect()),
            fallback: fallback.map(str::to_string),
            calls: AtomicUsize::new(0),
        }
    }

    fn always(reply: &str) -> Self {
        Self::replying(&[], Some(reply))
    }

    fn broken() -> Self {
        Self::replying(&[], None)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientWrapper for MockClient {
    async fn send_message(
        &self,
        _model: &str,
        _messages: &[Message],
    ) -> Result<Completion, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().await.pop_front();
        let reply = match scripted.or_else(|| self.fallback.clone()) {
            Some(reply) => reply,
            None => return Err(TransportError::Provider("connection reset".into())),
        };
        Ok(Completion {
            message: Message {
                role: Role::Assistant,
                content: reply.as_str().into(),
            },
            usage: Some(TokenUsage {
                input_tokens: 100,
                output_tokens: 5,
                total_tokens: 105,
            }),
        })
    }
}

/// Puzzle that counts accepted moves and reports itself solved after `solve_after` of them.
#[derive(Debug)]
struct CountingPuzzle {
    solve_after: Option<usize>,
    reject_everything: bool,
    applied: usize,
}

impl CountingPuzzle {
    fn unsolvable() -> Self {
        CountingPuzzle {
            solve_after: None,
            reject_everything: false,
            applied: 0,
        }
    }

    fn solved_after(moves: usize) -> Self {
        CountingPuzzle {
            solve_after: Some(moves),
            ..Self::unsolvable()
        }
    }

    fn rejecting() -> Self {
        CountingPuzzle {
            reject_everything: true,
            ..Self::unsolvable()
        }
    }
}

impl PuzzleEngine for CountingPuzzle {
    type Move = ClueMove;

    fn game_name(&self) -> &'static str {
        "counting"
    }

    fn puzzle_id(&self) -> String {
        "counting-1".to_string()
    }

    fn render_text(&self) -> String {
        format!("{} moves applied", self.applied)
    }

    fn is_solved(&self) -> bool {
        self.solve_after.map_or(false, |n| self.applied >= n)
    }

    fn apply_move(&mut self, mv: &ClueMove) -> Result<MoveVerdict, EngineRejection> {
        if self.reject_everything {
            return Err(EngineRejection::UnknownTarget(mv.clue_id.clone()));
        }
        self.applied += 1;
        Ok(MoveVerdict::Correct)
    }
}

#[derive(Default)]
struct CollectingHandler {
    events: Mutex<Vec<EpisodeEvent>>,
}

#[async_trait]
impl EpisodeEventHandler for CollectingHandler {
    async fn on_episode_event(&self, event: &EpisodeEvent) {
        self.events.lock().await.push(event.clone());
    }
}

const GOOD_MOVE: &str = "clue_id: c1\nanswer: drill";
const GARBAGE: &str = "I am not sure, maybe drill?";

fn turn_loop<P, G>(
    puzzle: P,
    grammar: G,
    client: Arc<MockClient>,
    storage: Arc<MemoryStorage>,
    step_limit: usize,
) -> TurnLoop<P, G>
where
    P: PuzzleEngine,
    G: MoveGrammar<Move = P::Move>,
{
    let invoker = Arc::new(ModelInvoker::new(client, RetryPolicy::immediate(3)));
    let coordinator = HealingCoordinator::new(grammar, invoker, FailureArchive::new(storage));
    TurnLoop::new(
        puzzle,
        coordinator,
        "test/model",
        step_limit,
        PromptTemplate::new("preamble", "conclusion"),
    )
}

#[tokio::test]
async fn test_unparseable_turns_each_cost_exactly_one_step() {
    let client = Arc::new(MockClient::always(GARBAGE));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(
        CountingPuzzle::unsolvable(),
        ClueAnswerGrammar,
        client.clone(),
        storage.clone(),
        4,
    )
    .run()
    .await;

    assert!(!outcome.record.won);
    assert_eq!(outcome.record.step_count, 4);
    assert_eq!(outcome.record.stats.parse_failures, 4);
    assert_eq!(outcome.puzzle.applied, 0);
    assert_eq!(storage.len(), 4);
    // primary call + one healing call per turn
    assert_eq!(client.calls(), 8);
}

#[tokio::test]
async fn test_solved_puzzle_wins_before_limit() {
    let client = Arc::new(MockClient::always(GOOD_MOVE));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(
        CountingPuzzle::solved_after(2),
        ClueAnswerGrammar,
        client.clone(),
        storage.clone(),
        10,
    )
    .run()
    .await;

    assert!(outcome.record.won);
    assert_eq!(outcome.record.step_count, 2);
    assert_eq!(outcome.record.stats.parsed_moves, 2);
    assert_eq!(client.calls(), 2);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_solve_on_final_step_is_a_loss_by_default() {
    let client = Arc::new(MockClient::always(GOOD_MOVE));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(
        CountingPuzzle::solved_after(2),
        ClueAnswerGrammar,
        client,
        storage,
        2,
    )
    .run()
    .await;

    assert!(outcome.puzzle.is_solved());
    assert!(!outcome.record.won);
    assert_eq!(outcome.record.step_count, 2);
}

#[tokio::test]
async fn test_solved_first_tie_break_reports_win() {
    let client = Arc::new(MockClient::always(GOOD_MOVE));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(
        CountingPuzzle::solved_after(2),
        ClueAnswerGrammar,
        client,
        storage,
        2,
    )
    .with_tie_break(TieBreak::SolvedFirst)
    .run()
    .await;

    assert!(outcome.record.won);
    assert_eq!(outcome.record.step_count, 2);
}

#[tokio::test]
async fn test_failing_transport_exhausts_episode_and_archives_every_turn() {
    let client = Arc::new(MockClient::broken());
    let storage = Arc::new(MemoryStorage::new());
    let archive = FailureArchive::new(storage.clone());

    let mut turns = turn_loop(
        CountingPuzzle::unsolvable(),
        ClueAnswerGrammar,
        client.clone(),
        storage.clone(),
        3,
    );
    let mut advances = 0;
    let final_state = loop {
        let state = turns.advance().await;
        if state.is_terminal() {
            break state;
        }
        advances += 1;
    };

    assert_eq!(final_state, EpisodeState::TerminalExhausted);
    assert_eq!(advances, 3);
    assert_eq!(turns.episode().step_count(), 3);
    assert_eq!(storage.len(), 3);
    for key in archive.keys().unwrap() {
        assert_eq!(archive.load(&key).unwrap(), "", "the empty reply is what gets archived");
    }
    // 3 turns x (primary + healing) x 3 attempts each
    assert_eq!(client.calls(), 18);
}

#[tokio::test]
async fn test_engine_rejection_costs_a_step_without_archiving() {
    let client = Arc::new(MockClient::always(GOOD_MOVE));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(
        CountingPuzzle::rejecting(),
        ClueAnswerGrammar,
        client,
        storage.clone(),
        3,
    )
    .run()
    .await;

    assert!(!outcome.record.won);
    assert_eq!(outcome.record.step_count, 3);
    assert_eq!(outcome.record.stats.rejected_moves, 3);
    assert_eq!(outcome.record.stats.parse_failures, 0);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_healed_move_is_applied() {
    let client = Arc::new(MockClient::replying(&[GARBAGE, GOOD_MOVE], None));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(
        CountingPuzzle::solved_after(1),
        ClueAnswerGrammar,
        client.clone(),
        storage.clone(),
        5,
    )
    .run()
    .await;

    assert!(outcome.record.won);
    assert_eq!(outcome.record.step_count, 1);
    assert_eq!(outcome.record.stats.healed_moves, 1);
    assert_eq!(client.calls(), 2);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_terminal_episode_ignores_further_advances() {
    let client = Arc::new(MockClient::always(GOOD_MOVE));
    let storage = Arc::new(MemoryStorage::new());
    let mut turns = turn_loop(
        CountingPuzzle::solved_after(1),
        ClueAnswerGrammar,
        client.clone(),
        storage,
        5,
    );

    assert_eq!(turns.advance().await, EpisodeState::AwaitingMove);
    assert_eq!(turns.advance().await, EpisodeState::TerminalWon);
    let calls = client.calls();
    for _ in 0..3 {
        assert_eq!(turns.advance().await, EpisodeState::TerminalWon);
    }
    assert_eq!(turns.episode().step_count(), 1);
    assert!(turns.episode().game_over());
    assert!(turns.episode().game_won());
    assert_eq!(client.calls(), calls);
}

#[tokio::test]
async fn test_zero_step_limit_ends_before_any_call() {
    let client = Arc::new(MockClient::always(GOOD_MOVE));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(
        CountingPuzzle::unsolvable(),
        ClueAnswerGrammar,
        client.clone(),
        storage,
        0,
    )
    .run()
    .await;

    assert!(!outcome.record.won);
    assert_eq!(outcome.record.step_count, 0);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_events_follow_turn_order() {
    let client = Arc::new(MockClient::replying(&[GARBAGE, "still garbage", GOOD_MOVE], None));
    let storage = Arc::new(MemoryStorage::new());
    let handler = Arc::new(CollectingHandler::default());

    let outcome = turn_loop(
        CountingPuzzle::solved_after(1),
        ClueAnswerGrammar,
        client,
        storage,
        5,
    )
    .with_event_handler(handler.clone())
    .run()
    .await;
    assert!(outcome.record.won);

    let events = handler.events.lock().await;
    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            EpisodeEvent::PromptBuilt { .. } => "prompt",
            EpisodeEvent::ModelResponded { .. } => "response",
            EpisodeEvent::MoveHealed { .. } => "healed",
            EpisodeEvent::MoveApplied { .. } => "applied",
            EpisodeEvent::MoveRejected { .. } => "rejected",
            EpisodeEvent::ParseFailed { .. } => "failed",
            EpisodeEvent::StepCompleted { .. } => "step",
            EpisodeEvent::Finished { .. } => "finished",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "prompt", "response", "failed", "step", "prompt", "response", "applied", "step",
            "finished"
        ]
    );

    match &events[2] {
        EpisodeEvent::ParseFailed { archive_key, .. } => assert!(archive_key.is_some()),
        other => panic!("unexpected event {:?}", other),
    }
    let step_counts: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            EpisodeEvent::StepCompleted { step_count, .. } => Some(*step_count),
            _ => None,
        })
        .collect();
    assert_eq!(step_counts, vec![1, 2]);
    match events.last() {
        Some(EpisodeEvent::Finished {
            episode_id,
            won,
            steps,
        }) => {
            assert!(*won);
            // The failed turn and the winning turn each cost one step.
            assert_eq!(*steps, 2);
            assert_eq!(*steps, outcome.record.step_count);
            assert_eq!(episode_id, &outcome.record.episode_id);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_episode_exposes_identity_and_running_stats() {
    let client = Arc::new(MockClient::replying(&[GARBAGE, "still garbage", GOOD_MOVE], None));
    let storage = Arc::new(MemoryStorage::new());
    let handler = Arc::new(CollectingHandler::default());
    let mut turns = turn_loop(
        CountingPuzzle::solved_after(1),
        ClueAnswerGrammar,
        client,
        storage,
        5,
    )
    .with_event_handler(handler.clone());

    assert_eq!(turns.episode().model(), "test/model");
    assert_eq!(turns.episode().step_limit(), 5);

    assert_eq!(turns.advance().await, EpisodeState::AwaitingMove);
    assert_eq!(turns.episode().stats().parse_failures, 1);
    assert_eq!(turns.episode().stats().parsed_moves, 0);

    assert_eq!(turns.advance().await, EpisodeState::AwaitingMove);
    assert_eq!(turns.episode().stats().parsed_moves, 1);
    assert_eq!(turns.episode().puzzle().applied, 1);
    assert_eq!(turns.advance().await, EpisodeState::TerminalWon);

    let id = turns.episode().id().to_string();
    assert!(!id.is_empty());
    let events = handler.events.lock().await;
    match events.last() {
        Some(EpisodeEvent::Finished { episode_id, .. }) => assert_eq!(episode_id, &id),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_paused_episode_waits_for_resume() {
    let client = Arc::new(MockClient::always(GOOD_MOVE));
    let storage = Arc::new(MemoryStorage::new());
    let (pause_tx, pause_rx) = watch::channel(true);

    let turns = turn_loop(
        CountingPuzzle::solved_after(1),
        ClueAnswerGrammar,
        client.clone(),
        storage,
        5,
    )
    .with_pause_control(pause_rx);
    let episode = tokio::spawn(turns.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.calls(), 0, "no model call while paused");

    pause_tx.send(false).unwrap();
    let outcome = episode.await.unwrap();
    assert!(outcome.record.won);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_record_carries_token_usage_and_identity() {
    let client = Arc::new(MockClient::always(GOOD_MOVE));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(
        CountingPuzzle::solved_after(2),
        ClueAnswerGrammar,
        client,
        storage,
        5,
    )
    .run()
    .await;

    let record = outcome.record;
    assert_eq!(record.game, "counting");
    assert_eq!(record.puzzle_id, "counting-1");
    assert_eq!(record.model_name, "test/model");
    assert_eq!(record.step_limit, 5);
    assert_eq!(record.token_usage.total_tokens, 210);
    assert!(!record.episode_id.is_empty());
}

#[tokio::test]
async fn test_bracket_episode_end_to_end() {
    let json = r#"{"date":"2025-06-07","template":"Chalk up before {c1}",
      "clues":{"c1":{"text":"exercise in a {c2}","answer":"drill"},
               "c2":{"text":"game played with a cue ball","answer":"billiards"}}}"#;
    let puzzle = BracketPuzzle::from_json_str(json).unwrap();
    let client = Arc::new(MockClient::replying(
        &[
            "clue_id: c1\nanswer: drill",
            "clue_id: c2\nanswer: snooker",
            "clue_id: c2\nanswer: billiards",
            "clue_id: c1\nanswer: drill",
        ],
        None,
    ));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(puzzle, ClueAnswerGrammar, client, storage, 10)
        .run()
        .await;

    assert!(outcome.record.won);
    assert_eq!(outcome.record.game, "bracket");
    assert_eq!(outcome.record.step_count, 4);
    assert_eq!(outcome.record.stats.rejected_moves, 1);
    assert_eq!(outcome.record.stats.parsed_moves, 4);
    assert_eq!(outcome.puzzle.rendered_puzzle(), "Chalk up before drill");
    assert_eq!(
        outcome.puzzle.clue("c2").unwrap().previous_answers,
        vec!["snooker".to_string(), "billiards".to_string()]
    );
}

#[tokio::test]
async fn test_wordle_episode_end_to_end() {
    let client = Arc::new(MockClient::replying(
        &["guess: crane", "Let me think. Guess: PAPER", "guess: apple"],
        None,
    ));
    let storage = Arc::new(MemoryStorage::new());

    let outcome = turn_loop(WordlePuzzle::new("apple", 6), GuessGrammar, client, storage, 6)
        .run()
        .await;

    assert!(outcome.record.won);
    assert_eq!(outcome.record.step_count, 3);
    assert_eq!(outcome.puzzle.guesses().len(), 3);
    assert_eq!(outcome.puzzle.history().lines().last(), Some("apple -> GGGGG"));
}
