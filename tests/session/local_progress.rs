use chrono::NaiveDate;
use miner_tycoon::{
    catalog::{
        AchievementId,
        FarmId,
    },
    minigames::Minigame,
    persistence::PROGRESS_KEY,
    progress::{
        PlayerProgress,
        ProgressError,
    },
    session::{
        ActionError,
        SessionCommand,
        SessionConfig,
        SessionEvent,
    },
    test_helpers::{
        ALICE,
        FakeChainReader,
        FakeInventoryReader,
        TestContext,
        run_local,
    },
};

fn is_daily(event: &SessionEvent) -> bool {
    matches!(
        event,
        SessionEvent::DailyClaimed(_) | SessionEvent::ActionRejected(_)
    )
}

#[tokio::test(start_paused = true)]
async fn claim_daily__once_per_calendar_day() {
    run_local(async {
        // given
        let mut ctx = TestContext::start(SessionConfig::default());

        // when
        ctx.send(SessionCommand::ClaimDaily);
        let first = ctx.wait_for(is_daily).await;
        ctx.send(SessionCommand::ClaimDaily);
        let repeat = ctx.wait_for(is_daily).await;
        ctx.clock.advance_days(1);
        ctx.send(SessionCommand::ClaimDaily);
        let next_day = ctx.wait_for(is_daily).await;

        // then
        let SessionEvent::DailyClaimed(first) = first else {
            panic!("first claim should succeed, got {first:?}");
        };
        assert_eq!(first.day, 1);
        assert_eq!(first.reward, 10.0);
        assert_eq!(
            repeat,
            SessionEvent::ActionRejected(ActionError::Progress(
                ProgressError::AlreadyClaimedToday(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
            ))
        );
        let SessionEvent::DailyClaimed(second) = next_day else {
            panic!("next day claim should succeed, got {next_day:?}");
        };
        assert_eq!(second.day, 2);
        assert_eq!(second.reward, 20.0);

        let store = ctx.store.clone();
        let controller = ctx.shutdown().await;
        assert_eq!(controller.progress().total_earnings, 30.0);
        let raw = store.snapshot(PROGRESS_KEY).expect("claims are persisted");
        let stored: PlayerProgress = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.claimed_days.into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(stored.current_streak, 3);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn record_minigame__every_game__unlocks_gamer() {
    run_local(async {
        // given
        let mut ctx = TestContext::start(SessionConfig::default());

        // when
        ctx.send(SessionCommand::RecordMinigame {
            game: Minigame::Clicker,
            amount: 20.0,
        });
        ctx.send(SessionCommand::RecordMinigame {
            game: Minigame::Slots,
            amount: 0.0,
        });
        ctx.send(SessionCommand::RecordMinigame {
            game: Minigame::Puzzle,
            amount: 4.5,
        });

        // then
        let unlocked = ctx
            .wait_for(|event| matches!(event, SessionEvent::AchievementsUnlocked(_)))
            .await;
        assert_eq!(
            unlocked,
            SessionEvent::AchievementsUnlocked(vec![AchievementId::Gamer])
        );
        let controller = ctx.shutdown().await;
        assert_eq!(controller.progress().total_clicks, 20);
        assert!((controller.progress().total_earnings - 4.52).abs() < 1e-9);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn select_farm__requires_the_unlock_level() {
    run_local(async {
        // given
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(600, 0),
            FakeInventoryReader::new(Vec::new()),
            PlayerProgress::default(),
        );
        ctx.connect(ALICE);
        ctx.wait_for(|event| matches!(event, SessionEvent::Refreshed { .. }))
            .await;

        // when
        ctx.send(SessionCommand::SelectFarm(FarmId::Desert));
        let locked = ctx
            .wait_for(|event| matches!(event, SessionEvent::ActionRejected(_)))
            .await;
        ctx.send(SessionCommand::SelectFarm(FarmId::Arctic));
        let selected = ctx
            .wait_for(|event| matches!(event, SessionEvent::FarmSelected { .. }))
            .await;

        // then
        assert_eq!(
            locked,
            SessionEvent::ActionRejected(ActionError::Progress(ProgressError::FarmLocked {
                farm: FarmId::Desert,
                required_level: 3,
            }))
        );
        let SessionEvent::FarmSelected { farm, stats } = selected else {
            unreachable!()
        };
        assert_eq!(farm, FarmId::Arctic);
        assert_eq!(stats.selected_farm, FarmId::Arctic);
        assert!((stats.coins_per_second - 600.0 * 0.0001 * 1.2).abs() < 1e-9);
        let controller = ctx.shutdown().await;
        assert_eq!(controller.progress().selected_farm, FarmId::Arctic);
    })
    .await;
}
