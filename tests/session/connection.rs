use miner_tycoon::{
    progress::PlayerProgress,
    session::{
        Activity,
        DataSource,
        SessionConfig,
        SessionEvent,
        SessionState,
    },
    test_helpers::{
        ALICE,
        FakeChainReader,
        FakeInventoryReader,
        GPU_ONE,
        TestContext,
        gpu,
        run_local,
    },
};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn connect__loads_then_settles_to_idle() {
    run_local(async {
        // given
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(600, 50_000_000_000),
            FakeInventoryReader::new(vec![gpu(GPU_ONE, "Basic GPU")]),
            PlayerProgress::default(),
        );
        assert_eq!(
            ctx.next_event().await,
            SessionEvent::StateChanged(SessionState::Disconnected)
        );

        // when
        ctx.connect(ALICE);

        // then
        assert_eq!(
            ctx.next_event().await,
            SessionEvent::StateChanged(SessionState::Connected(Activity::Loading))
        );
        let SessionEvent::Refreshed { stats, inventory } = ctx.next_event().await else {
            panic!("expected a refresh");
        };
        assert_eq!(stats.level, 2);
        assert_eq!(stats.pending_display(), "50.0000");
        assert_eq!(inventory.map(|items| items.len()), Some(1));
        ctx.wait_for(|event| {
            *event == SessionEvent::StateChanged(SessionState::Connected(Activity::Idle))
        })
        .await;
        assert_eq!(ctx.chain.accounts_queried(), vec![ALICE.to_string()]);
        assert_eq!(ctx.inventory.calls(), 1);
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn refresh__chain_down__still_exposes_inventory() {
    run_local(async {
        // given
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(0, 0),
            FakeInventoryReader::new(vec![gpu(GPU_ONE, "Basic GPU")]),
            PlayerProgress::default(),
        );
        ctx.chain.fail_with("node unreachable");
        ctx.chain.set_delay(Duration::from_secs(2));

        // when
        ctx.connect(ALICE);

        // then
        let failure = ctx
            .wait_for(|event| matches!(event, SessionEvent::LoadFailed { .. }))
            .await;
        assert!(matches!(
            failure,
            SessionEvent::LoadFailed {
                source: DataSource::Chain,
                ..
            }
        ));
        let SessionEvent::Refreshed { stats, inventory } = ctx.next_event().await else {
            panic!("expected a refresh after the failure report");
        };
        assert_eq!(stats.level, 1);
        assert_eq!(stats.coins_per_second, 0.0);
        assert_eq!(inventory.map(|items| items.len()), Some(1));
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn refresh__indexer_down__marks_inventory_unavailable() {
    run_local(async {
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(2_000, 0),
            FakeInventoryReader::new(Vec::new()),
            PlayerProgress::default(),
        );
        ctx.inventory.fail_with("indexer down");

        ctx.connect(ALICE);

        let SessionEvent::Refreshed { stats, inventory } = ctx
            .wait_for(|event| matches!(event, SessionEvent::Refreshed { .. }))
            .await
        else {
            unreachable!()
        };
        assert_eq!(stats.level, 3);
        assert_eq!(inventory, None);
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn disconnect__mid_fetch__discards_late_results() {
    run_local(async {
        // given
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(10_000, 1),
            FakeInventoryReader::new(vec![gpu(GPU_ONE, "Basic GPU")]),
            PlayerProgress::default(),
        );
        ctx.chain.set_delay(Duration::from_secs(5));
        ctx.inventory.set_delay(Duration::from_secs(5));
        ctx.connect(ALICE);
        ctx.wait_for(|event| {
            *event == SessionEvent::StateChanged(SessionState::Connected(Activity::Loading))
        })
        .await;

        // when
        ctx.disconnect();
        tokio::time::sleep(Duration::from_secs(60)).await;

        // then
        let events = ctx.drain_events();
        assert_eq!(
            events,
            vec![SessionEvent::StateChanged(SessionState::Disconnected)]
        );
        let controller = ctx.shutdown().await;
        assert_eq!(controller.snapshot(), None);
        assert_eq!(controller.inventory(), None);
        assert!(controller.progress().achievements.is_empty());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn disconnect__keeps_local_progress() {
    run_local(async {
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(10_000, 0),
            FakeInventoryReader::new(Vec::new()),
            PlayerProgress::default(),
        );
        ctx.connect(ALICE);
        ctx.wait_for(|event| matches!(event, SessionEvent::AchievementsUnlocked(_)))
            .await;

        ctx.disconnect();
        ctx.wait_for(|event| *event == SessionEvent::StateChanged(SessionState::Disconnected))
            .await;

        let controller = ctx.shutdown().await;
        assert_eq!(controller.snapshot(), None);
        assert!(!controller.progress().achievements.is_empty());
    })
    .await;
}
