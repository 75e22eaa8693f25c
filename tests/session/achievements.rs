use miner_tycoon::{
    catalog::AchievementId,
    economy::ChainSnapshot,
    persistence::PROGRESS_KEY,
    progress::PlayerProgress,
    session::{
        SessionCommand,
        SessionConfig,
        SessionEvent,
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

fn is_refresh(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Refreshed { .. })
}

#[tokio::test(start_paused = true)]
async fn refresh__high_hash_power__unlocks_power_achievements() {
    run_local(async {
        // given
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(10_000, 0),
            FakeInventoryReader::new(vec![gpu(GPU_ONE, "Quantum Miner")]),
            PlayerProgress::default(),
        );

        // when
        ctx.connect(ALICE);

        // then
        let SessionEvent::AchievementsUnlocked(unlocked) = ctx
            .wait_for(|event| matches!(event, SessionEvent::AchievementsUnlocked(_)))
            .await
        else {
            unreachable!()
        };
        assert_eq!(
            unlocked,
            vec![
                AchievementId::FirstMiner,
                AchievementId::PowerUser,
                AchievementId::Tycoon,
                AchievementId::Explorer,
            ]
        );
        let store = ctx.store.clone();
        ctx.shutdown().await;
        let raw = store.snapshot(PROGRESS_KEY).expect("unlocks are persisted");
        let stored: PlayerProgress = serde_json::from_str(&raw).unwrap();
        assert!(stored.achievements.contains(&AchievementId::Tycoon));
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn refresh__hash_power_drops__keeps_earned_achievements() {
    run_local(async {
        // given
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(10_000, 0),
            FakeInventoryReader::new(Vec::new()),
            PlayerProgress::default(),
        );
        ctx.connect(ALICE);
        ctx.wait_for(|event| matches!(event, SessionEvent::AchievementsUnlocked(_)))
            .await;

        // when
        ctx.chain.set_snapshot(ChainSnapshot {
            hash_power: 100,
            pending_rewards: 0,
        });
        ctx.send(SessionCommand::Refresh);
        let SessionEvent::Refreshed { stats, .. } = ctx.wait_for(is_refresh).await else {
            unreachable!()
        };

        // then
        assert_eq!(stats.level, 1);
        let later = ctx.drain_events();
        assert!(
            !later
                .iter()
                .any(|event| matches!(event, SessionEvent::AchievementsUnlocked(_)))
        );
        let controller = ctx.shutdown().await;
        assert!(controller.progress().achievements.contains(&AchievementId::Tycoon));
        assert!(controller.progress().achievements.contains(&AchievementId::Explorer));
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn connect__already_earned__does_not_announce_again() {
    run_local(async {
        let mut progress = PlayerProgress::default();
        progress.achievements.insert(AchievementId::PowerUser);
        let mut ctx = TestContext::start_with(
            SessionConfig::default(),
            FakeChainReader::with_hash_power(1_500, 0),
            FakeInventoryReader::new(Vec::new()),
            progress,
        );

        ctx.connect(ALICE);
        ctx.wait_for(is_refresh).await;
        ctx.send(SessionCommand::Refresh);
        ctx.wait_for(is_refresh).await;

        let controller = ctx.shutdown().await;
        assert_eq!(
            controller.progress().achievements.iter().copied().collect::<Vec<_>>(),
            vec![AchievementId::PowerUser]
        );
    })
    .await;
}
