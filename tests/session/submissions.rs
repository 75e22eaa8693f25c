use miner_tycoon::{
    catalog::{
        EquipmentKind,
        NFT_COLLECTION_ADDRESS,
    },
    inventory_reader::InventoryItem,
    persistence::PROGRESS_KEY,
    progress::PlayerProgress,
    session::{
        Activity,
        ActionError,
        SessionCommand,
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
    transactions::OperationKind,
};
use std::time::Duration;
use tokio::time::Instant;

fn is_refresh(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Refreshed { .. })
}

async fn connected(chain: FakeChainReader, items: Vec<InventoryItem>) -> TestContext {
    let mut ctx = TestContext::start_with(
        SessionConfig::default(),
        chain,
        FakeInventoryReader::new(items),
        PlayerProgress::default(),
    );
    ctx.connect(ALICE);
    ctx.wait_for(|event| {
        *event == SessionEvent::StateChanged(SessionState::Connected(Activity::Idle))
    })
    .await;
    ctx
}

#[tokio::test(start_paused = true)]
async fn claim__accepted__credits_earnings_and_repolls_after_confirmation_delay() {
    run_local(async {
        // given
        let mut ctx = connected(
            FakeChainReader::with_hash_power(600, 50_000_000_000),
            Vec::new(),
        )
        .await;
        let submitted_at = Instant::now();

        // when
        ctx.send(SessionCommand::Claim);

        // then
        ctx.wait_for(|event| *event == SessionEvent::TransactionSubmitted(OperationKind::Claim))
            .await;
        assert_eq!(ctx.chain.calls(), 1);
        ctx.wait_for(is_refresh).await;
        let waited = submitted_at.elapsed();
        assert!(waited >= Duration::from_secs(15) && waited < Duration::from_secs(16));
        assert_eq!(ctx.chain.calls(), 2);

        let sent = ctx.wallet.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].messages[0].amount, "50000000");

        let controller = ctx.shutdown().await;
        assert!((controller.progress().total_earnings - 50.0).abs() < 1e-9);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn claim__accepted__persists_credited_progress() {
    run_local(async {
        let mut ctx = connected(
            FakeChainReader::with_hash_power(600, 1_000_000_000),
            Vec::new(),
        )
        .await;

        ctx.send(SessionCommand::Claim);
        ctx.wait_for(|event| matches!(event, SessionEvent::TransactionSubmitted(_)))
            .await;
        let store = ctx.store.clone();
        ctx.shutdown().await;

        let raw = store.snapshot(PROGRESS_KEY).expect("progress was persisted");
        let stored: PlayerProgress = serde_json::from_str(&raw).unwrap();
        assert!((stored.total_earnings - 1.0).abs() < 1e-9);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn submission__second_while_processing__is_rejected_as_busy() {
    run_local(async {
        // given
        let mut ctx = connected(FakeChainReader::with_hash_power(0, 0), Vec::new()).await;
        ctx.wallet.set_delay(Duration::from_secs(5));
        ctx.send(SessionCommand::Mint(EquipmentKind::Basic));

        // when
        ctx.send(SessionCommand::Mint(EquipmentKind::Advanced));

        // then
        let rejected = ctx
            .wait_for(|event| matches!(event, SessionEvent::ActionRejected(_)))
            .await;
        assert_eq!(rejected, SessionEvent::ActionRejected(ActionError::Busy));
        ctx.wait_for(|event| {
            *event == SessionEvent::TransactionSubmitted(OperationKind::Mint(EquipmentKind::Basic))
        })
        .await;
        assert_eq!(ctx.wallet.sent().len(), 1);
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn stake__placeholder_item__never_reaches_the_wallet() {
    run_local(async {
        // given
        let placeholder = InventoryItem::placeholder(NFT_COLLECTION_ADDRESS, 0);
        let mut ctx = connected(
            FakeChainReader::with_hash_power(0, 0),
            vec![placeholder.clone()],
        )
        .await;

        // when
        ctx.send(SessionCommand::Stake {
            item_address: placeholder.address.clone(),
        });

        // then
        let rejected = ctx
            .wait_for(|event| matches!(event, SessionEvent::ActionRejected(_)))
            .await;
        assert_eq!(
            rejected,
            SessionEvent::ActionRejected(ActionError::PlaceholderItem(placeholder.address))
        );
        assert!(ctx.wallet.sent().is_empty());
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn stake__indexed_item__is_sent_to_the_item_address() {
    run_local(async {
        let mut ctx = connected(
            FakeChainReader::with_hash_power(0, 0),
            vec![gpu(GPU_ONE, "Basic GPU")],
        )
        .await;

        ctx.send(SessionCommand::Stake {
            item_address: GPU_ONE.to_string(),
        });
        ctx.wait_for(|event| *event == SessionEvent::TransactionSubmitted(OperationKind::Stake))
            .await;

        let sent = ctx.wallet.sent();
        assert_eq!(sent[0].messages[0].address, GPU_ONE);
        assert_eq!(sent[0].messages[0].amount, "100000000");
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn submission__wallet_rejects__reports_failure_and_returns_to_idle() {
    run_local(async {
        // given
        let mut ctx = connected(FakeChainReader::with_hash_power(2_000, 0), Vec::new()).await;
        ctx.wallet.reject_with("user declined");

        // when
        ctx.send(SessionCommand::Mint(EquipmentKind::Quantum));

        // then
        let failed = ctx
            .wait_for(|event| matches!(event, SessionEvent::TransactionFailed { .. }))
            .await;
        assert_eq!(
            failed,
            SessionEvent::TransactionFailed {
                kind: OperationKind::Mint(EquipmentKind::Quantum),
                message: "user declined".to_string(),
            }
        );
        ctx.wait_for(|event| {
            *event == SessionEvent::StateChanged(SessionState::Connected(Activity::Idle))
        })
        .await;
        assert_eq!(ctx.chain.calls(), 1);

        ctx.send(SessionCommand::Mint(EquipmentKind::Basic));
        let next = ctx
            .wait_for(|event| {
                matches!(
                    event,
                    SessionEvent::TransactionFailed { .. } | SessionEvent::ActionRejected(_)
                )
            })
            .await;
        assert!(matches!(next, SessionEvent::TransactionFailed { .. }));
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn claim__without_pending_rewards__is_rejected() {
    run_local(async {
        let mut ctx = connected(FakeChainReader::with_hash_power(600, 0), Vec::new()).await;

        ctx.send(SessionCommand::Claim);

        let rejected = ctx
            .wait_for(|event| matches!(event, SessionEvent::ActionRejected(_)))
            .await;
        assert_eq!(
            rejected,
            SessionEvent::ActionRejected(ActionError::NothingToClaim)
        );
        assert!(ctx.wallet.sent().is_empty());
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn mint__tier_above_player_level__never_reaches_the_wallet() {
    run_local(async {
        // given
        let mut ctx = connected(FakeChainReader::with_hash_power(600, 0), Vec::new()).await;

        // when
        ctx.send(SessionCommand::Mint(EquipmentKind::Fusion));

        // then
        let rejected = ctx
            .wait_for(|event| matches!(event, SessionEvent::ActionRejected(_)))
            .await;
        assert_eq!(
            rejected,
            SessionEvent::ActionRejected(ActionError::EquipmentLocked {
                kind: EquipmentKind::Fusion,
                required_level: 4,
            })
        );
        assert!(ctx.wallet.sent().is_empty());
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn claim__same_account_reconnects_while_pending__still_credits_once() {
    run_local(async {
        // given
        let mut ctx = connected(
            FakeChainReader::with_hash_power(600, 50_000_000_000),
            Vec::new(),
        )
        .await;
        ctx.wallet.set_delay(Duration::from_secs(5));
        ctx.send(SessionCommand::Claim);

        // when
        ctx.connect(ALICE);
        ctx.send(SessionCommand::Claim);

        // then
        let rejected = ctx
            .wait_for(|event| matches!(event, SessionEvent::ActionRejected(_)))
            .await;
        assert_eq!(rejected, SessionEvent::ActionRejected(ActionError::Busy));
        ctx.wait_for(|event| *event == SessionEvent::TransactionSubmitted(OperationKind::Claim))
            .await;
        assert_eq!(ctx.wallet.sent().len(), 1);
        let controller = ctx.shutdown().await;
        assert!((controller.progress().total_earnings - 50.0).abs() < 1e-9);
    })
    .await;
}
