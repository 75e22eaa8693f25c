use miner_tycoon::{
    session::{
        ActionError,
        SessionCommand,
        SessionConfig,
        SessionEvent,
    },
    test_helpers::{
        ALICE,
        TestContext,
        run_local,
    },
};
use std::time::Duration;
use tokio::time::Instant;

fn is_refresh(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Refreshed { .. })
}

/// Paused-clock deadlines land on whole milliseconds.
fn assert_elapsed(started: Instant, secs: u64) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs + 1),
        "expected ~{secs}s to pass, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn poll_interval__refetches_while_connected() {
    run_local(async {
        // given
        let mut ctx = TestContext::start(SessionConfig::default());
        let started = Instant::now();
        ctx.connect(ALICE);
        ctx.wait_for(is_refresh).await;
        assert_eq!(ctx.chain.calls(), 1);

        // when
        ctx.wait_for(is_refresh).await;

        // then
        assert_elapsed(started, 30);
        assert_eq!(ctx.chain.calls(), 2);
        assert_eq!(ctx.inventory.calls(), 2);
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn poll_interval__custom_cadence_is_honoured() {
    run_local(async {
        let mut ctx = TestContext::start(SessionConfig {
            poll_interval: Duration::from_secs(5),
            ..SessionConfig::default()
        });
        let started = Instant::now();
        ctx.connect(ALICE);

        for _ in 0..4 {
            ctx.wait_for(is_refresh).await;
        }

        assert_elapsed(started, 15);
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn manual_refresh__restarts_the_interval() {
    run_local(async {
        // given
        let mut ctx = TestContext::start(SessionConfig::default());
        let started = Instant::now();
        ctx.connect(ALICE);
        ctx.wait_for(is_refresh).await;
        tokio::time::sleep(Duration::from_secs(20)).await;

        // when
        ctx.send(SessionCommand::Refresh);
        ctx.wait_for(is_refresh).await;
        assert_elapsed(started, 20);

        // then
        ctx.wait_for(is_refresh).await;
        assert_elapsed(started, 50);
        assert_eq!(ctx.chain.calls(), 3);
        ctx.shutdown().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn poll_interval__is_idle_while_disconnected() {
    run_local(async {
        let mut ctx = TestContext::start(SessionConfig::default());

        tokio::time::sleep(Duration::from_secs(120)).await;
        ctx.send(SessionCommand::Refresh);
        let rejected = ctx
            .wait_for(|event| matches!(event, SessionEvent::ActionRejected(_)))
            .await;

        assert_eq!(
            rejected,
            SessionEvent::ActionRejected(ActionError::NotConnected)
        );
        assert_eq!(ctx.chain.calls(), 0);
        ctx.shutdown().await;
    })
    .await;
}
