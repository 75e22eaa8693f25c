//! Scripted collaborators and a running-session harness for tests.

use crate::{
    catalog::{
        NFT_COLLECTION_ADDRESS,
        STAKING_FARM_ADDRESS,
    },
    chain_reader::ChainReader,
    economy::ChainSnapshot,
    host::{
        Clock,
        HostContext,
        HostUser,
    },
    inventory_reader::{
        InventoryItem,
        InventoryReader,
    },
    persistence::{
        PROGRESS_KEY,
        progress_writer,
    },
    progress::PlayerProgress,
    session::{
        SessionCommand,
        SessionConfig,
        SessionController,
        SessionEvent,
        worker::{
            SessionServices,
            run_session,
        },
    },
    transactions::{
        TransactionBuilder,
        TransactionRequest,
    },
    wallet::{
        WalletEvent,
        WalletSession,
    },
};
use anyhow::{
    Result,
    anyhow,
};
use chrono::{
    DateTime,
    Days,
    TimeZone,
    Utc,
};
use cloud_store::InMemoryStore;
use std::{
    cell::RefCell,
    future::Future,
    rc::Rc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::{
        JoinHandle,
        LocalSet,
    },
};

pub const ALICE: &str = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";
pub const BOB: &str = "0:4f2a0c1e9d8b7a6f5e4d3c2b1a09f8e7d6c5b4a39281706f5e4d3c2b1a09f8e7";
pub const GPU_ONE: &str = "0:1f0e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";
pub const GPU_TWO: &str = "0:2e1d0c3b4a5968778695a4b3c2d1e0ff0e1d2c3b4a5968778695a4b3c2d1e0ff";

/// Generous bound on how long a test waits for a session event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(3_600);

#[derive(Clone)]
struct Scripted<T> {
    response: Result<T, String>,
    delay: Duration,
    calls: Vec<String>,
}

impl<T: Clone> Scripted<T> {
    fn new(value: T) -> Self {
        Self {
            response: Ok(value),
            delay: Duration::ZERO,
            calls: Vec::new(),
        }
    }

    /// Records the call and returns what the caller should resolve with.
    fn call(&mut self, account: &str) -> (Result<T, String>, Duration) {
        self.calls.push(account.to_string());
        (self.response.clone(), self.delay)
    }
}

async fn resolve<T>((response, delay): (Result<T, String>, Duration)) -> Result<T> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    response.map_err(|message| anyhow!(message))
}

#[derive(Clone)]
pub struct FakeChainReader {
    inner: Rc<RefCell<Scripted<ChainSnapshot>>>,
}

impl FakeChainReader {
    pub fn new(snapshot: ChainSnapshot) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Scripted::new(snapshot))),
        }
    }

    pub fn with_hash_power(hash_power: u64, pending_rewards: u64) -> Self {
        Self::new(ChainSnapshot {
            hash_power,
            pending_rewards,
        })
    }

    pub fn set_snapshot(&self, snapshot: ChainSnapshot) {
        self.inner.borrow_mut().response = Ok(snapshot);
    }

    pub fn fail_with(&self, message: &str) {
        self.inner.borrow_mut().response = Err(message.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        self.inner.borrow_mut().delay = delay;
    }

    pub fn calls(&self) -> usize {
        self.inner.borrow().calls.len()
    }

    pub fn accounts_queried(&self) -> Vec<String> {
        self.inner.borrow().calls.clone()
    }
}

impl ChainReader for FakeChainReader {
    async fn fetch_player_info(&self, account: &str) -> Result<ChainSnapshot> {
        let scripted = self.inner.borrow_mut().call(account);
        resolve(scripted).await
    }
}

#[derive(Clone)]
pub struct FakeInventoryReader {
    inner: Rc<RefCell<Scripted<Vec<InventoryItem>>>>,
}

impl FakeInventoryReader {
    pub fn new(items: Vec<InventoryItem>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Scripted::new(items))),
        }
    }

    pub fn set_items(&self, items: Vec<InventoryItem>) {
        self.inner.borrow_mut().response = Ok(items);
    }

    pub fn fail_with(&self, message: &str) {
        self.inner.borrow_mut().response = Err(message.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        self.inner.borrow_mut().delay = delay;
    }

    pub fn calls(&self) -> usize {
        self.inner.borrow().calls.len()
    }
}

impl InventoryReader for FakeInventoryReader {
    async fn fetch_owned_equipment(&self, account: &str) -> Result<Vec<InventoryItem>> {
        let scripted = self.inner.borrow_mut().call(account);
        resolve(scripted).await
    }
}

#[derive(Clone)]
pub struct FakeWallet {
    inner: Rc<RefCell<FakeWalletState>>,
}

struct FakeWalletState {
    response: Result<(), String>,
    delay: Duration,
    sent: Vec<TransactionRequest>,
}

impl Default for FakeWallet {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(FakeWalletState {
                response: Ok(()),
                delay: Duration::ZERO,
                sent: Vec::new(),
            })),
        }
    }
}

impl FakeWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_with(&self, message: &str) {
        self.inner.borrow_mut().response = Err(message.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        self.inner.borrow_mut().delay = delay;
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.inner.borrow().sent.clone()
    }
}

impl WalletSession for FakeWallet {
    async fn send_transaction(&self, request: &TransactionRequest) -> Result<()> {
        let scripted = {
            let mut state = self.inner.borrow_mut();
            state.sent.push(request.clone());
            (state.response.clone(), state.delay)
        };
        resolve(scripted).await
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct FixedClock {
    now: Rc<RefCell<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(RefCell::new(now)),
        }
    }

    pub fn at_ymd(year: i32, month: u32, day: u32) -> Self {
        let now = Utc
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .unwrap_or_default();
        Self::new(now)
    }

    pub fn advance_days(&self, days: u64) {
        let mut now = self.now.borrow_mut();
        *now = *now + Days::new(days);
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at_ymd(2026, 3, 1)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.borrow()
    }
}

pub fn transaction_builder() -> TransactionBuilder {
    TransactionBuilder::new(STAKING_FARM_ADDRESS, NFT_COLLECTION_ADDRESS)
        .unwrap_or_else(|err| panic!("catalog addresses must parse: {err}"))
}

pub fn controller(clock: FixedClock, progress: PlayerProgress) -> SessionController {
    SessionController::new(
        SessionConfig::default(),
        transaction_builder(),
        HostContext::new(clock, HostUser::default()),
        progress,
    )
}

pub fn gpu(address: &str, name: &str) -> InventoryItem {
    InventoryItem::new(address, name, "Mining hardware")
}

/// Runs `future` on a [`LocalSet`] so [`TestContext::start`] can spawn the
/// session.
pub async fn run_local<F: Future>(future: F) -> F::Output {
    LocalSet::new().run_until(future).await
}

pub struct TestContext {
    pub chain: FakeChainReader,
    pub inventory: FakeInventoryReader,
    pub wallet: FakeWallet,
    pub clock: FixedClock,
    pub store: InMemoryStore,
    wallet_tx: mpsc::UnboundedSender<WalletEvent>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    event_rx: mpsc::UnboundedReceiver<SessionEvent>,
    session: JoinHandle<SessionController>,
    writer: JoinHandle<()>,
}

impl TestContext {
    /// Must be called inside [`run_local`].
    pub fn start(config: SessionConfig) -> Self {
        Self::start_with(
            config,
            FakeChainReader::with_hash_power(0, 0),
            FakeInventoryReader::new(Vec::new()),
            PlayerProgress::default(),
        )
    }

    pub fn start_with(
        config: SessionConfig,
        chain: FakeChainReader,
        inventory: FakeInventoryReader,
        progress: PlayerProgress,
    ) -> Self {
        let wallet = FakeWallet::new();
        let clock = FixedClock::default();
        let store = InMemoryStore::new();
        let (saver, writer) = progress_writer(store.clone());
        let (wallet_tx, wallet_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let controller = SessionController::new(
            config,
            transaction_builder(),
            HostContext::new(clock.clone(), HostUser::default()),
            progress,
        );
        let services = SessionServices {
            chain: chain.clone(),
            inventory: inventory.clone(),
            wallet: wallet.clone(),
        };
        let session = tokio::task::spawn_local(run_session(
            controller, services, wallet_rx, command_rx, event_tx, saver,
        ));
        let writer = tokio::task::spawn_local(writer.run());

        Self {
            chain,
            inventory,
            wallet,
            clock,
            store,
            wallet_tx,
            command_tx,
            event_rx,
            session,
            writer,
        }
    }

    pub fn connect(&self, account: &str) {
        let _ = self.wallet_tx.send(WalletEvent::Connected {
            address: account.to_string(),
        });
    }

    pub fn disconnect(&self) {
        let _ = self.wallet_tx.send(WalletEvent::Disconnected);
    }

    pub fn send(&self, command: SessionCommand) {
        let _ = self.command_tx.send(command);
    }

    pub async fn next_event(&mut self) -> SessionEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.event_rx.recv())
            .await
            .expect("timed out waiting for a session event")
            .expect("session event channel closed")
    }

    /// Skips events until one matches.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&SessionEvent) -> bool,
    ) -> SessionEvent {
        loop {
            let event = self.next_event().await;
            if predicate(&event) {
                return event;
            }
        }
    }

    /// Events already emitted, without waiting.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Stops the session, waits for the last write and returns the final
    /// controller.
    pub async fn shutdown(self) -> SessionController {
        let _ = self.command_tx.send(SessionCommand::Shutdown);
        let controller = self.session.await.expect("session task panicked");
        self.writer.await.expect("progress writer panicked");
        controller
    }

    pub fn stored_progress(&self) -> Option<PlayerProgress> {
        let raw = self.store.snapshot(PROGRESS_KEY)?;
        serde_json::from_str(&raw).ok()
    }
}
