use super::{
    ActionError,
    RefreshOutcome,
    RefreshTicket,
    SessionCommand,
    SessionController,
    SessionEvent,
    SubmissionReport,
    SubmissionTicket,
    SubmitAction,
};
use crate::{
    catalog::AchievementId,
    chain_reader::ChainReader,
    inventory_reader::InventoryReader,
    persistence::ProgressSaver,
    wallet::{
        WalletEvent,
        WalletSession,
    },
};
use futures::{
    FutureExt,
    StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};
use tokio::{
    sync::mpsc,
    time::{
        self,
        Instant,
        Interval,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

/// External collaborators the session talks to.
pub struct SessionServices<C, I, W> {
    pub chain: C,
    pub inventory: I,
    pub wallet: W,
}

enum TaskOutput {
    Refresh(RefreshTicket, RefreshOutcome),
    Submission(SubmissionTicket, anyhow::Result<()>),
}

struct Worker<'a, C, I, W> {
    services: &'a SessionServices<C, I, W>,
    controller: SessionController,
    tasks: FuturesUnordered<LocalBoxFuture<'a, TaskOutput>>,
    ticker: Interval,
    confirm_at: Option<Instant>,
    events: mpsc::UnboundedSender<SessionEvent>,
    saver: ProgressSaver,
}

/// Drives `controller` until a [`SessionCommand::Shutdown`] arrives or the
/// command channel closes, then hands the controller back.
///
/// Refreshes and wallet submissions run as in-flight tasks so wallet events
/// and commands are still handled while I/O is pending.
pub async fn run_session<C, I, W>(
    controller: SessionController,
    services: SessionServices<C, I, W>,
    mut wallet_events: mpsc::UnboundedReceiver<WalletEvent>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    saver: ProgressSaver,
) -> SessionController
where
    C: ChainReader,
    I: InventoryReader,
    W: WalletSession,
{
    let poll_interval = controller.config().poll_interval;
    let mut ticker = time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut worker = Worker {
        services: &services,
        controller,
        tasks: FuturesUnordered::new(),
        ticker,
        confirm_at: None,
        events,
        saver,
    };
    let mut wallet_open = true;
    let mut last_state = worker.controller.state();
    worker.emit(SessionEvent::StateChanged(last_state));

    loop {
        tokio::select! {
            event = wallet_events.recv(), if wallet_open => match event {
                Some(event) => worker.on_wallet_event(event),
                None => {
                    debug!("wallet event stream closed");
                    wallet_open = false;
                }
            },
            command = commands.recv() => match command {
                None | Some(SessionCommand::Shutdown) => break,
                Some(command) => worker.on_command(command),
            },
            Some(output) = worker.tasks.next(), if !worker.tasks.is_empty() => match output {
                TaskOutput::Refresh(ticket, outcome) => worker.on_refreshed(ticket, outcome),
                TaskOutput::Submission(ticket, result) => worker.on_submitted(ticket, result),
            },
            _ = worker.ticker.tick(), if worker.controller.is_connected() => {
                debug!("poll interval elapsed");
                worker.start_refresh();
            }
            _ = sleep_until_deadline(worker.confirm_at) => {
                debug!("confirmation delay elapsed");
                worker.confirm_at = None;
                worker.start_refresh();
            }
        }

        let state = worker.controller.state();
        if state != last_state {
            last_state = state;
            worker.emit(SessionEvent::StateChanged(state));
        }
    }

    info!("session stopped");
    let Worker { controller, .. } = worker;
    controller
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<'a, C, I, W> Worker<'a, C, I, W>
where
    C: ChainReader,
    I: InventoryReader,
    W: WalletSession,
{
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn emit_unlocked(&self, unlocked: Vec<AchievementId>) {
        if !unlocked.is_empty() {
            info!(?unlocked, "achievements unlocked");
            self.emit(SessionEvent::AchievementsUnlocked(unlocked));
        }
    }

    fn persist(&self) {
        self.saver.save(self.controller.progress());
    }

    fn on_wallet_event(&mut self, event: WalletEvent) {
        match event {
            WalletEvent::Connecting => self.controller.wallet_connecting(),
            WalletEvent::Connected { address } => {
                if self.controller.account() != Some(address.as_str()) {
                    self.confirm_at = None;
                }
                let ticket = self.controller.wallet_connected(address);
                self.spawn_refresh(ticket);
            }
            WalletEvent::Disconnected => {
                self.confirm_at = None;
                self.controller.wallet_disconnected();
            }
        }
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Refresh => {
                if !self.start_refresh() {
                    self.emit(SessionEvent::ActionRejected(ActionError::NotConnected));
                }
            }
            SessionCommand::SelectFarm(farm) => match self.controller.select_farm(farm) {
                Ok(()) => {
                    self.persist();
                    self.emit(SessionEvent::FarmSelected {
                        farm,
                        stats: self.controller.stats(),
                    });
                }
                Err(err) => self.reject(err),
            },
            SessionCommand::Claim => self.submit(SubmitAction::Claim),
            SessionCommand::Stake { item_address } => {
                self.submit(SubmitAction::Stake { item_address })
            }
            SessionCommand::Mint(kind) => self.submit(SubmitAction::Mint(kind)),
            SessionCommand::ClaimDaily => match self.controller.claim_daily() {
                Ok((claim, unlocked)) => {
                    self.persist();
                    info!(day = claim.day, reward = claim.reward, "daily reward claimed");
                    self.emit(SessionEvent::DailyClaimed(claim));
                    self.emit_unlocked(unlocked);
                }
                Err(err) => self.reject(err),
            },
            SessionCommand::RecordMinigame { game, amount } => {
                let unlocked = self.controller.record_minigame(game, amount);
                self.persist();
                self.emit(SessionEvent::MinigameRecorded {
                    game,
                    total_earnings: self.controller.progress().total_earnings,
                });
                self.emit_unlocked(unlocked);
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn reject(&self, err: ActionError) {
        info!(%err, "action rejected");
        self.emit(SessionEvent::ActionRejected(err));
    }

    /// Starts a full refetch and restarts the poll interval. Returns `false`
    /// when no wallet is connected.
    fn start_refresh(&mut self) -> bool {
        match self.controller.begin_refresh() {
            Some(ticket) => {
                self.spawn_refresh(ticket);
                true
            }
            None => false,
        }
    }

    fn spawn_refresh(&mut self, ticket: RefreshTicket) {
        self.ticker.reset();
        let services = self.services;
        self.tasks.push(
            async move {
                let (snapshot, inventory) = tokio::join!(
                    services.chain.fetch_player_info(&ticket.account),
                    services.inventory.fetch_owned_equipment(&ticket.account),
                );
                TaskOutput::Refresh(
                    ticket,
                    RefreshOutcome {
                        snapshot,
                        inventory,
                    },
                )
            }
            .boxed_local(),
        );
    }

    fn submit(&mut self, action: SubmitAction) {
        let ticket = match self.controller.begin_submission(action) {
            Ok(ticket) => ticket,
            Err(err) => return self.reject(err),
        };
        let services = self.services;
        self.tasks.push(
            async move {
                let result = services.wallet.send_transaction(&ticket.request).await;
                TaskOutput::Submission(ticket, result)
            }
            .boxed_local(),
        );
    }

    fn on_refreshed(&mut self, ticket: RefreshTicket, outcome: RefreshOutcome) {
        let Some(report) = self.controller.apply_refresh(&ticket, outcome) else {
            return;
        };
        for (source, message) in report.failures {
            warn!(?source, %message, "refresh half failed");
            self.emit(SessionEvent::LoadFailed { source, message });
        }
        debug!(
            hash_power = report.stats.hash_power,
            pending = report.stats.pending_rewards,
            "refresh applied"
        );
        self.emit(SessionEvent::Refreshed {
            stats: report.stats,
            inventory: report.inventory,
        });
        if !report.unlocked.is_empty() {
            self.persist();
        }
        self.emit_unlocked(report.unlocked);
    }

    fn on_submitted(&mut self, ticket: SubmissionTicket, result: anyhow::Result<()>) {
        match self.controller.finish_submission(&ticket, result) {
            SubmissionReport::Discarded => {}
            SubmissionReport::Accepted {
                kind,
                progress_changed,
                unlocked,
            } => {
                let delay = self.controller.config().confirmation_delay;
                info!(?kind, ?delay, "wallet accepted transaction, re-polling after delay");
                self.confirm_at = Some(Instant::now() + delay);
                if progress_changed || !unlocked.is_empty() {
                    self.persist();
                }
                self.emit(SessionEvent::TransactionSubmitted(kind));
                self.emit_unlocked(unlocked);
            }
            SubmissionReport::Failed { kind, message } => {
                warn!(?kind, %message, "transaction failed");
                self.emit(SessionEvent::TransactionFailed { kind, message });
            }
        }
    }
}
