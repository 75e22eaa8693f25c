//! Connection and polling state for one player.
//!
//! [`SessionController`] is the synchronous state machine: it owns the chain
//! snapshot, the inventory and the [`PlayerProgress`] record and decides
//! which actions are allowed. [`worker::run_session`] drives it from wallet
//! events, user commands, in-flight I/O and timers.

use crate::{
    catalog::{
        AchievementId,
        EquipmentKind,
        FarmId,
    },
    economy::{
        ChainSnapshot,
        PlayerStats,
        compute_stats,
        evaluate_achievements,
    },
    host::HostContext,
    inventory_reader::InventoryItem,
    minigames::Minigame,
    progress::{
        DailyClaim,
        PlayerProgress,
        ProgressError,
    },
    transactions::{
        OperationKind,
        TransactionBuilder,
        TransactionError,
        TransactionRequest,
    },
};
use std::time::Duration;
use thiserror::Error;
use tracing::{
    debug,
    info,
};

pub mod worker;


pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_secs(15);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Activity {
    Idle,
    Loading,
    Processing,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected(Activity),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Background refetch cadence while connected.
    pub poll_interval: Duration,
    /// Wait after a wallet accepts a transaction before re-reading the chain.
    pub confirmation_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_delay: DEFAULT_CONFIRMATION_DELAY,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    Refresh,
    SelectFarm(FarmId),
    Claim,
    Stake { item_address: String },
    Mint(EquipmentKind),
    ClaimDaily,
    RecordMinigame { game: Minigame, amount: f64 },
    Shutdown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataSource {
    Chain,
    Inventory,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            DataSource::Chain => "chain",
            DataSource::Inventory => "inventory",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// `inventory` is `None` when the indexer and its fallback both failed.
    Refreshed {
        stats: PlayerStats,
        inventory: Option<Vec<InventoryItem>>,
    },
    LoadFailed {
        source: DataSource,
        message: String,
    },
    AchievementsUnlocked(Vec<AchievementId>),
    FarmSelected {
        farm: FarmId,
        stats: PlayerStats,
    },
    DailyClaimed(DailyClaim),
    MinigameRecorded {
        game: Minigame,
        total_earnings: f64,
    },
    TransactionSubmitted(OperationKind),
    TransactionFailed {
        kind: OperationKind,
        message: String,
    },
    ActionRejected(ActionError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("connect a wallet first")]
    NotConnected,
    #[error("another transaction is still processing")]
    Busy,
    #[error("no pending rewards to claim")]
    NothingToClaim,
    #[error("item {0} is not in the current inventory")]
    UnknownItem(String),
    #[error("{0} is not verified on chain yet and cannot be staked")]
    PlaceholderItem(String),
    #[error("{kind:?} equipment unlocks at level {required_level}")]
    EquipmentLocked {
        kind: EquipmentKind,
        required_level: u8,
    },
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitAction {
    Claim,
    Stake { item_address: String },
    Mint(EquipmentKind),
}

/// Identifies a refresh issued under one connection epoch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefreshTicket {
    pub epoch: u64,
    pub account: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionTicket {
    pub epoch: u64,
    pub kind: OperationKind,
    pub request: TransactionRequest,
    /// Pending rewards (nanoton) visible when a claim was submitted.
    pub claimable: u64,
}

/// Both halves of a refresh; each side fails independently.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub snapshot: anyhow::Result<ChainSnapshot>,
    pub inventory: anyhow::Result<Vec<InventoryItem>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RefreshReport {
    pub stats: PlayerStats,
    pub inventory: Option<Vec<InventoryItem>>,
    pub failures: Vec<(DataSource, String)>,
    pub unlocked: Vec<AchievementId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmissionReport {
    /// The connection changed while the wallet was deciding.
    Discarded,
    Accepted {
        kind: OperationKind,
        progress_changed: bool,
        unlocked: Vec<AchievementId>,
    },
    Failed {
        kind: OperationKind,
        message: String,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Connection {
    Disconnected,
    Connecting,
    Connected { account: String },
}

pub struct SessionController {
    config: SessionConfig,
    builder: TransactionBuilder,
    host: HostContext,
    connection: Connection,
    epoch: u64,
    refreshes_in_flight: usize,
    processing: Option<OperationKind>,
    snapshot: Option<ChainSnapshot>,
    inventory: Option<Vec<InventoryItem>>,
    progress: PlayerProgress,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        builder: TransactionBuilder,
        host: HostContext,
        progress: PlayerProgress,
    ) -> Self {
        Self {
            config,
            builder,
            host,
            connection: Connection::Disconnected,
            epoch: 0,
            refreshes_in_flight: 0,
            processing: None,
            snapshot: None,
            inventory: None,
            progress,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    pub fn state(&self) -> SessionState {
        match &self.connection {
            Connection::Disconnected => SessionState::Disconnected,
            Connection::Connecting => SessionState::Connecting,
            Connection::Connected { .. } if self.processing.is_some() => {
                SessionState::Connected(Activity::Processing)
            }
            Connection::Connected { .. } if self.refreshes_in_flight > 0 => {
                SessionState::Connected(Activity::Loading)
            }
            Connection::Connected { .. } => SessionState::Connected(Activity::Idle),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected { .. })
    }

    pub fn account(&self) -> Option<&str> {
        match &self.connection {
            Connection::Connected { account } => Some(account),
            _ => None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> Option<&ChainSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn inventory(&self) -> Option<&[InventoryItem]> {
        self.inventory.as_deref()
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    pub fn stats(&self) -> PlayerStats {
        compute_stats(self.snapshot.as_ref(), self.progress.selected_farm)
    }

    pub fn wallet_connecting(&mut self) {
        if matches!(self.connection, Connection::Disconnected) {
            self.connection = Connection::Connecting;
        }
    }

    /// Starts a new connection epoch and returns the ticket for the initial
    /// fetch. Reconnecting the account that is already connected keeps the
    /// epoch and any in-flight submission and only starts a refresh.
    pub fn wallet_connected(&mut self, account: String) -> RefreshTicket {
        if self.account() == Some(account.as_str()) {
            debug!(%account, epoch = self.epoch, "wallet reconnected to same account");
            self.refreshes_in_flight += 1;
            return self.refresh_ticket();
        }
        self.snapshot = None;
        self.inventory = None;
        self.next_epoch();
        info!(%account, epoch = self.epoch, "wallet connected");
        self.connection = Connection::Connected { account };
        self.refreshes_in_flight = 1;
        self.refresh_ticket()
    }

    /// Drops all chain-derived data. Progress is kept.
    pub fn wallet_disconnected(&mut self) {
        if matches!(self.connection, Connection::Disconnected) {
            return;
        }
        self.next_epoch();
        info!(epoch = self.epoch, "wallet disconnected");
        self.connection = Connection::Disconnected;
        self.snapshot = None;
        self.inventory = None;
    }

    /// `None` while no wallet is connected.
    pub fn begin_refresh(&mut self) -> Option<RefreshTicket> {
        if !self.is_connected() {
            return None;
        }
        self.refreshes_in_flight += 1;
        Some(self.refresh_ticket())
    }

    /// Applies a finished refresh. Results from an earlier epoch are dropped
    /// and yield `None`. The snapshot is replaced wholesale and a failed
    /// half becomes unavailable rather than keeping stale data.
    pub fn apply_refresh(
        &mut self,
        ticket: &RefreshTicket,
        outcome: RefreshOutcome,
    ) -> Option<RefreshReport> {
        if ticket.epoch != self.epoch {
            debug!(
                ticket_epoch = ticket.epoch,
                epoch = self.epoch,
                "discarding refresh from a previous connection"
            );
            return None;
        }
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);

        let mut failures = Vec::new();
        self.snapshot = match outcome.snapshot {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                failures.push((DataSource::Chain, format!("{err:#}")));
                None
            }
        };
        self.inventory = match outcome.inventory {
            Ok(items) => Some(items),
            Err(err) => {
                failures.push((DataSource::Inventory, format!("{err:#}")));
                None
            }
        };
        let unlocked = self.check_achievements();
        Some(RefreshReport {
            stats: self.stats(),
            inventory: self.inventory.clone(),
            failures,
            unlocked,
        })
    }

    /// Validates and encodes a wallet request, entering `Processing` on
    /// success. Nothing is built for a rejected action.
    pub fn begin_submission(
        &mut self,
        action: SubmitAction,
    ) -> Result<SubmissionTicket, ActionError> {
        let Connection::Connected { account } = &self.connection else {
            return Err(ActionError::NotConnected);
        };
        if self.processing.is_some() {
            return Err(ActionError::Busy);
        }
        let query_id = self.host.clock.unix_millis();
        let mut claimable = 0;
        let prepared = match action {
            SubmitAction::Claim => {
                claimable = self
                    .snapshot
                    .map(|snapshot| snapshot.pending_rewards)
                    .unwrap_or_default();
                if claimable == 0 {
                    return Err(ActionError::NothingToClaim);
                }
                self.builder.claim(query_id)?
            }
            SubmitAction::Stake { item_address } => {
                let item = self
                    .inventory
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .find(|item| item.address == item_address)
                    .ok_or(ActionError::UnknownItem(item_address))?;
                if item.is_placeholder() {
                    return Err(ActionError::PlaceholderItem(item.address.clone()));
                }
                self.builder.stake(item, account, query_id)?
            }
            SubmitAction::Mint(kind) => {
                let required_level = kind.spec().level;
                if self.stats().level < required_level {
                    return Err(ActionError::EquipmentLocked {
                        kind,
                        required_level,
                    });
                }
                self.builder.mint(kind, account, query_id)?
            }
        };
        let kind = prepared.kind;
        let request = prepared.into_request(self.host.clock.unix_seconds());
        self.processing = Some(kind);
        info!(?kind, "transaction handed to wallet");
        Ok(SubmissionTicket {
            epoch: self.epoch,
            kind,
            request,
            claimable,
        })
    }

    /// Leaves `Processing` whatever the wallet answered.
    pub fn finish_submission(
        &mut self,
        ticket: &SubmissionTicket,
        result: anyhow::Result<()>,
    ) -> SubmissionReport {
        if ticket.epoch != self.epoch {
            debug!(kind = ?ticket.kind, "discarding wallet answer from a previous connection");
            return SubmissionReport::Discarded;
        }
        self.processing = None;
        match result {
            Ok(()) => {
                let progress_changed = ticket.kind == OperationKind::Claim;
                if progress_changed {
                    self.progress.credit_claimed_rewards(ticket.claimable);
                }
                SubmissionReport::Accepted {
                    kind: ticket.kind,
                    progress_changed,
                    unlocked: self.check_achievements(),
                }
            }
            Err(err) => SubmissionReport::Failed {
                kind: ticket.kind,
                message: format!("{err:#}"),
            },
        }
    }

    pub fn select_farm(&mut self, farm: FarmId) -> Result<(), ActionError> {
        let stats = self.stats();
        self.progress.select_farm(farm, &stats)?;
        Ok(())
    }

    pub fn claim_daily(&mut self) -> Result<(DailyClaim, Vec<AchievementId>), ActionError> {
        let claim = self.progress.claim_daily(self.host.clock.today())?;
        Ok((claim, self.check_achievements()))
    }

    pub fn record_minigame(&mut self, game: Minigame, amount: f64) -> Vec<AchievementId> {
        self.progress.record_minigame_result(game, amount);
        self.check_achievements()
    }

    /// Records achievements whose predicates now hold and returns the new
    /// ones.
    pub fn check_achievements(&mut self) -> Vec<AchievementId> {
        let inventory_count = self.inventory.as_ref().map_or(0, Vec::len);
        let reached =
            evaluate_achievements(self.snapshot.as_ref(), inventory_count, &self.progress);
        self.progress.unlock_achievements(reached)
    }

    fn next_epoch(&mut self) {
        self.epoch += 1;
        self.refreshes_in_flight = 0;
        self.processing = None;
    }

    fn refresh_ticket(&self) -> RefreshTicket {
        RefreshTicket {
            epoch: self.epoch,
            account: self.account().unwrap_or_default().to_string(),
        }
    }
}
