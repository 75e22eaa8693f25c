use crate::{
    AppConfig,
    commands::{
        HELP,
        Input,
        parse_line,
    },
    wallet::DeepLinkWallet,
};
use cloud_store::FileStore;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use miner_tycoon::{
    catalog::{
        EquipmentKind,
        NFT_COLLECTION_ADDRESS,
        STAKING_FARM_ADDRESS,
        achievement,
    },
    chain_reader::TonCenterClient,
    economy::{
        PlayerStats,
        format_token_amount,
    },
    host::{
        HostContext,
        HostUser,
    },
    inventory_reader::{
        InventoryItem,
        TonApiClient,
    },
    minigames::{
        Minigame,
        puzzle_reward,
        spin,
    },
    persistence::{
        load_progress,
        progress_writer,
    },
    session::{
        SessionCommand,
        SessionController,
        SessionEvent,
        worker::{
            SessionServices,
            run_session,
        },
    },
    transactions::TransactionBuilder,
    wallet::WalletEvent,
};
use tokio::{
    io::{
        AsyncBufReadExt,
        BufReader,
    },
    sync::mpsc,
};

pub async fn run_app(config: AppConfig) -> Result<()> {
    let store = FileStore::open(config.data_dir.join("store"))
        .await
        .map_err(|err| eyre!("{err:#}"))?;
    let progress = load_progress(&store).await;

    let chain = TonCenterClient::new(&config.rpc_url, STAKING_FARM_ADDRESS, config.api_key)
        .map_err(|err| eyre!("{err:#}"))?;
    let inventory = TonApiClient::new(&config.indexer_url, NFT_COLLECTION_ADDRESS)
        .map_err(|err| eyre!("{err:#}"))?;
    let builder = TransactionBuilder::new(STAKING_FARM_ADDRESS, NFT_COLLECTION_ADDRESS)
        .wrap_err("catalog contract addresses are invalid")?;
    let host = HostContext::system(HostUser {
        id: std::env::var("USER").ok(),
        display_name: None,
    });

    println!("welcome, {}", host.user.greeting_name());
    println!("{HELP}");

    let controller = SessionController::new(config.session, builder, host, progress);
    let services = SessionServices {
        chain,
        inventory,
        wallet: DeepLinkWallet,
    };
    let (saver, writer) = progress_writer(store);
    let (wallet_tx, wallet_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    if let Some(account) = config.account {
        let _ = wallet_tx.send(WalletEvent::Connected { address: account });
    }

    let session = run_session(controller, services, wallet_rx, command_rx, event_tx, saver);
    let (controller, (), (), input) = tokio::join!(
        session,
        writer.run(),
        print_events(event_rx),
        read_input(wallet_tx, command_tx),
    );
    tracing::info!(
        total_earnings = controller.progress().total_earnings,
        "session closed"
    );
    input
}

/// Feeds stdin lines to the session until `quit`, end of input or Ctrl-C.
async fn read_input(
    wallet_tx: mpsc::UnboundedSender<WalletEvent>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rng = rand::rng();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.wrap_err("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received interrupt, exiting");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        let input = match parse_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        let command = match input {
            Input::Connect(address) => {
                let _ = wallet_tx.send(WalletEvent::Connecting);
                let _ = wallet_tx.send(WalletEvent::Connected { address });
                continue;
            }
            Input::Disconnect => {
                let _ = wallet_tx.send(WalletEvent::Disconnected);
                continue;
            }
            Input::Session(command) => command,
            Input::Click(taps) => SessionCommand::RecordMinigame {
                game: Minigame::Clicker,
                amount: f64::from(taps),
            },
            Input::Slots => {
                let outcome = spin(&mut rng);
                println!("{:?} pays {:.2} TMT", outcome.reels, outcome.payout);
                SessionCommand::RecordMinigame {
                    game: Minigame::Slots,
                    amount: outcome.payout,
                }
            }
            Input::Puzzle(moves) => SessionCommand::RecordMinigame {
                game: Minigame::Puzzle,
                amount: puzzle_reward(moves),
            },
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Quit => break,
        };
        if command_tx.send(command).is_err() {
            break;
        }
    }
    let _ = command_tx.send(SessionCommand::Shutdown);
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::StateChanged(state) => println!("[{state:?}]"),
            SessionEvent::Refreshed { stats, inventory } => {
                print_stats(&stats);
                print_inventory(inventory.as_deref());
            }
            SessionEvent::LoadFailed { source, message } => {
                println!("{} data unavailable: {message}", source.label());
            }
            SessionEvent::AchievementsUnlocked(ids) => {
                for id in ids {
                    let unlocked = achievement(id);
                    println!("achievement unlocked: {} ({})", unlocked.name, unlocked.description);
                }
            }
            SessionEvent::FarmSelected { farm, stats } => {
                println!("now mining at {}", farm.site().name);
                print_stats(&stats);
            }
            SessionEvent::DailyClaimed(claim) => println!(
                "day {} reward: {} TMT (next streak day {})",
                claim.day, claim.reward, claim.next_streak
            ),
            SessionEvent::MinigameRecorded {
                game,
                total_earnings,
            } => println!("{game} recorded, total earnings {total_earnings:.3} TMT"),
            SessionEvent::TransactionSubmitted(kind) => {
                println!("{kind:?} submitted, stats refresh once it confirms")
            }
            SessionEvent::TransactionFailed { kind, message } => {
                println!("{kind:?} failed: {message}")
            }
            SessionEvent::ActionRejected(err) => println!("{err}"),
        }
    }
}

fn print_stats(stats: &PlayerStats) {
    println!(
        "level {} | {} H/s | {:.4} TMT/s at {} | pending {} TMT",
        stats.level,
        stats.hash_power,
        stats.coins_per_second,
        stats.selected_farm.site().name,
        stats.pending_display(),
    );
}

fn print_inventory(inventory: Option<&[InventoryItem]>) {
    let Some(items) = inventory else {
        println!("inventory unavailable");
        return;
    };
    if items.is_empty() {
        let prices = EquipmentKind::ALL
            .iter()
            .map(|kind| {
                let spec = kind.spec();
                format!(
                    "{} ({} H/s, {} TON)",
                    spec.name,
                    spec.hash_power,
                    format_token_amount(spec.price)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!("no equipment yet; mint one of: {prices}");
        return;
    }
    for item in items {
        let marker = if item.is_placeholder() { " (pending index)" } else { "" };
        println!("  {} {}{marker}", item.address, item.name);
    }
}
