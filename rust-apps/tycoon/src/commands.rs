use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use miner_tycoon::{
    catalog::{
        EquipmentKind,
        FarmId,
    },
    session::SessionCommand,
};

pub const HELP: &str = "\
commands:
  connect <address>   pair a wallet address
  disconnect          forget the wallet (local progress stays)
  refresh             refetch chain stats and inventory now
  farm <name>         select earth, arctic, desert or space
  claim               claim pending staking rewards
  stake <item>        stake an owned equipment NFT by address
  mint <kind>         buy basic, advanced, quantum or fusion equipment
  daily               collect today's streak reward
  click [taps]        record a clicker round
  slots               spin the slot machine
  puzzle <moves>      record a solved puzzle
  help                show this text
  quit                exit";

/// One line of user input.
#[derive(Debug, PartialEq)]
pub enum Input {
    Connect(String),
    Disconnect,
    Session(SessionCommand),
    Click(u32),
    Slots,
    Puzzle(u32),
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Option<Input>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        return Err(eyre!("unexpected argument '{extra}'"));
    }
    let required = |name: &str| arg.ok_or_else(|| eyre!("'{verb}' needs a {name}"));

    let input = match verb.to_ascii_lowercase().as_str() {
        "connect" => Input::Connect(required("wallet address")?.to_string()),
        "disconnect" => Input::Disconnect,
        "refresh" => Input::Session(SessionCommand::Refresh),
        "farm" => {
            let farm: FarmId = required("farm name")?.parse().map_err(|e: String| eyre!(e))?;
            Input::Session(SessionCommand::SelectFarm(farm))
        }
        "claim" => Input::Session(SessionCommand::Claim),
        "stake" => Input::Session(SessionCommand::Stake {
            item_address: required("item address")?.to_string(),
        }),
        "mint" | "buy" => {
            let kind: EquipmentKind =
                required("equipment kind")?.parse().map_err(|e: String| eyre!(e))?;
            Input::Session(SessionCommand::Mint(kind))
        }
        "daily" => Input::Session(SessionCommand::ClaimDaily),
        "click" => {
            let taps = match arg {
                Some(raw) => raw
                    .parse()
                    .wrap_err_with(|| format!("'{raw}' is not a tap count"))?,
                None => 1,
            };
            Input::Click(taps)
        }
        "slots" | "spin" => Input::Slots,
        "puzzle" => {
            let raw = required("move count")?;
            let moves = raw
                .parse()
                .wrap_err_with(|| format!("'{raw}' is not a move count"))?;
            Input::Puzzle(moves)
        }
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(eyre!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(input))
}
