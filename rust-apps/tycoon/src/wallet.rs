use base64::{
    Engine,
    engine::general_purpose::{
        STANDARD,
        URL_SAFE_NO_PAD,
    },
};
use color_eyre::eyre::{
    self,
    WrapErr,
};
use miner_tycoon::{
    transactions::{
        TransactionMessage,
        TransactionRequest,
    },
    wallet::WalletSession,
};

/// Hands each request to the user as `ton://transfer` links to open in any
/// TON wallet. Submission counts as accepted once the links are shown.
#[derive(Clone, Debug, Default)]
pub struct DeepLinkWallet;

impl WalletSession for DeepLinkWallet {
    async fn send_transaction(&self, request: &TransactionRequest) -> anyhow::Result<()> {
        for message in &request.messages {
            let link = transfer_link(message)
                .map_err(|err| anyhow::anyhow!("{err:#}"))?;
            println!("open in your wallet: {link}");
        }
        tracing::info!(
            messages = request.messages.len(),
            valid_until = request.valid_until,
            "transfer links issued"
        );
        Ok(())
    }
}

pub fn transfer_link(message: &TransactionMessage) -> eyre::Result<String> {
    let payload = STANDARD
        .decode(&message.payload)
        .wrap_err("message payload is not base64")?;
    Ok(format!(
        "ton://transfer/{}?amount={}&bin={}",
        message.address,
        message.amount,
        URL_SAFE_NO_PAD.encode(payload)
    ))
}
