use crate::transactions::TransactionRequest;
use anyhow::Result;
use std::future::Future;

/// Connection changes reported by the wallet provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    /// The user started pairing or a stored session is being restored.
    Connecting,
    Connected { address: String },
    Disconnected,
}

pub trait WalletSession {
    /// Resolves once the wallet accepts the request. Rejections, expiry and
    /// insufficient funds surface as errors.
    fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> impl Future<Output = Result<()>>;
}
