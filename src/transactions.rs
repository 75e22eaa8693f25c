//! Message payloads for the staking contract and the equipment collection.
//!
//! Cells are assembled with `tonlib-core` and shipped to the wallet as a
//! base64 bag of cells. Every body starts with a 32-bit op code followed by a
//! 64-bit query id; the session passes the current unix time in milliseconds
//! as the query id so repeated submissions stay distinguishable.

use crate::{
    catalog::{
        EquipmentKind,
        NANO_PER_TON,
    },
    inventory_reader::InventoryItem,
};
use base64::{
    Engine,
    engine::general_purpose::STANDARD,
};
use num_bigint::BigUint;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tonlib_core::{
    TonAddress,
    cell::{
        BagOfCells,
        Cell,
        CellBuilder,
        TonCellError,
    },
};

pub const OP_CLAIM: u32 = 1_906_195_048;
pub const OP_MINT: u32 = 3_871_065_451;
pub const OP_NFT_TRANSFER: u32 = 0x5fcc3d14;

pub const CLAIM_VALUE: u64 = NANO_PER_TON / 20;
pub const STAKE_VALUE: u64 = NANO_PER_TON / 10;
pub const STAKE_FORWARD_AMOUNT: u64 = NANO_PER_TON / 100;
/// Added on top of the equipment price to cover mint fees.
pub const MINT_GAS: u64 = NANO_PER_TON / 20;

/// Seconds a wallet request stays valid after it is created.
pub const REQUEST_TTL_SECS: i64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("'{0}' is not verified on chain yet and cannot be staked")]
    PlaceholderItem(String),
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to encode message body: {0}")]
    Encoding(String),
}

impl From<TonCellError> for TransactionError {
    fn from(err: TonCellError) -> Self {
        TransactionError::Encoding(err.to_string())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationKind {
    Claim,
    Stake,
    Mint(EquipmentKind),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreparedTransaction {
    pub kind: OperationKind,
    pub to: String,
    /// Attached value in nanoton.
    pub amount: u64,
    /// Serialized bag of cells.
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub valid_until: i64,
    pub messages: Vec<TransactionMessage>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionMessage {
    pub address: String,
    pub amount: String,
    pub payload: String,
}

impl PreparedTransaction {
    pub fn payload_base64(&self) -> String {
        STANDARD.encode(&self.payload)
    }

    pub fn into_request(self, now_unix: i64) -> TransactionRequest {
        let payload = self.payload_base64();
        TransactionRequest {
            valid_until: now_unix + REQUEST_TTL_SECS,
            messages: vec![TransactionMessage {
                address: self.to,
                amount: self.amount.to_string(),
                payload,
            }],
        }
    }
}

#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    staking_contract: String,
    staking_address: TonAddress,
    collection: String,
}

impl TransactionBuilder {
    pub fn new(
        staking_contract: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, TransactionError> {
        let staking_contract = staking_contract.into();
        let collection = collection.into();
        let staking_address = parse_address(&staking_contract)?;
        parse_address(&collection)?;
        Ok(Self {
            staking_contract,
            staking_address,
            collection,
        })
    }

    pub fn claim(&self, query_id: u64) -> Result<PreparedTransaction, TransactionError> {
        let mut body = CellBuilder::new();
        body.store_u32(32, OP_CLAIM)?.store_u64(64, query_id)?;
        Ok(PreparedTransaction {
            kind: OperationKind::Claim,
            to: self.staking_contract.clone(),
            amount: CLAIM_VALUE,
            payload: serialize(body.build()?)?,
        })
    }

    /// Transfers the NFT to the staking contract, which credits its hash
    /// power to `owner`.
    pub fn stake(
        &self,
        item: &InventoryItem,
        owner: &str,
        query_id: u64,
    ) -> Result<PreparedTransaction, TransactionError> {
        if item.is_placeholder() {
            return Err(TransactionError::PlaceholderItem(item.address.clone()));
        }
        parse_address(&item.address)?;
        let owner = parse_address(owner)?;

        let mut body = CellBuilder::new();
        body.store_u32(32, OP_NFT_TRANSFER)?
            .store_u64(64, query_id)?
            .store_address(&self.staking_address)?
            .store_address(&owner)?
            .store_bit(false)?
            .store_coins(&BigUint::from(STAKE_FORWARD_AMOUNT))?
            .store_bit(false)?;
        Ok(PreparedTransaction {
            kind: OperationKind::Stake,
            to: item.address.clone(),
            amount: STAKE_VALUE,
            payload: serialize(body.build()?)?,
        })
    }

    pub fn mint(
        &self,
        kind: EquipmentKind,
        owner: &str,
        query_id: u64,
    ) -> Result<PreparedTransaction, TransactionError> {
        let equipment = kind.spec();
        let owner = parse_address(owner)?;
        let metadata = serde_json::json!({
            "name": equipment.name,
            "description": equipment.description,
        })
        .to_string();

        let mut content = CellBuilder::new();
        content.store_slice(metadata.as_bytes())?;
        let content = Arc::new(content.build()?);

        let mut body = CellBuilder::new();
        body.store_u32(32, OP_MINT)?
            .store_u64(64, query_id)?
            .store_address(&owner)?
            .store_reference(&content)?;
        Ok(PreparedTransaction {
            kind: OperationKind::Mint(kind),
            to: self.collection.clone(),
            amount: equipment.price + MINT_GAS,
            payload: serialize(body.build()?)?,
        })
    }
}

fn parse_address(raw: &str) -> Result<TonAddress, TransactionError> {
    raw.parse::<TonAddress>()
        .map_err(|err| TransactionError::InvalidAddress {
            address: raw.to_string(),
            reason: err.to_string(),
        })
}

fn serialize(root: Cell) -> Result<Vec<u8>, TransactionError> {
    Ok(BagOfCells::from_root(root).serialize(false)?)
}

/// Cell holding a single address, used as a `tvm.Slice` get-method argument.
pub fn address_slice_boc(address: &str) -> Result<Vec<u8>, TransactionError> {
    let address = parse_address(address)?;
    let mut builder = CellBuilder::new();
    builder.store_address(&address)?;
    serialize(builder.build()?)
}
