use anyhow::{
    Context,
    Result,
    anyhow,
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    fmt,
    future::Future,
};
use tracing::{
    debug,
    warn,
};

pub const DEFAULT_TESTNET_INDEXER_URL: &str = "https://testnet.tonapi.io/v2";
pub const DEFAULT_MAINNET_INDEXER_URL: &str = "https://tonapi.io/v2";

/// Marks items synthesized from the collection counter rather than read from
/// the indexer.
pub const PLACEHOLDER_PREFIX: &str = "placeholder:";
pub const PAGE_LIMIT: u64 = 100;

const UNKNOWN_NAME: &str = "Unknown GPU";
const UNKNOWN_DESCRIPTION: &str = "No description";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub address: String,
    pub name: String,
    pub description: String,
}

impl InventoryItem {
    pub fn new(
        address: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn placeholder(collection: &str, index: u64) -> Self {
        Self {
            address: format!("{PLACEHOLDER_PREFIX}{collection}:{index}"),
            name: format!("Equipment #{}", index + 1),
            description: "Minted, waiting for the indexer to catch up".to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.address.starts_with(PLACEHOLDER_PREFIX)
    }
}

pub trait InventoryReader {
    fn fetch_owned_equipment(
        &self,
        account: &str,
    ) -> impl Future<Output = Result<Vec<InventoryItem>>>;
}

#[derive(Clone)]
pub struct TonApiClient {
    base_url: String,
    collection: String,
    http: reqwest::Client,
}

impl TonApiClient {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client for indexer")?;
        Ok(Self {
            base_url,
            collection: collection.into(),
            http,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn nfts_by_owner(&self, account: &str) -> Result<Vec<InventoryItem>> {
        let url = format!("{}/accounts/{}/nfts", self.base_url, account);
        let limit = PAGE_LIMIT.to_string();
        let res = self
            .http
            .get(url)
            .query(&[
                ("collection", self.collection.as_str()),
                ("limit", limit.as_str()),
                ("offset", "0"),
                ("indirect_ownership", "false"),
            ])
            .send()
            .await
            .context("indexer request failed")?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .context("failed to read indexer response body")?;
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(anyhow!(
                "indexer responded with {status} when listing account NFTs: {body}"
            ));
        }
        parse_nft_items(&bytes)
    }

    pub async fn collection_next_item_index(&self) -> Result<u64> {
        let url = format!("{}/nfts/collections/{}", self.base_url, self.collection);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("indexer request failed")?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(anyhow!(
                "indexer responded with {status} when fetching collection: {body}"
            ));
        }
        let dto: CollectionDto = res
            .json()
            .await
            .context("invalid indexer collection payload")?;
        Ok(dto.next_item_index)
    }
}

impl InventoryReader for TonApiClient {
    async fn fetch_owned_equipment(&self, account: &str) -> Result<Vec<InventoryItem>> {
        let primary = self.nfts_by_owner(account).await;
        with_placeholder_fallback(primary, &self.collection, || {
            self.collection_next_item_index()
        })
        .await
    }
}

impl fmt::Display for TonApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

/// The indexer can lag behind the chain right after a mint. When it reports
/// nothing (or fails) the collection's issuance counter is consulted and, if
/// non-zero, that many placeholder items are returned. Placeholders cannot be
/// staked.
pub async fn with_placeholder_fallback<F, Fut>(
    primary: Result<Vec<InventoryItem>>,
    collection: &str,
    next_item_index: F,
) -> Result<Vec<InventoryItem>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    match primary {
        Ok(items) if !items.is_empty() => return Ok(items),
        Ok(_) => debug!(collection, "indexer returned no items; checking collection"),
        Err(err) => warn!(?err, collection, "indexer lookup failed; checking collection"),
    }
    let issued = next_item_index()
        .await
        .context("collection fallback lookup failed")?;
    let count = issued.min(PAGE_LIMIT);
    Ok((0..count)
        .map(|index| InventoryItem::placeholder(collection, index))
        .collect())
}

pub fn parse_nft_items(bytes: &[u8]) -> Result<Vec<InventoryItem>> {
    let dto: NftItemsDto =
        serde_json::from_slice(bytes).context("invalid indexer NFT payload")?;
    Ok(dto.nft_items.into_iter().map(Into::into).collect())
}

#[derive(Deserialize)]
struct NftItemsDto {
    #[serde(default)]
    nft_items: Vec<NftItemDto>,
}

#[derive(Deserialize)]
struct NftItemDto {
    address: String,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Deserialize)]
struct CollectionDto {
    #[serde(default)]
    next_item_index: u64,
}

impl From<NftItemDto> for InventoryItem {
    fn from(dto: NftItemDto) -> Self {
        let field = |key: &str| {
            dto.metadata
                .as_ref()
                .and_then(|meta| meta.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let name = field("name").unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let description =
            field("description").unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string());
        InventoryItem {
            address: dto.address,
            name,
            description,
        }
    }
}
