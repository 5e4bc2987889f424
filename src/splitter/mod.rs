//! An RPC proxy handler that merges multiple Ethereum JSON-RPC endpoints
//! into one.
//!
//! Every supported method is fanned out to all configured upstreams in
//! parallel and the collected answers are reconciled with a per-method
//! aggregation policy, so a single misbehaving endpoint can neither forge
//! nor withhold an answer.

use crate::json::responses::{Block, FeeHistory, Transaction, TransactionReceipt};
use crate::json::{Address, BlockSpec, BlockTag, Data, Hash, Quantity};
use crate::multi::{MultiResults, RpcErrors};
use crate::rpc_client::{HttpJsonRpcClient, JsonRpcCaller, RpcError};
use futures::future;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;


/// Number of blocks behind the median of the block numbers reported by the
/// endpoints that determines the lowest block number that can be returned
/// by the `eth_blockNumber` method.
const MAX_BLOCKS_BEHIND: u64 = 3;

/// One configured upstream endpoint.
#[derive(Clone)]
pub struct Upstream {
    caller: Arc<dyn JsonRpcCaller>,
    endpoint: String,
}

impl Upstream {
    pub fn new(endpoint: impl Into<String>, caller: Arc<dyn JsonRpcCaller>) -> Self {
        Self {
            caller,
            endpoint: endpoint.into(),
        }
    }
}

/// A positional argument of an inbound call, before normalization.
enum Param {
    /// An argument already in its wire form.
    Value(serde_json::Value),
    /// A block-number-or-tag argument subject to tag resolution.
    Block(BlockSpec),
    /// An optional argument the caller did not provide.
    Null,
}

impl Param {
    fn value<T: Serialize>(value: &T) -> Self {
        Self::Value(into_json(value))
    }

    fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Value(serde_json::Value::Null))
    }
}

/// The splitter itself: holds the upstream clients for the lifetime of the
/// process and answers one inbound call at a time through [`Self::dispatch`].
pub struct RpcSplitter {
    upstreams: Vec<Upstream>,
}

impl RpcSplitter {
    /// Creates a splitter with one [`HttpJsonRpcClient`] per endpoint, all
    /// sharing the given HTTP client.
    pub fn new(http: reqwest::Client, endpoints: impl IntoIterator<Item = Url>) -> Self {
        let upstreams = endpoints
            .into_iter()
            .map(|url| {
                let endpoint = url.to_string();
                Upstream::new(endpoint, Arc::new(HttpJsonRpcClient::new(http.clone(), url)))
            })
            .collect();
        Self::with_upstreams(upstreams)
    }

    pub fn with_upstreams(upstreams: Vec<Upstream>) -> Self {
        assert!(
            !upstreams.is_empty(),
            "at least one upstream endpoint is required"
        );
        Self { upstreams }
    }

    /// How many times the same response must be returned by different
    /// endpoints to be considered valid: all of them for up to two
    /// endpoints, all but one otherwise.
    pub fn min_required(&self) -> usize {
        let n = self.upstreams.len();
        if n <= 2 {
            n
        } else {
            n - 1
        }
    }

    /// Routes a decoded JSON-RPC request to the matching method handler.
    pub async fn dispatch(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcErrors> {
        match method {
            "eth_blockNumber" => {
                expect_at_most(&params, 0)?;
                self.block_number().await.map(into_json)
            }
            "eth_getBlockByHash" => {
                expect_at_most(&params, 2)?;
                self.get_block_by_hash(
                    required(&params, 0, "block hash")?,
                    required(&params, 1, "hydrated transactions")?,
                )
                .await
            }
            "eth_getBlockByNumber" => {
                expect_at_most(&params, 2)?;
                self.get_block_by_number(
                    required(&params, 0, "block number")?,
                    required(&params, 1, "hydrated transactions")?,
                )
                .await
            }
            "eth_getTransactionByHash" => {
                expect_at_most(&params, 1)?;
                self.get_transaction_by_hash(required(&params, 0, "transaction hash")?)
                    .await
                    .map(into_json)
            }
            "eth_getTransactionReceipt" => {
                expect_at_most(&params, 1)?;
                self.get_transaction_receipt(required(&params, 0, "transaction hash")?)
                    .await
                    .map(into_json)
            }
            "eth_getTransactionCount" => {
                expect_at_most(&params, 2)?;
                self.get_transaction_count(
                    required(&params, 0, "address")?,
                    required(&params, 1, "block number")?,
                )
                .await
                .map(into_json)
            }
            "eth_getBalance" => {
                expect_at_most(&params, 2)?;
                self.get_balance(
                    required(&params, 0, "address")?,
                    required(&params, 1, "block number")?,
                )
                .await
                .map(into_json)
            }
            "eth_getStorageAt" => {
                expect_at_most(&params, 3)?;
                self.get_storage_at(
                    required(&params, 0, "address")?,
                    required(&params, 1, "storage position")?,
                    required(&params, 2, "block number")?,
                )
                .await
                .map(into_json)
            }
            "eth_getCode" => {
                expect_at_most(&params, 2)?;
                self.get_code(
                    required(&params, 0, "address")?,
                    required(&params, 1, "block number")?,
                )
                .await
                .map(into_json)
            }
            "eth_call" => {
                expect_at_most(&params, 3)?;
                self.call(
                    required(&params, 0, "call object")?,
                    required(&params, 1, "block number")?,
                    optional(&params, 2),
                )
                .await
                .map(into_json)
            }
            "eth_sendRawTransaction" => {
                expect_at_most(&params, 1)?;
                self.send_raw_transaction(required(&params, 0, "signed transaction data")?)
                    .await
                    .map(into_json)
            }
            "eth_gasPrice" => {
                expect_at_most(&params, 0)?;
                self.gas_price().await.map(into_json)
            }
            "eth_estimateGas" => {
                expect_at_most(&params, 2)?;
                self.estimate_gas(
                    required(&params, 0, "call object")?,
                    optional_block(&params, 1)?,
                )
                .await
                .map(into_json)
            }
            "eth_maxPriorityFeePerGas" => {
                expect_at_most(&params, 0)?;
                self.max_priority_fee_per_gas().await.map(into_json)
            }
            "eth_feeHistory" => {
                expect_at_most(&params, 3)?;
                self.fee_history(
                    required(&params, 0, "block count")?,
                    required(&params, 1, "newest block")?,
                    required(&params, 2, "reward percentiles")?,
                )
                .await
                .map(into_json)
            }
            "eth_chainId" => {
                expect_at_most(&params, 0)?;
                self.chain_id().await.map(into_json)
            }
            "net_version" => {
                expect_at_most(&params, 0)?;
                self.version().await
            }
            other => Err(RpcError::MethodNotFound(other.to_string()).into()),
        }
    }

    /// Implements the `eth_blockNumber` call.
    ///
    /// Returns the largest reported block number within a fixed distance
    /// below the median, so the answer never runs ahead of what all but one
    /// endpoint have seen.
    pub fn block_number(
        &self,
    ) -> futures::future::BoxFuture<'_, Result<Quantity, RpcErrors>> {
        Box::pin(async move {
            self.fan_out::<Quantity>("eth_blockNumber", vec![])
                .await?
                .reduce_with_median_floor(self.min_required(), MAX_BLOCKS_BEHIND)
        })
    }

    /// Implements the `eth_getBlockByHash` call.
    pub async fn get_block_by_hash(
        &self,
        block_hash: Hash,
        full_transactions: bool,
    ) -> Result<serde_json::Value, RpcErrors> {
        let params = vec![Param::value(&block_hash), Param::value(&full_transactions)];
        if full_transactions {
            self.most_common::<Option<Block<Transaction>>>("eth_getBlockByHash", params)
                .await
                .map(into_json)
        } else {
            self.most_common::<Option<Block<Hash>>>("eth_getBlockByHash", params)
                .await
                .map(into_json)
        }
    }

    /// Implements the `eth_getBlockByNumber` call.
    pub async fn get_block_by_number(
        &self,
        block: BlockSpec,
        full_transactions: bool,
    ) -> Result<serde_json::Value, RpcErrors> {
        let params = vec![Param::Block(block), Param::value(&full_transactions)];
        if full_transactions {
            self.most_common::<Option<Block<Transaction>>>("eth_getBlockByNumber", params)
                .await
                .map(into_json)
        } else {
            self.most_common::<Option<Block<Hash>>>("eth_getBlockByNumber", params)
                .await
                .map(into_json)
        }
    }

    /// Implements the `eth_getTransactionByHash` call.
    pub async fn get_transaction_by_hash(
        &self,
        tx_hash: Hash,
    ) -> Result<Option<Transaction>, RpcErrors> {
        self.most_common("eth_getTransactionByHash", vec![Param::value(&tx_hash)])
            .await
    }

    /// Implements the `eth_getTransactionReceipt` call.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: Hash,
    ) -> Result<Option<TransactionReceipt>, RpcErrors> {
        self.most_common("eth_getTransactionReceipt", vec![Param::value(&tx_hash)])
            .await
    }

    /// Implements the `eth_getTransactionCount` call.
    pub async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockSpec,
    ) -> Result<Quantity, RpcErrors> {
        self.most_common(
            "eth_getTransactionCount",
            vec![Param::value(&address), Param::Block(block)],
        )
        .await
    }

    /// Implements the `eth_getBalance` call.
    pub async fn get_balance(
        &self,
        address: Address,
        block: BlockSpec,
    ) -> Result<Quantity, RpcErrors> {
        self.most_common(
            "eth_getBalance",
            vec![Param::value(&address), Param::Block(block)],
        )
        .await
    }

    /// Implements the `eth_getStorageAt` call.
    pub async fn get_storage_at(
        &self,
        address: Address,
        position: Quantity,
        block: BlockSpec,
    ) -> Result<Hash, RpcErrors> {
        self.most_common(
            "eth_getStorageAt",
            vec![
                Param::value(&address),
                Param::value(&position),
                Param::Block(block),
            ],
        )
        .await
    }

    /// Implements the `eth_getCode` call.
    pub async fn get_code(&self, address: Address, block: BlockSpec) -> Result<Data, RpcErrors> {
        self.most_common(
            "eth_getCode",
            vec![Param::value(&address), Param::Block(block)],
        )
        .await
    }

    /// Implements the `eth_call` call.
    pub async fn call(
        &self,
        call_object: serde_json::Value,
        block: BlockSpec,
        state_overrides: Option<serde_json::Value>,
    ) -> Result<Data, RpcErrors> {
        let params = vec![
            Param::Value(call_object),
            Param::Block(block),
            state_overrides.map(Param::Value).unwrap_or(Param::Null),
        ];
        self.most_common("eth_call", params).await
    }

    /// Implements the `eth_sendRawTransaction` call.
    ///
    /// A broadcast is successful as soon as any single endpoint accepts the
    /// transaction.
    pub async fn send_raw_transaction(&self, data: Data) -> Result<Hash, RpcErrors> {
        self.fan_out("eth_sendRawTransaction", vec![Param::value(&data)])
            .await?
            .reduce_with_most_common(1)
    }

    /// Implements the `eth_gasPrice` call.
    ///
    /// The returned number is the median of all numbers returned by the
    /// endpoints.
    pub async fn gas_price(&self) -> Result<Quantity, RpcErrors> {
        self.median("eth_gasPrice", vec![]).await
    }

    /// Implements the `eth_estimateGas` call.
    ///
    /// The returned number is the median of all numbers returned by the
    /// endpoints.
    pub async fn estimate_gas(
        &self,
        call_object: serde_json::Value,
        block: Option<BlockSpec>,
    ) -> Result<Quantity, RpcErrors> {
        let params = vec![
            Param::Value(call_object),
            block.map(Param::Block).unwrap_or(Param::Null),
        ];
        self.median("eth_estimateGas", params).await
    }

    /// Implements the `eth_maxPriorityFeePerGas` call.
    ///
    /// The returned number is the median of all numbers returned by the
    /// endpoints.
    pub async fn max_priority_fee_per_gas(&self) -> Result<Quantity, RpcErrors> {
        self.median("eth_maxPriorityFeePerGas", vec![]).await
    }

    /// Implements the `eth_feeHistory` call.
    pub async fn fee_history(
        &self,
        block_count: Quantity,
        newest_block: BlockSpec,
        reward_percentiles: serde_json::Value,
    ) -> Result<FeeHistory, RpcErrors> {
        let params = vec![
            Param::value(&block_count),
            Param::Block(newest_block),
            Param::Value(reward_percentiles),
        ];
        self.most_common("eth_feeHistory", params).await
    }

    /// Implements the `eth_chainId` call.
    pub async fn chain_id(&self) -> Result<Quantity, RpcErrors> {
        self.most_common("eth_chainId", vec![]).await
    }

    /// Implements the `net_version` call.
    pub async fn version(&self) -> Result<serde_json::Value, RpcErrors> {
        self.most_common("net_version", vec![]).await
    }

    async fn most_common<O>(&self, method: &str, params: Vec<Param>) -> Result<O, RpcErrors>
    where
        O: DeserializeOwned + PartialEq,
    {
        self.fan_out(method, params)
            .await?
            .reduce_with_most_common(self.min_required())
    }

    async fn median(&self, method: &str, params: Vec<Param>) -> Result<Quantity, RpcErrors> {
        self.fan_out::<Quantity>(method, params)
            .await?
            .reduce_with_median(self.min_required())
    }

    async fn fan_out<O>(
        &self,
        method: &str,
        params: Vec<Param>,
    ) -> Result<MultiResults<usize, O>, RpcErrors>
    where
        O: DeserializeOwned,
    {
        let params = self.normalize_params(params).await?;
        Ok(self.parallel_call(method, params).await)
    }

    /// Prepares the positional arguments for dispatch to the upstreams.
    ///
    /// Trailing null arguments are removed, since some RPC servers answer a
    /// "bad request" to them. Tagged blocks are replaced with plain block
    /// numbers, since different endpoints may resolve the same tag to
    /// different blocks; the replacement is the splitter's own aggregated
    /// block number.
    async fn normalize_params(
        &self,
        mut params: Vec<Param>,
    ) -> Result<Vec<serde_json::Value>, RpcErrors> {
        while params.last().is_some_and(Param::is_null) {
            params.pop();
        }
        let mut normalized = Vec::with_capacity(params.len());
        for param in params {
            match param {
                Param::Value(value) => normalized.push(value),
                Param::Null => normalized.push(serde_json::Value::Null),
                Param::Block(BlockSpec::Number(number)) => normalized.push(into_json(number)),
                Param::Block(BlockSpec::Tag(BlockTag::Earliest)) => {
                    return Err(RpcError::UnsupportedBlockTag.into());
                }
                // latest and pending are handled the same way
                Param::Block(BlockSpec::Tag(_)) => {
                    let number = self.block_number().boxed().await?;
                    normalized.push(into_json(number));
                }
            }
        }
        Ok(normalized)
    }

    /// Executes the call on all endpoints in parallel, collecting exactly
    /// one outcome per upstream.
    async fn parallel_call<O>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> MultiResults<usize, O>
    where
        O: DeserializeOwned,
    {
        let workers = self.upstreams.iter().enumerate().map(|(index, upstream)| {
            let params = params.clone();
            async move { (index, self.call_one::<O>(upstream, method, params).await) }
        });
        let mut results = MultiResults::default();
        for (index, outcome) in future::join_all(workers).await {
            results.insert_once(index, outcome);
        }
        assert_eq!(
            results.len(),
            self.upstreams.len(),
            "BUG: expected one result per upstream"
        );
        results
    }

    /// Executes the call on a single endpoint, decoding the reply into the
    /// method's shape. A panicking client only poisons this upstream's
    /// slot.
    async fn call_one<O>(
        &self,
        upstream: &Upstream,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<O, RpcError>
    where
        O: DeserializeOwned,
    {
        info!(endpoint = %upstream.endpoint, method, "call");
        let outcome = AssertUnwindSafe(upstream.caller.call(method, params))
            .catch_unwind()
            .await;
        let decoded = match outcome {
            Err(panic) => Err(RpcError::Panic(panic_message(panic.as_ref()))),
            Ok(Err(error)) => Err(error),
            Ok(Ok(value)) => serde_json::from_value::<O>(value)
                .map_err(|e| RpcError::InvalidResponse(e.to_string())),
        };
        if let Err(error) = &decoded {
            error!(endpoint = %upstream.endpoint, method, %error, "call error");
        }
        decoded
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn into_json<T: Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).expect("BUG: failed to serialize response")
}

fn required<T: DeserializeOwned>(
    params: &[serde_json::Value],
    index: usize,
    name: &str,
) -> Result<T, RpcError> {
    let value = params.get(index).ok_or_else(|| {
        RpcError::InvalidParams(format!("missing argument {} ({name})", index + 1))
    })?;
    serde_json::from_value(value.clone())
        .map_err(|e| RpcError::InvalidParams(format!("argument {} ({name}): {e}", index + 1)))
}

fn optional(params: &[serde_json::Value], index: usize) -> Option<serde_json::Value> {
    match params.get(index) {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(value.clone()),
    }
}

fn optional_block(
    params: &[serde_json::Value],
    index: usize,
) -> Result<Option<BlockSpec>, RpcError> {
    match params.get(index) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => required(params, index, "block number").map(Some),
    }
}

fn expect_at_most(params: &[serde_json::Value], max: usize) -> Result<(), RpcError> {
    if params.len() > max {
        return Err(RpcError::InvalidParams(format!(
            "expected at most {max} arguments, got {}",
            params.len()
        )));
    }
    Ok(())
}
