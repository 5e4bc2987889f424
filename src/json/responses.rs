//! Shapes of the method-specific replies returned by upstream endpoints.
//!
//! Optional fields deserialize from an absent field and from an explicit
//! `null` alike, so the same answer compares equal no matter how an
//! endpoint chose to serialize it.

use crate::json::{Address, Data, Hash, Quantity};
use serde::{Deserialize, Serialize};

/// A block as returned by `eth_getBlockByHash` and `eth_getBlockByNumber`.
///
/// `TX` selects the representation of the `transactions` field: [`Hash`]
/// when the caller asked for transaction hashes only, [`Transaction`] when
/// it asked for full transaction objects.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block<TX> {
    /// The block number. `None` when it is a pending block.
    #[serde(default)]
    pub number: Option<Quantity>,
    /// The block hash. `None` when it is a pending block.
    #[serde(default)]
    pub hash: Option<Hash>,
    pub parent_hash: Hash,
    /// Hash of the generated proof-of-work. `None` when it is a pending block.
    #[serde(default)]
    pub nonce: Option<Data>,
    pub sha3_uncles: Hash,
    #[serde(default)]
    pub logs_bloom: Option<Data>,
    pub transactions_root: Hash,
    pub state_root: Hash,
    pub receipts_root: Hash,
    #[serde(default)]
    pub miner: Option<Address>,
    #[serde(default)]
    pub difficulty: Option<Quantity>,
    #[serde(default)]
    pub total_difficulty: Option<Quantity>,
    pub extra_data: Data,
    #[serde(default)]
    pub size: Option<Quantity>,
    pub gas_limit: Quantity,
    pub gas_used: Quantity,
    pub timestamp: Quantity,
    /// Base fee value of this block. Absent for pre-EIP-1559 blocks.
    #[serde(default)]
    pub base_fee_per_gas: Option<Quantity>,
    #[serde(default)]
    pub mix_hash: Option<Hash>,
    #[serde(default)]
    pub transactions: Vec<TX>,
    #[serde(default)]
    pub uncles: Vec<Hash>,
}

/// A transaction as returned by `eth_getTransactionByHash` and by
/// `eth_getBlockBy*` with full transaction objects.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The hash of the block containing the transaction.
    /// `None` if the transaction is pending.
    #[serde(default)]
    pub block_hash: Option<Hash>,
    /// The number of the block containing the transaction.
    /// `None` if the transaction is pending.
    #[serde(default)]
    pub block_number: Option<Quantity>,
    /// The sender address.
    #[serde(default)]
    pub from: Option<Address>,
    /// Gas provided by the sender.
    pub gas: Quantity,
    #[serde(default)]
    pub gas_price: Option<Quantity>,
    #[serde(default)]
    pub max_fee_per_gas: Option<Quantity>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<Quantity>,
    /// The transaction hash.
    pub hash: Hash,
    /// The data sent along with the transaction.
    pub input: Data,
    /// The number of transactions made by the sender prior to this one.
    pub nonce: Quantity,
    /// The receiver address.
    /// `None` if it is a contract creation transaction.
    #[serde(default)]
    pub to: Option<Address>,
    /// Index of the transaction in the block.
    /// `None` if the transaction is pending.
    #[serde(default)]
    pub transaction_index: Option<Quantity>,
    /// Value transferred in Wei.
    pub value: Quantity,
    #[serde(rename = "type", default)]
    pub tx_type: Option<Quantity>,
    #[serde(default)]
    pub chain_id: Option<Quantity>,
    #[serde(default)]
    pub v: Option<Quantity>,
    #[serde(default)]
    pub r: Option<Quantity>,
    #[serde(default)]
    pub s: Option<Quantity>,
}

/// A receipt as returned by `eth_getTransactionReceipt`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: Hash,
    pub transaction_index: Quantity,
    pub block_hash: Hash,
    pub block_number: Quantity,
    pub from: Address,
    /// `None` if it is a contract creation transaction.
    #[serde(default)]
    pub to: Option<Address>,
    pub cumulative_gas_used: Quantity,
    #[serde(default)]
    pub effective_gas_price: Option<Quantity>,
    pub gas_used: Quantity,
    /// The contract address created. `None` unless it is a contract
    /// creation transaction.
    #[serde(default)]
    pub contract_address: Option<Address>,
    pub logs: Vec<LogEntry>,
    pub logs_bloom: Data,
    /// `0x1` for success, `0x0` for failure. Absent for pre-Byzantium
    /// receipts.
    #[serde(default)]
    pub status: Option<Quantity>,
    #[serde(rename = "type", default)]
    pub tx_type: Option<Quantity>,
}

/// A single log of a transaction receipt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// The address from which this log originated.
    pub address: Address,
    /// Array of 0 to 4 32-byte topics of indexed log arguments.
    pub topics: Vec<Hash>,
    /// Contains one or more 32-byte non-indexed log arguments.
    pub data: Data,
    /// `None` if the block is pending.
    #[serde(default)]
    pub block_number: Option<Quantity>,
    /// `None` if the log is pending.
    #[serde(default)]
    pub transaction_hash: Option<Hash>,
    /// `None` if the log is pending.
    #[serde(default)]
    pub transaction_index: Option<Quantity>,
    /// `None` if the block is pending.
    #[serde(default)]
    pub block_hash: Option<Hash>,
    /// `None` if the log is pending.
    #[serde(default)]
    pub log_index: Option<Quantity>,
    /// `true` when the log was removed due to a chain reorganization.
    #[serde(default)]
    pub removed: bool,
}

/// The reply of the `eth_feeHistory` call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeHistory {
    /// Lowest number block of the returned range.
    pub oldest_block: Quantity,
    /// An array of block base fees per gas, including the next block after
    /// the newest of the returned range. Zeroes are returned for
    /// pre-EIP-1559 blocks.
    pub base_fee_per_gas: Vec<Quantity>,
    #[serde(default)]
    pub gas_used_ratio: Vec<f64>,
    /// A two-dimensional array of effective priority fees per gas at the
    /// requested block percentiles.
    #[serde(default)]
    pub reward: Vec<Vec<Quantity>>,
}
