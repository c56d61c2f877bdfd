//! The node-supplied block template.
//!
//! Templates arrive as the JSON payload of a `getblocktemplate`-style RPC.
//! Required fields are pulled out one by one so that a missing or mistyped
//! field names itself in the error; optional per-chain sections (dev reward,
//! miner fund) deserialize through serde.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{WorkError, WorkResult};

/// One non-coinbase transaction offered by the template.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TemplateTx {
    /// Raw transaction, hex encoded byte-for-byte.
    pub data: String,
    /// Transaction ID, display (big-endian) hex.
    pub txid: String,
    /// Witness transaction ID, display hex. Differs from `txid` only for
    /// segwit transactions; its presence pattern drives segwit detection.
    #[serde(default)]
    pub hash: Option<String>,
    /// Fee the transaction pays, in satoshis.
    #[serde(default)]
    pub fee: i64,
}

/// FreeCash dev-reward section.
#[derive(Clone, Debug, Deserialize)]
pub struct DevReward {
    /// Satoshis the dev output must carry.
    pub value: i64,
    /// The dev output script, hex encoded, used verbatim.
    pub scriptpubkey: String,
}

/// Bitcoin Cash ABC miner-fund section.
#[derive(Clone, Debug, Deserialize)]
pub struct MinerFund {
    /// Satoshis redirected from the block reward.
    pub minimumvalue: i64,
    /// Fund addresses; the first one receives the redirection.
    pub addresses: Vec<String>,
}

/// A validated block template.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    /// Height of the block being assembled (BIP-34 scriptSig push).
    pub height: u64,
    /// Block header version.
    pub version: u32,
    /// Previous block hash, display hex.
    pub previous_block_hash: String,
    /// Seed for the header's nTime.
    pub current_time: u32,
    /// Compact target, hex string.
    pub bits: String,
    /// Total coinbase value the node reported.
    pub coinbase_value: i64,
    /// Candidate transactions, template order.
    pub transactions: Vec<TemplateTx>,
    /// Node-provided witness commitment script, used verbatim when present.
    pub default_witness_commitment: Option<String>,
    /// FreeCash dev reward, when the chain requests one.
    pub coinbase_dev_reward: Option<DevReward>,
    /// Bitcoin Cash ABC miner fund, when the chain requests one.
    pub miner_fund: Option<MinerFund>,
}

impl BlockTemplate {
    /// Validate a template out of raw JSON. Accepts either the bare
    /// `getblocktemplate` result or the full RPC envelope around it.
    pub fn from_value(value: &Value) -> WorkResult<Self> {
        let root = match value.get("result") {
            Some(result) if result.is_object() => result,
            _ => value,
        };

        let height = required_u64(root, "height")?;
        let version = required_u32(root, "version")?;
        let previous_block_hash = required_str(root, "previousblockhash")?.to_owned();
        let current_time = required_u32(root, "curtime")?;
        let bits = required_str(root, "bits")?.to_owned();
        let coinbase_value = required_i64(root, "coinbasevalue")?;
        let transactions = required_field(root, "transactions")
            .and_then(|txs| parse_section::<Vec<TemplateTx>>(txs, "transactions"))?;

        Ok(Self {
            height,
            version,
            previous_block_hash,
            current_time,
            bits,
            coinbase_value,
            transactions,
            default_witness_commitment: optional_str(root, "default_witness_commitment"),
            coinbase_dev_reward: optional_section(root, "coinbasedevreward")?,
            miner_fund: optional_section(root, "minerfund")?,
        })
    }

    /// SegWit is active iff any offered transaction reports a witness txid
    /// distinct from its txid.
    pub fn segwit_enabled(&self) -> bool {
        self.transactions
            .iter()
            .any(|tx| tx.hash.as_deref().map_or(false, |h| h != tx.txid))
    }

    /// Parse the compact target field.
    pub fn compact_bits(&self) -> WorkResult<u32> {
        u32::from_str_radix(&self.bits, 16)
            .map_err(|e| WorkError::MalformedTemplate(format!("field `bits`: {e}")))
    }
}

fn required_field<'a>(value: &'a Value, field: &str) -> WorkResult<&'a Value> {
    value
        .get(field)
        .ok_or_else(|| WorkError::MalformedTemplate(format!("missing required field `{field}`")))
}

fn required_u64(value: &Value, field: &str) -> WorkResult<u64> {
    required_field(value, field)?.as_u64().ok_or_else(|| {
        WorkError::MalformedTemplate(format!("field `{field}` is not an unsigned integer"))
    })
}

fn required_u32(value: &Value, field: &str) -> WorkResult<u32> {
    u32::try_from(required_u64(value, field)?)
        .map_err(|_| WorkError::MalformedTemplate(format!("field `{field}` exceeds 32 bits")))
}

fn required_i64(value: &Value, field: &str) -> WorkResult<i64> {
    required_field(value, field)?
        .as_i64()
        .ok_or_else(|| WorkError::MalformedTemplate(format!("field `{field}` is not an integer")))
}

fn required_str<'a>(value: &'a Value, field: &str) -> WorkResult<&'a str> {
    required_field(value, field)?
        .as_str()
        .ok_or_else(|| WorkError::MalformedTemplate(format!("field `{field}` is not a string")))
}

fn optional_str(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_owned)
}

fn optional_section<T>(value: &Value, field: &str) -> WorkResult<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(section) => parse_section(section, field).map(Some),
    }
}

fn parse_section<T>(section: &Value, field: &str) -> WorkResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(section.clone())
        .map_err(|e| WorkError::MalformedTemplate(format!("field `{field}`: {e}")))
}
