//! Typed representations of the values exchanged over the Ethereum
//! [JSON RPC](https://ethereum.org/en/developers/docs/apis/json-rpc/) interface.
//!
//! Every value is parsed into one of the types below before it is compared
//! against the answers of other endpoints, so that equality is structural
//! (e.g. `0x01` and `0x1` denote the same quantity).

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Debug, Display, Formatter, LowerHex, UpperHex};
use std::str::FromStr;

pub mod responses;


/// An arbitrary-precision unsigned integer.
///
/// Encoded on the wire as a `0x`-prefixed, variable-length hexadecimal
/// string. Redundant leading zeros are accepted when parsing and dropped
/// when encoding, so two quantities with the same numeric value are equal.
#[derive(
    Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::From, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity(BigUint);

impl Quantity {
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// `self - rhs`, or zero if `rhs` is larger than `self`.
    pub fn saturating_sub(&self, rhs: u64) -> Self {
        let rhs = BigUint::from(rhs);
        if self.0 >= rhs {
            Self(&self.0 - rhs)
        } else {
            Self(BigUint::default())
        }
    }

    /// Integer mean of two quantities.
    pub fn midpoint(a: &Self, b: &Self) -> Self {
        Self((&a.0 + &b.0) / 2_u8)
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u32> for Quantity {
    fn from(value: u32) -> Self {
        Self(BigUint::from(value))
    }
}

impl FromStr for Quantity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| "Ethereum quantity doesn't start with 0x".to_string())?;
        if digits.is_empty() {
            return Err("Ethereum quantity has no hex digits".to_string());
        }
        let value = BigUint::parse_bytes(digits.as_bytes(), 16)
            .ok_or_else(|| format!("failed to parse quantity from hex '{s}'"))?;
        Ok(Self(value))
    }
}

impl TryFrom<String> for Quantity {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s)
    }
}

impl From<Quantity> for String {
    fn from(value: Quantity) -> Self {
        value.to_string()
    }
}

impl Debug for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl LowerHex for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// A 32-byte value, e.g. a block or transaction hash.
#[derive(Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Hash(#[serde(with = "serde_data")] pub [u8; 32]);

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Hash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| "Ethereum hash doesn't start with 0x".to_string())?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| format!("failed to decode hash from hex: {e}"))?;
        Ok(Self(bytes))
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl LowerHex for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl UpperHex for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode_upper(self.0))
    }
}

/// A 20-byte Ethereum account address.
#[derive(Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Address(#[serde(with = "serde_data")] pub [u8; 20]);

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| "Ethereum address doesn't start with 0x".to_string())?;
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| format!("failed to decode address from hex: {e}"))?;
        Ok(Self(bytes))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl LowerHex for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A variable-length byte string, e.g. call data or contract code.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq, Hash, derive_more::From)]
#[serde(transparent)]
pub struct Data(#[serde(with = "serde_data")] pub Vec<u8>);

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Data {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| "Ethereum hex string doesn't start with 0x".to_string())?;
        let bytes = hex::decode(digits).map_err(|e| format!("failed to decode hex: {e}"))?;
        Ok(Self(bytes))
    }
}

impl Debug for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl LowerHex for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

/// Block tags.
/// See <https://ethereum.org/en/developers/docs/apis/json-rpc/#default-block>
///
/// `safe` and `finalized` are deliberately not part of this set: the set of
/// tags mirrors what the fan-out can normalize (`latest` and `pending` pin
/// to the aggregated block number, `earliest` is rejected).
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    /// The latest mined block.
    #[default]
    Latest,
    /// The pending state.
    Pending,
    /// The earliest/genesis block.
    Earliest,
}

impl Display for BlockTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Pending => write!(f, "pending"),
            Self::Earliest => write!(f, "earliest"),
        }
    }
}

/// The block specification indicating which block to query: either a block
/// number or one of the reserved tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BlockSpec {
    /// Query the block with the specified index.
    Number(Quantity),
    /// Query the block with the specified tag.
    Tag(BlockTag),
}

impl BlockSpec {
    /// `true` as long as the specification is one of the reserved tags,
    /// `false` once it is a plain number.
    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag(_))
    }
}

impl Default for BlockSpec {
    fn default() -> Self {
        Self::Tag(BlockTag::default())
    }
}

impl From<Quantity> for BlockSpec {
    fn from(value: Quantity) -> Self {
        Self::Number(value)
    }
}

pub(crate) mod serde_data {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(data: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(data.as_ref())))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
        <T as TryFrom<Vec<u8>>>::Error: std::fmt::Debug,
    {
        let data = String::deserialize(deserializer)?;
        let digits = data
            .strip_prefix("0x")
            .ok_or_else(|| de::Error::custom("Ethereum hex string doesn't start with 0x"))?;
        let bytes = hex::decode(digits)
            .map_err(|e| de::Error::custom(format!("failed to decode hex: {e}")))?;
        T::try_from(bytes)
            .map_err(|e| de::Error::custom(format!("unexpected number of bytes: {e:?}")))
    }
}
