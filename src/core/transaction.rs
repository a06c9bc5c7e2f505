// A transaction is an immutable economic record. Its id is the digest of
// every economic field, so nothing except the later-assigned block id may
// change after construction.

use crate::error::{BlockchainError, Result};
use crate::utils::{hash, Hash};
use serde::{Deserialize, Serialize};

// The identity-bearing part of a transaction. Field order is part of the
// canonical encoding and therefore of every transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode)]
struct TransactionBody {
    #[serde(with = "hex_bytes")]
    sender: Vec<u8>,
    #[serde(with = "hex_bytes")]
    receiver: Vec<u8>,
    amount: f64,
    nonce: u64,
    fee_base_price: f64,
    fee_limit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aux_tag: Option<String>,
}

impl TransactionBody {
    fn validate(&self) -> Result<()> {
        if self.sender.is_empty() {
            return Err(BlockchainError::InvalidField(
                "sender must not be empty".to_string(),
            ));
        }
        if self.receiver.is_empty() {
            return Err(BlockchainError::InvalidField(
                "receiver must not be empty".to_string(),
            ));
        }
        check_non_negative("amount", self.amount)?;
        check_non_negative("fee_base_price", self.fee_base_price)?;
        check_non_negative("fee_limit", self.fee_limit)?;
        Ok(())
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(BlockchainError::InvalidField(format!(
            "{field} must be a finite, non-negative number, got {value}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord")]
pub struct Transaction {
    #[serde(flatten)]
    body: TransactionBody,
    id: Hash,
    // Assigned once the transaction is mined; never part of the id and
    // never written with the transaction.
    #[serde(skip)]
    block_id: Option<Hash>,
}

// Shape of a persisted transaction. The id is recomputed on load and must
// match the stored one.
#[derive(Deserialize)]
struct TransactionRecord {
    #[serde(flatten)]
    body: TransactionBody,
    id: Hash,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = BlockchainError;

    fn try_from(record: TransactionRecord) -> Result<Self> {
        let tx = Transaction::from_body(record.body)?;
        if tx.id != record.id {
            return Err(BlockchainError::InvalidField(format!(
                "stored transaction id {} does not match its content ({})",
                record.id, tx.id
            )));
        }
        Ok(tx)
    }
}

impl Transaction {
    pub fn new(
        sender: impl Into<Vec<u8>>,
        receiver: impl Into<Vec<u8>>,
        amount: f64,
        nonce: u64,
        fee_base_price: f64,
        fee_limit: f64,
        aux_tag: Option<String>,
    ) -> Result<Transaction> {
        Self::from_body(TransactionBody {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            nonce,
            fee_base_price,
            fee_limit,
            aux_tag,
        })
    }

    fn from_body(body: TransactionBody) -> Result<Transaction> {
        body.validate()?;
        let id = hash(&body)?;
        Ok(Transaction {
            body,
            id,
            block_id: None,
        })
    }

    /// Digest of the encoded economic fields, recomputed from scratch
    pub fn compute_id(&self) -> Result<Hash> {
        hash(&self.body)
    }

    pub fn get_id(&self) -> &Hash {
        &self.id
    }

    pub fn get_id_hex(&self) -> String {
        self.id.to_hex()
    }

    pub fn get_sender(&self) -> &[u8] {
        self.body.sender.as_slice()
    }

    pub fn get_receiver(&self) -> &[u8] {
        self.body.receiver.as_slice()
    }

    pub fn get_amount(&self) -> f64 {
        self.body.amount
    }

    pub fn get_nonce(&self) -> u64 {
        self.body.nonce
    }

    pub fn get_fee_base_price(&self) -> f64 {
        self.body.fee_base_price
    }

    pub fn get_fee_limit(&self) -> f64 {
        self.body.fee_limit
    }

    pub fn get_aux_tag(&self) -> Option<&str> {
        self.body.aux_tag.as_deref()
    }

    /// Hash of the block that included this transaction, `None` while pending
    pub fn get_block_id(&self) -> Option<&Hash> {
        self.block_id.as_ref()
    }

    pub fn set_block_id(&mut self, block_id: Hash) {
        self.block_id = Some(block_id);
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transaction {}

mod hex_bytes {
    use data_encoding::HEXLOWER;
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&HEXLOWER.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(deserializer)?;
        HEXLOWER.decode(hex.as_bytes()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(fee: f64) -> Transaction {
        Transaction::new(
            b"alice".to_vec(),
            b"bob".to_vec(),
            1.1,
            7,
            fee,
            0.1,
            Some("prov-tag".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_id_matches_content_hash() {
        let tx = sample(3.0);
        assert_eq!(tx.compute_id().unwrap(), *tx.get_id());
        assert_eq!(tx.compute_id().unwrap(), tx.compute_id().unwrap());
    }

    #[test]
    fn test_id_depends_on_every_economic_field() {
        let base = sample(3.0);
        let other_fee = sample(4.0);
        let other_tag = Transaction::new(
            b"alice".to_vec(),
            b"bob".to_vec(),
            1.1,
            7,
            3.0,
            0.1,
            None,
        )
        .unwrap();
        assert_ne!(base.get_id(), other_fee.get_id());
        assert_ne!(base.get_id(), other_tag.get_id());
    }

    #[test]
    fn test_block_id_not_part_of_identity() {
        let mut tx = sample(1.0);
        let id = *tx.get_id();
        assert!(tx.get_block_id().is_none());

        tx.set_block_id(Hash([7u8; 32]));
        assert_eq!(tx.get_block_id(), Some(&Hash([7u8; 32])));
        assert_eq!(*tx.get_id(), id);
        assert_eq!(tx.compute_id().unwrap(), id);
    }

    #[test]
    fn test_equality_is_by_id() {
        let mut a = sample(1.0);
        let b = sample(1.0);
        a.set_block_id(Hash([1u8; 32]));
        assert_eq!(a, b);
        assert_ne!(a, sample(2.0));
    }

    #[test]
    fn test_rejects_invalid_fields() {
        let empty_sender = Transaction::new(Vec::new(), b"bob".to_vec(), 1.0, 0, 0.0, 0.0, None);
        assert!(matches!(
            empty_sender,
            Err(BlockchainError::InvalidField(_))
        ));

        let nan_amount = Transaction::new(
            b"a".to_vec(),
            b"b".to_vec(),
            f64::NAN,
            0,
            0.0,
            0.0,
            None,
        );
        assert!(nan_amount.is_err());

        let negative_fee =
            Transaction::new(b"a".to_vec(), b"b".to_vec(), 1.0, 0, -1.0, 0.0, None);
        assert!(negative_fee.is_err());

        let infinite_limit = Transaction::new(
            b"a".to_vec(),
            b"b".to_vec(),
            1.0,
            0,
            0.0,
            f64::INFINITY,
            None,
        );
        assert!(infinite_limit.is_err());
    }

    #[test]
    fn test_json_projection_omits_block_id() {
        let mut tx = sample(2.0);
        tx.set_block_id(Hash([9u8; 32]));
        let json = tx.to_json().unwrap();

        assert_eq!(json["sender"], "616c696365");
        assert_eq!(json["id"], tx.get_id_hex());
        assert!(json.get("block_id").is_none());
    }

    #[test]
    fn test_json_reload_recomputes_id() {
        let tx = sample(2.0);
        let text = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&text).unwrap();
        assert_eq!(back.get_id(), tx.get_id());
        assert!(back.get_block_id().is_none());
    }

    #[test]
    fn test_json_reload_rejects_tampered_content() {
        let tx = sample(2.0);
        let mut json = tx.to_json().unwrap();
        json["amount"] = serde_json::json!(999.0);
        let result: std::result::Result<Transaction, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }
}
