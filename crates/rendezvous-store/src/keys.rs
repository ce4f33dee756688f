//! Key encoding utilities.
//!
//! All identifiers are 16 bytes, so composite keys are fixed-width
//! concatenations and prefix scans select every child of a parent.

use rendezvous_core::TransactionId;

/// Width of every encoded identifier.
pub const ID_LEN: usize = 16;

/// Create a primary key from an identifier's bytes.
#[must_use]
pub fn id_key(id: &[u8; ID_LEN]) -> Vec<u8> {
    id.to_vec()
}

/// Create a composite key `parent || child`.
#[must_use]
pub fn pair_key(parent: &[u8; ID_LEN], child: &[u8; ID_LEN]) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN * 2);
    key.extend_from_slice(parent);
    key.extend_from_slice(child);
    key
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Since ULIDs are time-ordered, transactions for a user sort by time.
#[must_use]
pub fn user_transaction_key(user_id: &[u8; ID_LEN], transaction_id: &TransactionId) -> Vec<u8> {
    pair_key(user_id, &transaction_id.to_bytes())
}

/// Create a payment reference key.
#[must_use]
pub fn payment_key(payment_transaction_id: &str) -> Vec<u8> {
    payment_transaction_id.as_bytes().to_vec()
}

/// Extract the child id from a `parent || child` key.
///
/// Returns `None` if the key is not exactly two ids long.
#[must_use]
pub fn child_id(key: &[u8]) -> Option<[u8; ID_LEN]> {
    if key.len() != ID_LEN * 2 {
        return None;
    }
    key[ID_LEN..].try_into().ok()
}

/// Read a stored 16-byte id value.
#[must_use]
pub fn id_value(value: &[u8]) -> Option<[u8; ID_LEN]> {
    value.try_into().ok()
}
