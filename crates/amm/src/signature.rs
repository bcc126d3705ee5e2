//! Typed-data (EIP-712) signature checks for orders.

use crate::order::Order;
use crate::types::{Address, B256, U256};
use alloy::primitives::{uint, Signature};
use alloy::sol_types::{Eip712Domain, SolStruct};
use std::borrow::Cow;

/// Domain name orders are signed under.
pub const DOMAIN_NAME: &str = "OrderManager";

/// Domain version orders are signed under.
pub const DOMAIN_VERSION: &str = "1";

/// Order of the secp256k1 group.
const SECP256K1_N: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

/// Largest accepted `s`; anything above is the malleable twin of a low-s signature.
const SECP256K1_HALF_N: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Reasons a signature byte string is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must be 64 or 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("r out of range")]
    InvalidR,

    #[error("s out of range")]
    InvalidS,

    #[error("signer could not be recovered")]
    Unrecoverable,
}

/// Parse a 65-byte `r || s || v` or 64-byte ERC-2098 `r || vs` signature.
///
/// Only canonical low-s signatures with `v` in {27, 28} are accepted.
pub fn parse_signature(bytes: &[u8]) -> Result<Signature, SignatureError> {
    let (r, s, y_parity) = match bytes.len() {
        65 => {
            let y_parity = match bytes[64] {
                27 => false,
                28 => true,
                v => return Err(SignatureError::InvalidRecoveryId(v)),
            };
            (
                U256::from_be_slice(&bytes[..32]),
                U256::from_be_slice(&bytes[32..64]),
                y_parity,
            )
        }
        64 => {
            let vs = U256::from_be_slice(&bytes[32..64]);
            let y_parity = vs.bit(255);
            let mut s = vs;
            s.set_bit(255, false);
            (U256::from_be_slice(&bytes[..32]), s, y_parity)
        }
        len => return Err(SignatureError::InvalidLength(len)),
    };

    if r.is_zero() || r >= SECP256K1_N {
        return Err(SignatureError::InvalidR);
    }
    if s.is_zero() || s > SECP256K1_HALF_N {
        return Err(SignatureError::InvalidS);
    }
    Ok(Signature::new(r, s, y_parity))
}

/// Canonical `r || s || v` form of a signature, identical for every accepted
/// encoding of it.
pub fn canonical_signature(bytes: &[u8]) -> Result<[u8; 65], SignatureError> {
    parse_signature(bytes).map(|signature| signature.as_bytes())
}

/// Verifies that orders were signed by their `from` address.
#[derive(Debug, Clone)]
pub struct OrderSignatureValidator {
    domain: Eip712Domain,
}

impl OrderSignatureValidator {
    /// Validator for orders executed by the contract at `verifying_contract` on `chain_id`.
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            domain: Eip712Domain::new(
                Some(Cow::Borrowed(DOMAIN_NAME)),
                Some(Cow::Borrowed(DOMAIN_VERSION)),
                Some(U256::from(chain_id)),
                Some(verifying_contract),
                None,
            ),
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    pub fn domain_separator(&self) -> B256 {
        self.domain.separator()
    }

    /// The digest a signer signs for `order`.
    pub fn order_hash(&self, order: &Order) -> B256 {
        order.eip712_signing_hash(&self.domain)
    }

    /// Recover the address that signed `order`, if the signature is well formed.
    pub fn recover_signer(&self, order: &Order, signature: &[u8]) -> Result<Address, SignatureError> {
        let signature = parse_signature(signature)?;
        let signer = signature
            .recover_address_from_prehash(&self.order_hash(order))
            .map_err(|_| SignatureError::Unrecoverable)?;
        if signer == Address::ZERO {
            return Err(SignatureError::Unrecoverable);
        }
        Ok(signer)
    }

    /// Whether `signature` over `order` was produced by `order.from`.
    ///
    /// Malformed signatures are reported as invalid, never as an error.
    pub fn is_valid(&self, order: &Order, signature: &[u8]) -> bool {
        matches!(self.recover_signer(order, signature), Ok(signer) if signer == order.from)
    }
}
