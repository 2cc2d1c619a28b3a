use serde::{Deserialize, Serialize};

use crate::crypto::{hash_value, Hash, ScId};
use crate::error::CoreError;
use crate::types::amount::Amount;

/// Flavor of the payment payload enclosing the sidechain outputs.
///
/// The payload itself (inputs, scripts, shielded proofs) is handled by
/// the transaction layer; the state engine only needs to know which
/// flavor it is dealing with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    Transparent,
    Shielded,
}

/// A sidechain-related transaction output.
///
/// Outputs apply in the order they appear in the transaction; a forward
/// transfer funding a sidechain created by the same transaction must
/// come after the creation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScOutput {
    /// Declares a new sidechain. `data` is the opaque creation-parameters
    /// blob, carried verbatim into the sidechain record.
    Creation { sc_id: ScId, data: Vec<u8> },
    /// Forwards `amount` from the main chain to the sidechain `sc_id`.
    Forward { sc_id: ScId, amount: Amount },
}

impl ScOutput {
    pub fn sc_id(&self) -> &ScId {
        match self {
            ScOutput::Creation { sc_id, .. } => sc_id,
            ScOutput::Forward { sc_id, .. } => sc_id,
        }
    }
}

/// A transaction, reduced to the fields the sidechain engine consumes.
///
/// Signatures, scripts, and the transparent/shielded value transfer are
/// validated elsewhere; `nonce` stands in for the envelope fields that
/// make two otherwise-identical transactions distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub payload: PayloadKind,
    pub nonce: u64,
    pub sc_outputs: Vec<ScOutput>,
}

impl Transaction {
    pub fn new(payload: PayloadKind, nonce: u64, sc_outputs: Vec<ScOutput>) -> Self {
        Transaction {
            payload,
            nonce,
            sc_outputs,
        }
    }

    /// Compute the transaction hash.
    pub fn hash(&self) -> Result<Hash, CoreError> {
        hash_value(self)
    }

    /// Whether the transaction carries any sidechain output at all.
    pub fn has_sc_outputs(&self) -> bool {
        !self.sc_outputs.is_empty()
    }

    /// Iterate the creation outputs, in order.
    pub fn creations(&self) -> impl Iterator<Item = (&ScId, &[u8])> {
        self.sc_outputs.iter().filter_map(|out| match out {
            ScOutput::Creation { sc_id, data } => Some((sc_id, data.as_slice())),
            ScOutput::Forward { .. } => None,
        })
    }

    /// Iterate the forward-transfer outputs, in order.
    pub fn forwards(&self) -> impl Iterator<Item = (&ScId, Amount)> {
        self.sc_outputs.iter().filter_map(|out| match out {
            ScOutput::Forward { sc_id, amount } => Some((sc_id, *amount)),
            ScOutput::Creation { .. } => None,
        })
    }

    /// True iff this transaction declares the given sidechain.
    pub fn creates_sidechain(&self, sc_id: &ScId) -> bool {
        self.creations().any(|(id, _)| id == sc_id)
    }

    /// True iff any forward output of this transaction targets `sc_id`.
    pub fn any_forward_to(&self, sc_id: &ScId) -> bool {
        self.forwards().any(|(id, _)| id == sc_id)
    }
}
