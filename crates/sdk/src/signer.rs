//! Admin keypair handling.
//!
//! Secrets use the ledger's `S…` strkey encoding and public keys the `G…`
//! encoding. One keypair signs every write the client makes, so its account
//! sequence is the serialization point for all writes.

use std::fmt;

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use stellar_strkey::ed25519::{PrivateKey, PublicKey};

use crate::{
    error::{Result, VaultError},
    rpc::{SignedTransaction, Transaction},
};

/// An ed25519 keypair with its encoded public key.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
    public_key: String,
}

impl Keypair {
    /// Parses an `S…` secret seed.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Signer` if the seed is not a valid strkey.
    pub fn from_secret(secret: &str) -> Result<Self> {
        let key = PrivateKey::from_string(secret.trim())
            .map_err(|e| VaultError::Signer { message: format!("invalid secret seed: {e:?}") })?;
        Ok(Self::from_seed(key.0))
    }

    /// Builds a keypair from raw seed bytes.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&seed);
        let public_key = PublicKey(signing.verifying_key().to_bytes()).to_string();
        Self { signing, public_key }
    }

    /// Returns the `G…` public key.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Returns the `S…` secret seed.
    #[must_use]
    pub fn secret(&self) -> String {
        PrivateKey(self.signing.to_bytes()).to_string()
    }

    /// Signs a message.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing.sign(message)
    }

    /// Signs a transaction for the given network.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Signer` if the transaction cannot be encoded.
    pub fn sign_transaction(
        &self,
        transaction: Transaction,
        network_passphrase: &str,
    ) -> Result<SignedTransaction> {
        let payload = transaction.signing_payload(network_passphrase)?;
        let signature = hex::encode(self.sign(&payload).to_bytes());
        Ok(SignedTransaction { transaction, signer: self.public_key.clone(), signature })
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair").field("public_key", &self.public_key).finish_non_exhaustive()
    }
}

/// Checks a signed transaction against its claimed signer.
///
/// # Errors
///
/// Returns `VaultError::Signer` if the key, signature encoding or signature
/// itself is invalid.
pub fn verify_transaction(signed: &SignedTransaction, network_passphrase: &str) -> Result<()> {
    let signer_err = |message: String| VaultError::Signer { message };

    let public = PublicKey::from_string(&signed.signer)
        .map_err(|e| signer_err(format!("invalid signer {}: {e:?}", signed.signer)))?;
    let key = VerifyingKey::from_bytes(&public.0)
        .map_err(|e| signer_err(format!("invalid signer key: {e}")))?;
    let raw = hex::decode(&signed.signature)
        .map_err(|e| signer_err(format!("invalid signature encoding: {e}")))?;
    let signature =
        Signature::from_slice(&raw).map_err(|e| signer_err(format!("invalid signature: {e}")))?;

    let payload = signed.transaction.signing_payload(network_passphrase)?;
    key.verify(&payload, &signature).map_err(|e| signer_err(format!("bad signature: {e}")))
}
