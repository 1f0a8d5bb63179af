//! Deterministic session accounts derived from one BIP-39 seed.
//!
//! Every role gets the Cosmos SDK path `m/44'/118'/0'/0/<index>` with a fixed
//! per-role index, so a seed and prefix always yield the same addresses.

use bech32::{Bech32, Hrp};
use bip39::Mnemonic;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::hashes::{hash160, Hash};
use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::Network as BtcNetwork;
use sha2::{Digest, Sha256};

use crate::domain::errors::{BootstrapError, ChainError};
use crate::domain::models::{AccountBook, AccountRole, SeedPhrase};

/// SLIP-0044 coin type of Cosmos SDK chains
const COSMOS_COIN_TYPE: u32 = 118;

struct SigningKey {
    role: AccountRole,
    address: String,
    secret: SecretKey,
    public: PublicKey,
}

/// Signing keys of every derived session account
pub struct Wallet {
    secp: Secp256k1<All>,
    keys: Vec<SigningKey>,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field(
                "accounts",
                &self
                    .keys
                    .iter()
                    .map(|k| (k.role, k.address.as_str()))
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Derive keys for `roles` from `seed`, addresses encoded with `prefix`
    pub fn derive(
        seed: &SeedPhrase,
        prefix: &str,
        roles: &[AccountRole],
    ) -> Result<Self, BootstrapError> {
        let mnemonic = Mnemonic::parse(seed.expose())
            .map_err(|e| BootstrapError::WalletDerivationFailed(format!("invalid mnemonic: {e}")))?;
        let seed_bytes = mnemonic.to_seed("");

        let secp = Secp256k1::new();
        let master = Xpriv::new_master(BtcNetwork::Bitcoin, &seed_bytes)
            .map_err(|e| BootstrapError::WalletDerivationFailed(e.to_string()))?;

        let mut keys = Vec::with_capacity(roles.len());
        for &role in roles {
            let path = derivation_path(role.derivation_index())?;
            let derived = master
                .derive_priv(&secp, &path)
                .map_err(|e| BootstrapError::WalletDerivationFailed(e.to_string()))?;
            let secret = derived.private_key;
            let public = PublicKey::from_secret_key(&secp, &secret);
            let address = address_from_pubkey(prefix, &public)?;
            keys.push(SigningKey {
                role,
                address,
                secret,
                public,
            });
        }

        Ok(Self { secp, keys })
    }

    /// Role to address mapping of the derived accounts
    pub fn account_book(&self) -> AccountBook {
        AccountBook::new(self.keys.iter().map(|k| (k.role, k.address.clone())))
    }

    pub fn has_key(&self, address: &str) -> bool {
        self.key(address).is_some()
    }

    /// Compressed secp256k1 public key of `address`
    pub fn public_key(&self, address: &str) -> Result<[u8; 33], ChainError> {
        Ok(self.require_key(address)?.public.serialize())
    }

    /// Compact ECDSA signature over sha256(`sign_doc`)
    pub fn sign(&self, address: &str, sign_doc: &[u8]) -> Result<[u8; 64], ChainError> {
        let key = self.require_key(address)?;
        let digest: [u8; 32] = Sha256::digest(sign_doc).into();
        let message = Message::from_digest(digest);
        Ok(self.secp.sign_ecdsa(&message, &key.secret).serialize_compact())
    }

    fn key(&self, address: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.address == address)
    }

    fn require_key(&self, address: &str) -> Result<&SigningKey, ChainError> {
        self.key(address)
            .ok_or_else(|| ChainError::UnknownSigner(address.to_string()))
    }
}

fn derivation_path(index: u32) -> Result<DerivationPath, BootstrapError> {
    let child = |n: Result<ChildNumber, bitcoin::bip32::Error>| {
        n.map_err(|e| BootstrapError::WalletDerivationFailed(e.to_string()))
    };
    Ok(DerivationPath::from(vec![
        child(ChildNumber::from_hardened_idx(44))?,
        child(ChildNumber::from_hardened_idx(COSMOS_COIN_TYPE))?,
        child(ChildNumber::from_hardened_idx(0))?,
        child(ChildNumber::from_normal_idx(0))?,
        child(ChildNumber::from_normal_idx(index))?,
    ]))
}

/// bech32(prefix, ripemd160(sha256(compressed pubkey)))
fn address_from_pubkey(prefix: &str, public: &PublicKey) -> Result<String, BootstrapError> {
    let hrp = Hrp::parse(prefix).map_err(|e| {
        BootstrapError::WalletDerivationFailed(format!("invalid address prefix '{prefix}': {e}"))
    })?;
    let hash = hash160::Hash::hash(&public.serialize()).to_byte_array();
    bech32::encode::<Bech32>(hrp, &hash)
        .map_err(|e| BootstrapError::WalletDerivationFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_known_cosmos_address() {
        let wallet = Wallet::derive(
            &SeedPhrase::new(MNEMONIC),
            "cosmos",
            &[AccountRole::Deployer],
        )
        .unwrap();
        assert_eq!(
            wallet.account_book().deployer(),
            "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4"
        );
    }

    #[test]
    fn test_derivation_is_stable_and_distinct() {
        let roles = AccountRole::all();
        let first = Wallet::derive(&SeedPhrase::new(MNEMONIC), "juno", &roles).unwrap();
        let second = Wallet::derive(&SeedPhrase::new(MNEMONIC), "juno", &roles).unwrap();
        assert_eq!(first.account_book(), second.account_book());

        let book = first.account_book();
        assert_eq!(book.len(), roles.len());
        let mut addresses: Vec<&str> = book.iter().map(|(_, a)| a).collect();
        addresses.sort_unstable();
        addresses.dedup();
        assert_eq!(addresses.len(), roles.len());
        assert!(addresses.iter().all(|a| a.starts_with("juno1")));
    }

    #[test]
    fn test_invalid_mnemonic_is_rejected() {
        let err = Wallet::derive(
            &SeedPhrase::new("not a valid mnemonic"),
            "juno",
            &[AccountRole::Deployer],
        )
        .unwrap_err();
        assert!(matches!(err, BootstrapError::WalletDerivationFailed(_)));
    }

    #[test]
    fn test_sign_requires_known_address() {
        let wallet = Wallet::derive(
            &SeedPhrase::new(MNEMONIC),
            "juno",
            &[AccountRole::Deployer],
        )
        .unwrap();
        let deployer = wallet.account_book().deployer().to_string();
        let signature = wallet.sign(&deployer, b"sign doc").unwrap();
        assert_eq!(signature.len(), 64);
        assert_eq!(wallet.public_key(&deployer).unwrap().len(), 33);
        assert!(matches!(
            wallet.sign("juno1stranger", b"sign doc"),
            Err(ChainError::UnknownSigner(_))
        ));
    }
}
