//! Public-key cryptography for Tor.
//!
//! Legacy parts of Tor use RSA; newer signing uses Ed25519.

pub mod ed25519;
pub mod rsa;

/// A validatable signature: a signature, its public key, and (a reference
/// to) the document it signs, bundled so generic code can check a
/// heterogeneous batch of signatures without caring which algorithm each one
/// uses.
///
/// Used with [`validate_all_sigs`].
pub trait ValidatableSignature {
    /// Check whether this signature is a correct signature for the
    /// document.
    fn is_valid(&self) -> bool;

    /// Return this value as a validatable Ed25519 signature, if it is one.
    fn as_ed25519(&self) -> Option<&ed25519::ValidatableEd25519Signature> {
        None
    }
}

/// Check whether every signature in `v` is valid.
///
/// Returns `true` only if every signature is valid. Ed25519 signatures are
/// checked as a batch where possible.
pub fn validate_all_sigs(v: &[Box<dyn ValidatableSignature>]) -> bool {
    let mut ed_sigs = Vec::new();
    let mut non_ed_sigs = Vec::new();
    for sig in v.iter() {
        match sig.as_ed25519() {
            Some(ed_sig) => ed_sigs.push(ed_sig),
            None => non_ed_sigs.push(sig),
        }
    }

    let ed_batch_is_valid = ed25519::validate_batch(&ed_sigs[..]);
    ed_batch_is_valid && non_ed_sigs.iter().all(|b| b.is_valid())
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::ed25519::{Keypair, Signer};
    use super::ValidatableSignature;

    #[test]
    fn validate_all_ed25519_batch() {
        use super::ed25519::ValidatableEd25519Signature;
        use rand::rngs::OsRng;

        let keypair = Keypair::generate(&mut OsRng);
        let msg = b"a consensus document";
        let sig = keypair.sign(msg);
        let ed = ValidatableEd25519Signature::new(keypair.verifying_key(), sig, msg);

        let sigs: Vec<Box<dyn ValidatableSignature>> = vec![Box::new(ed)];
        assert!(super::validate_all_sigs(&sigs));
    }
}
