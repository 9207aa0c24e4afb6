// Identity module - Ed25519 keys, signatures, and ledger addresses

mod address;
mod keypair;
mod signer;

pub use address::*;
pub use keypair::*;
pub use signer::*;
