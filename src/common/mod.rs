//! Building blocks shared by the issuing and the verifying side.

pub mod config;
pub mod errors;
pub mod nonce;
pub mod signer;
