//! Credential material: random generation and the dual-hash scheme.

pub mod hasher;
pub mod secret;

pub use hasher::{CredentialHasher, HashConfig};
pub use secret::{RawSecret, SecretGenerator};
