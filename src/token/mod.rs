//! Encrypted session tokens.
//!
//! A token is the AES-256-GCM ciphertext of the claims fields joined with a
//! fixed separator, carried as URL-safe base64. The codec is stateless and
//! safe to share across request tasks.

pub mod claims;
pub mod codec;

pub use claims::{Claims, SEP};
pub use codec::{TokenCodec, TokenError};
