//! # compact-jwe
//!
//! `compact-jwe` is a JWE (JSON Web Encryption: RFC 7516) compact
//! serialization library.
//!
//! It encrypts a payload into the five-segment compact token form and
//! decrypts such tokens against an ordered list of candidate RSA private
//! keys. Supported algorithm pairs: `RSA1_5` / `RSA-OAEP` key wrap with
//! `A128CBC-HS256`, `A256CBC-HS512`, `A128GCM` or `A256GCM` content
//! encryption.
//!
//! ```no_run
//! use compact_jwe::jwe::{self, JweHeader};
//! use compact_jwe::util::SecureRandom;
//! use openssl::rsa::Rsa;
//!
//! # fn main() -> anyhow::Result<()> {
//! let private_key = Rsa::generate(2048)?;
//! let public_key = Rsa::from_public_components(
//!     private_key.n().to_owned()?,
//!     private_key.e().to_owned()?,
//! )?;
//!
//! let mut header = JweHeader::new();
//! header.set_algorithm("RSA-OAEP");
//! header.set_content_encryption("A256GCM");
//!
//! let mut rng = SecureRandom::new();
//! let token = jwe::serialize_compact(b"hello", &header, &public_key, &mut rng)?;
//! let (payload, _header) =
//!     jwe::deserialize_compact(&mut rng, &[private_key], &token)?;
//! assert_eq!(payload, b"hello");
//! # Ok(())
//! # }
//! ```
pub mod jwe;
pub mod util;

mod error;

pub use crate::error::JweError;
