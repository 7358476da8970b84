// transitcard-rs/transitcard/src/lib.rs

//! transitcard
//!
//! Pure Rust acquisition of contactless transit smart cards: ISO7816,
//! MIFARE DESFire, FeliCa, CEPAS and MIFARE Classic. The crate speaks the
//! card protocols over a caller-supplied [`transport::Transport`] and
//! assembles what it reads into an immutable [`card::Card`].

pub mod card;
pub mod constants;
pub mod error;
pub mod keys;
pub mod prelude;
pub mod progress;
pub mod protocol;
pub mod reader;
#[doc(hidden)]
pub mod test_support;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export common types at crate root so `crate::Error`, `crate::Result`,
// and the newtypes in `types` are available for consumers and for
// convenient `prelude` re-exports.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
