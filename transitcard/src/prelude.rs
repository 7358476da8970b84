// transitcard-rs/transitcard/src/prelude.rs

pub use crate::card::{Card, CardData, CardIdentity};
pub use crate::keys::{KeyRetriever, MergedKeyRetriever, NoKeys, StaticKeys};
pub use crate::progress::{LogProgress, NoopProgress, ProgressSink};
pub use crate::protocol::CardStatus;
pub use crate::reader::{CardReader, DesfireUnlocker, Iso7816AppProbe, ReaderConfig};
pub use crate::transport::{ClassicTech, Connection, Session, Transport};
pub use crate::{
    CardKind, ClassicKey, ClassicSectorKey, DesfireAppId, Error, ErrorKind, Idm, KeyType, Pmm,
    Result, ServiceCode, SystemCode, TagId,
};

// Re-export small utilities for convenience
pub use crate::utils::{bytes_to_hex, bytes_to_hex_spaced, parse_hex};
