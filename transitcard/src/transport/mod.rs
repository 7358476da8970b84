// transitcard-rs/transitcard/src/transport/mod.rs

pub mod mock;
pub mod session;
pub mod traits;

pub use mock::{MockClassicTag, MockReply, MockSector, MockTransport};
pub use session::Session;
pub use traits::{ClassicTech, Connection, Transport};
