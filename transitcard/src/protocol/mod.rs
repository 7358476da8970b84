// transitcard-rs/transitcard/src/protocol/mod.rs

pub mod cepas;
pub mod desfire;
pub mod felica;
pub mod iso7816;
pub mod parser;
pub mod status;

pub use cepas::CepasProtocol;
pub use desfire::DesfireProtocol;
pub use felica::FelicaProtocol;
pub use iso7816::{Apdu, ApduResponse, Iso7816Protocol};
pub use status::CardStatus;
