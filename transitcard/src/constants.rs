// transitcard-rs/transitcard/src/constants.rs
//! Common protocol constants used across the crate

use crate::types::ClassicKey;

/// ISO7816 interindustry class byte
pub const CLASS_ISO7816: u8 = 0x00;
/// Proprietary class bytes
pub const CLASS_80: u8 = 0x80;
pub const CLASS_90: u8 = 0x90;

/// ISO7816 instructions
pub const INS_SELECT_FILE: u8 = 0xA4;
pub const INS_READ_BINARY: u8 = 0xB0;
pub const INS_READ_RECORD: u8 = 0xB2;

/// SW1 for a successful ISO7816 response
pub const SW1_OK: u8 = 0x90;

/// Record numbers are 1-origin and at most 255
pub const MAX_RECORD_NUMBER: u8 = 255;
/// Short file identifiers range over 1..=31
pub const MAX_SFI: u8 = 31;

/// DESFire native command codes
pub const DESFIRE_UNLOCK: u8 = 0x0A;
pub const DESFIRE_GET_MANUFACTURING_DATA: u8 = 0x60;
pub const DESFIRE_GET_APPLICATION_DIRECTORY: u8 = 0x6A;
pub const DESFIRE_GET_ADDITIONAL_FRAME: u8 = 0xAF;
pub const DESFIRE_SELECT_APPLICATION: u8 = 0x5A;
pub const DESFIRE_READ_DATA: u8 = 0xBD;
pub const DESFIRE_READ_RECORD: u8 = 0xBB;
pub const DESFIRE_GET_VALUE: u8 = 0x6C;
pub const DESFIRE_GET_FILES: u8 = 0x6F;
pub const DESFIRE_GET_FILE_SETTINGS: u8 = 0xF5;

/// Marker preceding the DESFire status byte in a wrapped response
pub const DESFIRE_STATUS_MARKER: u8 = 0x91;
pub const DESFIRE_STATUS_OK: u8 = 0x00;
pub const DESFIRE_STATUS_ADDITIONAL_FRAME: u8 = 0xAF;

/// Length of the GetVersion (manufacturing data) payload
pub const DESFIRE_MANUFACTURING_DATA_LEN: usize = 28;

/// FeliCa command codes; responses carry `code + 1`
pub const FELICA_CMD_POLLING: u8 = 0x00;
pub const FELICA_CMD_READ_WO_ENCRYPTION: u8 = 0x06;
pub const FELICA_CMD_SEARCH_SERVICE_CODE: u8 = 0x0A;
pub const FELICA_CMD_REQUEST_SYSTEM_CODE: u8 = 0x0C;
pub const FELICA_CMD_RESET_MODE: u8 = 0x3E;

/// Polling request code asking the card to append its system code
pub const FELICA_REQUEST_SYSTEM_CODE: u8 = 0x01;
/// Maximum number of time slots a polled card may answer in
pub const FELICA_TIME_SLOTS: u8 = 0x07;
/// ReadWithoutEncryption accepts at most 15 block elements
pub const FELICA_MAX_READ_BLOCKS: usize = 15;
/// FeliCa block payload length
pub const FELICA_BLOCK_LEN: usize = 16;
/// SearchServiceCode terminator
pub const FELICA_SERVICE_END: u16 = 0xffff;

/// Octopus / Shenzhen Tong systems that do not answer RequestSystemCode
pub const SYSTEMCODE_OCTOPUS: u16 = 0x8008;
pub const SERVICE_OCTOPUS: u16 = 0x0117;
pub const SYSTEMCODE_SZT: u16 = 0x8005;
pub const SERVICE_SZT: u16 = 0x0118;
/// FeliCa Lite read-only service; Lite cards expose no system code list
pub const SERVICE_FELICA_LITE_READONLY: u16 = 0x000b;
/// FeliCa Lite user blocks end here
pub const FELICA_LITE_BLOCK_LIMIT: u16 = 0x20;

/// CEPAS runs over ISO7816 with a proprietary class and instruction
pub const CEPAS_CLASS: u8 = CLASS_90;
pub const CEPAS_INS_READ_PURSE: u8 = 0x32;
/// Main CEPAS directory; selecting it identifies a CEPAS card
pub const CEPAS_MAIN_DF: u16 = 0x4000;
pub const CEPAS_MASTER_FILE: u16 = 0x3f00;
pub const CEPAS_PURSE_COUNT: u8 = 16;
pub const CEPAS_TRANSACTION_LEN: usize = 16;
/// Fixed purse header length before issuer data
pub const CEPAS_PURSE_HEADER_LEN: usize = 62;
/// 1995-01-01 00:00 SGT (UTC+8) as a Unix timestamp
pub const CEPAS_EPOCH_UNIX: i64 = 788_889_600;

/// MIFARE Classic block length
pub const CLASSIC_BLOCK_LEN: usize = 16;
/// Sectors below this index hold 4 blocks, the rest 16 (MIFARE Classic 4K)
pub const CLASSIC_SMALL_SECTOR_COUNT: usize = 32;
/// Progress ticks reported per sector
pub const CLASSIC_PROGRESS_PER_SECTOR: usize = 5;

/// Publicly documented default keys, tried as type A then B.
pub const WELL_KNOWN_KEYS: [ClassicKey; 4] = [
    // Null key
    ClassicKey::from_bytes([0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
    // Factory default
    ClassicKey::from_bytes([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]),
    // MIFARE Application Directory
    ClassicKey::from_bytes([0xa0, 0xa1, 0xa2, 0xa3, 0xa4, 0xa5]),
    // NFC Forum
    ClassicKey::from_bytes([0xd3, 0xf7, 0xd3, 0xf7, 0xd3, 0xf7]),
];

/// Empty-block sentinels
pub const BLOCK_ALL_ZERO: [u8; 16] = [0x00; 16];
pub const BLOCK_ALL_FF: [u8; 16] = [0xff; 16];
/// Value block holding zero with address 0
pub const BLOCK_VALUE_ZERO: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x00,
    0xff,
];
