// transitcard-rs/transitcard/src/transport/mock.rs

use crate::transport::traits::{ClassicTech, Connection, Transport};
use crate::types::{ClassicKey, KeyType, TagId};
use crate::{Error, Result};
use std::collections::HashSet;

/// One scripted reply of a [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Data(Vec<u8>),
    /// The card leaves the field on this request.
    Lost,
    /// Generic I/O failure.
    Fail(String),
}

/// Mock transport for unit tests. It records sent payloads and returns queued responses.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub sent: Vec<Vec<u8>>,
    pub responses: Vec<MockReply>,
    pub tag_id: TagId,
    pub connected: bool,
    pub connect_calls: usize,
    pub close_calls: usize,
}

impl MockTransport {
    pub fn new(tag_id: &[u8]) -> Self {
        Self {
            tag_id: TagId::new(tag_id),
            ..Default::default()
        }
    }

    /// Already-connected mock for protocol-level tests that bypass a session.
    pub fn connected(tag_id: &[u8]) -> Self {
        let mut m = Self::new(tag_id);
        m.connected = true;
        m
    }

    pub fn push_response(&mut self, resp: Vec<u8>) {
        self.responses.push(MockReply::Data(resp));
    }

    pub fn push_responses<I: IntoIterator<Item = Vec<u8>>>(&mut self, resps: I) {
        for r in resps {
            self.push_response(r);
        }
    }

    pub fn push_lost(&mut self) {
        self.responses.push(MockReply::Lost);
    }

    pub fn push_failure(&mut self, message: &str) {
        self.responses.push(MockReply::Fail(message.to_string()));
    }

    pub fn pop_sent(&mut self) -> Option<Vec<u8>> {
        self.sent.pop()
    }

    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl Connection for MockTransport {
    fn connect(&mut self) -> Result<()> {
        self.connect_calls += 1;
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn tag_id(&self) -> TagId {
        self.tag_id.clone()
    }
}

impl Transport for MockTransport {
    fn transceive(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent.push(data.to_vec());
        if self.responses.is_empty() {
            return Err(Error::Timeout);
        }
        match self.responses.remove(0) {
            MockReply::Data(d) => Ok(d),
            MockReply::Lost => {
                // A lost card stays lost
                self.responses.clear();
                self.responses.push(MockReply::Lost);
                Err(Error::TagLost)
            }
            MockReply::Fail(m) => Err(Error::Transport(m)),
        }
    }
}

/// One sector of a [`MockClassicTag`].
#[derive(Debug, Clone, Default)]
pub struct MockSector {
    pub key_a: Option<ClassicKey>,
    pub key_b: Option<ClassicKey>,
    pub blocks: Vec<Vec<u8>>,
    /// Block offsets that answer a single NAK byte unless authenticated with key B.
    pub key_b_only: Vec<usize>,
}

impl MockSector {
    pub fn new(key_a: Option<ClassicKey>, key_b: Option<ClassicKey>, blocks: Vec<Vec<u8>>) -> Self {
        Self {
            key_a,
            key_b,
            blocks,
            key_b_only: Vec::new(),
        }
    }
}

/// Mock MIFARE Classic tag. Sectors without scripted content have no keys
/// and therefore never authenticate.
#[derive(Debug, Default)]
pub struct MockClassicTag {
    pub tag_id: TagId,
    pub sectors: Vec<MockSector>,
    pub connected: bool,
    pub connect_calls: usize,
    pub close_calls: usize,
    /// Every authentication attempt: (sector, key, type)
    pub auth_log: Vec<(usize, ClassicKey, KeyType)>,
    /// Every block read attempt (absolute block index)
    pub reads: Vec<usize>,
    /// Reading this absolute block reports tag loss.
    pub lost_at_block: Option<usize>,
    /// Reading this absolute block fails with an I/O error.
    pub io_error_at_block: Option<usize>,
    /// Absolute blocks that answer a NAK byte once before reading normally.
    pub nak_once: HashSet<usize>,
    /// Number of leading authentication attempts rejected regardless of key.
    pub flaky_auth: usize,
    authenticated: Option<(usize, KeyType)>,
}

impl MockClassicTag {
    pub fn new(tag_id: &[u8], sector_count: usize) -> Self {
        Self {
            tag_id: TagId::new(tag_id),
            sectors: vec![MockSector::default(); sector_count],
            ..Default::default()
        }
    }

    pub fn set_sector(&mut self, index: usize, sector: MockSector) {
        if index < self.sectors.len() {
            self.sectors[index] = sector;
        }
    }

    fn locate(&self, block: usize) -> Option<(usize, usize)> {
        (0..self.sectors.len()).find_map(|s| {
            let first = self.sector_to_block(s);
            let count = self.block_count_in_sector(s);
            (block >= first && block < first + count).then(|| (s, block - first))
        })
    }
}

impl Connection for MockClassicTag {
    fn connect(&mut self) -> Result<()> {
        self.connect_calls += 1;
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn tag_id(&self) -> TagId {
        self.tag_id.clone()
    }
}

impl ClassicTech for MockClassicTag {
    fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    fn authenticate(
        &mut self,
        sector: usize,
        key: &ClassicKey,
        key_type: KeyType,
    ) -> Result<bool> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.auth_log.push((sector, *key, key_type));
        let s = self
            .sectors
            .get(sector)
            .ok_or_else(|| Error::Transport(format!("no sector {}", sector)))?;
        if self.flaky_auth > 0 {
            self.flaky_auth -= 1;
            self.authenticated = None;
            return Ok(false);
        }
        let expected = match key_type {
            KeyType::A => s.key_a,
            KeyType::B => s.key_b,
        };
        if expected.as_ref() == Some(key) {
            self.authenticated = Some((sector, key_type));
            Ok(true)
        } else {
            self.authenticated = None;
            Ok(false)
        }
    }

    fn read_block(&mut self, block: usize) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.reads.push(block);
        if self.lost_at_block == Some(block) {
            return Err(Error::TagLost);
        }
        if self.io_error_at_block == Some(block) {
            return Err(Error::Transport("transceive failed".into()));
        }
        let (sector, offset) = self
            .locate(block)
            .ok_or_else(|| Error::Transport(format!("no block {}", block)))?;
        let key_type = match self.authenticated {
            Some((s, t)) if s == sector => t,
            _ => return Err(Error::Transport("not authenticated".into())),
        };
        if self.nak_once.remove(&block) {
            return Ok(vec![0x04]);
        }
        let s = &self.sectors[sector];
        if key_type == KeyType::A && s.key_b_only.contains(&offset) {
            return Ok(vec![0x04]);
        }
        Ok(s.blocks.get(offset).cloned().unwrap_or_else(|| vec![0u8; 16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_transport_basic() {
        let mut m = MockTransport::connected(&[1]);
        m.push_response(vec![0x01]);
        assert_eq!(m.transceive(&[0xaa]).unwrap(), vec![0x01]);
        assert_eq!(m.sent.len(), 1);
    }

    #[test]
    fn mock_transport_multiple_responses() {
        let mut m = MockTransport::connected(&[1]);
        m.push_response(vec![0x01]);
        m.push_response(vec![0x02]);

        assert_eq!(m.transceive(&[0]).unwrap(), vec![0x01]);
        assert_eq!(m.transceive(&[0]).unwrap(), vec![0x02]);
        // No more responses -> Timeout
        assert!(matches!(m.transceive(&[0]), Err(crate::Error::Timeout)));
    }

    #[test]
    fn mock_transport_requires_connection() {
        let mut m = MockTransport::new(&[1]);
        m.push_response(vec![0x01]);
        assert!(matches!(m.transceive(&[0]), Err(crate::Error::NotConnected)));
        m.connect().unwrap();
        assert_eq!(m.transceive(&[0]).unwrap(), vec![0x01]);
    }

    #[test]
    fn lost_is_sticky() {
        let mut m = MockTransport::connected(&[1]);
        m.push_lost();
        m.push_response(vec![0x90, 0x00]);
        assert!(matches!(m.transceive(&[0]), Err(crate::Error::TagLost)));
        assert!(matches!(m.transceive(&[0]), Err(crate::Error::TagLost)));
    }

    #[test]
    fn classic_auth_and_read() {
        let key = ClassicKey::from_bytes([0xff; 6]);
        let mut tag = MockClassicTag::new(&[1, 2, 3, 4], 2);
        tag.set_sector(1, MockSector::new(Some(key), None, vec![vec![7u8; 16]; 4]));
        tag.connect().unwrap();

        assert!(!tag.authenticate(1, &key, KeyType::B).unwrap());
        assert!(tag.read_block(4).is_err());
        assert!(tag.authenticate(1, &key, KeyType::A).unwrap());
        assert_eq!(tag.read_block(4).unwrap(), vec![7u8; 16]);
        // sector 0 is not covered by the sector 1 authentication
        assert!(tag.read_block(0).is_err());
        assert_eq!(tag.auth_log.len(), 2);
    }

    #[test]
    fn classic_nak_once() {
        let key = ClassicKey::from_bytes([0xff; 6]);
        let mut tag = MockClassicTag::new(&[1], 1);
        tag.set_sector(0, MockSector::new(Some(key), None, vec![vec![1u8; 16]; 4]));
        tag.nak_once.insert(2);
        tag.connect().unwrap();
        tag.authenticate(0, &key, KeyType::A).unwrap();
        assert_eq!(tag.read_block(2).unwrap(), vec![0x04]);
        assert_eq!(tag.read_block(2).unwrap(), vec![1u8; 16]);
    }
}
