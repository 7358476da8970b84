// transitcard-rs/transitcard/src/reader/classic.rs

//! MIFARE Classic acquisition: tiered per-sector authentication and block dump.

use crate::card::classic::{ClassicBlock, ClassicCard, ClassicSector};
use crate::card::{Card, CardData, CardIdentity};
use crate::constants::{CLASSIC_BLOCK_LEN, CLASSIC_PROGRESS_PER_SECTOR};
use crate::keys::KeyRetriever;
use crate::progress::ProgressSink;
use crate::reader::ReaderConfig;
use crate::transport::{ClassicTech, Session};
use crate::types::{CardKind, ClassicKey, ClassicSectorKey, KeyType};
use crate::{Error, Result};

/// Read every sector of a MIFARE Classic card.
///
/// The connection is opened and closed here. Tag loss ends the scan with a
/// partial card; the sector being read when it happened is `Invalid`.
pub fn read_classic(
    tech: &mut dyn ClassicTech,
    keys: &dyn KeyRetriever,
    config: &ReaderConfig,
    progress: &mut dyn ProgressSink,
) -> Result<Card> {
    let mut session = Session::open(tech)?;
    let identity = CardIdentity::now(session.tag_id());
    progress.announce_card_kind(CardKind::MifareClassic);

    let sector_count = session.sector_count();
    let mut acq = ClassicAcquisition {
        tech: &mut *session,
        keys,
        config,
        progress,
        total: sector_count * CLASSIC_PROGRESS_PER_SECTOR,
    };

    let mut sectors = Vec::with_capacity(sector_count);
    let mut partial_read = false;
    for index in 0..sector_count {
        match acq.read_sector(index) {
            Ok(sector) => sectors.push(sector),
            Err(e) if e.is_tag_lost() => {
                log::warn!("tag lost at sector {}, returning partial read", index);
                sectors.push(ClassicSector::Invalid {
                    index,
                    error: e.to_string(),
                });
                partial_read = true;
                break;
            }
            Err(e) => {
                log::debug!("sector {} invalid: {}", index, e);
                sectors.push(ClassicSector::Invalid {
                    index,
                    error: e.to_string(),
                });
            }
        }
    }
    if !partial_read {
        acq.progress.update_progress(acq.total, acq.total);
    }

    Ok(Card::new(
        identity,
        partial_read,
        CardData::Classic(ClassicCard::new(sectors)),
    ))
}

/// Per-scan state shared by every sector.
struct ClassicAcquisition<'t, 'k> {
    tech: &'t mut dyn ClassicTech,
    keys: &'k dyn KeyRetriever,
    config: &'k ReaderConfig,
    progress: &'t mut dyn ProgressSink,
    total: usize,
}

impl ClassicAcquisition<'_, '_> {
    fn report(&mut self, sector: usize, step: usize) {
        self.progress
            .update_progress(sector * CLASSIC_PROGRESS_PER_SECTOR + step, self.total);
    }

    fn read_sector(&mut self, index: usize) -> Result<ClassicSector> {
        let Some(key) = self.authenticate(index, None)? else {
            self.report(index, 3);
            log::debug!("sector {}: no key worked", index);
            return Ok(ClassicSector::Unauthorized { index });
        };
        self.report(index, 3);
        self.progress
            .update_status(&format!("reading blocks of sector {}", index));

        let mut key = key;
        let mut blocks = self.read_blocks(index, &key)?;

        // Key A may not grant read access to every block; key B may grant none.
        let retry_with = match key.key_type {
            KeyType::A if blocks.iter().any(ClassicBlock::is_unauthorized) => Some(KeyType::B),
            KeyType::B if blocks.iter().all(ClassicBlock::is_unauthorized) => Some(KeyType::A),
            _ => None,
        };
        if let Some(key_type) = retry_with {
            log::debug!("sector {}: unreadable blocks, looking for a key {}", index, key_type);
            if let Some(other) = self.authenticate(index, Some(key_type))? {
                blocks = self.read_blocks(index, &other)?;
                key = other;
            }
        }

        self.report(index, 4);
        Ok(ClassicSector::Authenticated { index, blocks, key })
    }

    /// Find a working key for `sector`. With `only` set, every candidate is
    /// tried as that type alone.
    fn authenticate(
        &mut self,
        sector: usize,
        only: Option<KeyType>,
    ) -> Result<Option<ClassicSectorKey>> {
        self.report(sector, 0);

        if let Some(declared) = self.keys.key_for_sector(sector) {
            self.progress
                .update_status(&format!("authenticating sector {} with its key", sector));
            for attempt in 0..self.config.classic_retry_limit {
                log::trace!("sector {}: declared key, try {}", sector, attempt);
                if let Some(k) = self.try_types(sector, declared, only)? {
                    return Ok(Some(k));
                }
            }
        }

        self.report(sector, 2);
        self.progress
            .update_status(&format!("authenticating sector {} with other keys", sector));
        for (other, candidate) in self.keys.all_keys() {
            if other == sector {
                continue;
            }
            if let Some(k) = self.try_types(sector, candidate, only)? {
                log::debug!(
                    "sector {}: key of sector {} works, fix the key file to speed this up",
                    sector,
                    other
                );
                return Ok(Some(k));
            }
        }

        let well_known = self.config.well_known_keys.clone();
        for key in well_known {
            if let Some(k) = self.try_types(sector, ClassicSectorKey::key_a(key), only)? {
                return Ok(Some(k));
            }
        }
        Ok(None)
    }

    /// Declared type then the other one, or just `only`.
    fn try_types(
        &mut self,
        sector: usize,
        candidate: ClassicSectorKey,
        only: Option<KeyType>,
    ) -> Result<Option<ClassicSectorKey>> {
        let order = match only {
            Some(t) => [Some(t), None],
            None => [Some(candidate.key_type), Some(candidate.key_type.inverse())],
        };
        for key_type in order.into_iter().flatten() {
            if self.try_key(sector, &candidate.key, key_type)? {
                return Ok(Some(ClassicSectorKey::new(candidate.key, key_type)));
            }
        }
        Ok(None)
    }

    fn try_key(&mut self, sector: usize, key: &ClassicKey, key_type: KeyType) -> Result<bool> {
        let ok = self.tech.authenticate(sector, key, key_type)?;
        if ok {
            log::debug!("sector {}: authenticated with key {} {}", sector, key_type, key.to_hex());
        }
        Ok(ok)
    }

    fn read_blocks(&mut self, sector: usize, key: &ClassicSectorKey) -> Result<Vec<ClassicBlock>> {
        let first = self.tech.sector_to_block(sector);
        let count = self.tech.block_count_in_sector(sector);
        let mut blocks = Vec::with_capacity(count);
        for offset in 0..count {
            let mut data = self.tech.read_block(first + offset)?;
            // Some readers answer a lone NAK byte until re-authenticated
            for _ in 0..self.config.classic_reauth_attempts {
                if data.len() >= CLASSIC_BLOCK_LEN {
                    break;
                }
                log::trace!("block {}: short read {:02x?}, re-authenticating", first + offset, data);
                if !self.tech.authenticate(sector, &key.key, key.key_type)? {
                    return Err(Error::Transport(format!(
                        "re-authentication of sector {} failed",
                        sector
                    )));
                }
                data = self.tech.read_block(first + offset)?;
            }
            blocks.push(ClassicBlock::new(sector, offset, count, data));
        }
        Ok(blocks)
    }
}
