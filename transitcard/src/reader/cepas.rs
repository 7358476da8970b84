// transitcard-rs/transitcard/src/reader/cepas.rs

//! CEPAS acquisition: purses, their histories, then the files under `3F00/4000`.

use crate::card::cepas::{CepasCard, CepasHistory, CepasPurse};
use crate::card::iso7816::{Iso7816File, Selector};
use crate::card::{Card, CardData, CardIdentity};
use crate::constants::{CEPAS_MAIN_DF, CEPAS_MASTER_FILE};
use crate::progress::ProgressSink;
use crate::protocol::{CepasProtocol, Iso7816Protocol};
use crate::reader::iso7816::dump_file;
use crate::reader::ReaderConfig;
use crate::transport::{Session, Transport};
use crate::types::CardKind;
use crate::Result;
use std::collections::BTreeMap;

/// Dump a CEPAS card. `Ok(None)` if the main DF is missing or no purse answers.
pub fn read_cepas(
    transport: &mut dyn Transport,
    config: &ReaderConfig,
    progress: &mut dyn ProgressSink,
) -> Result<Option<Card>> {
    let mut session = Session::open(transport)?;
    let identity = CardIdentity::now(session.tag_id());
    let mut iso = Iso7816Protocol::new(&mut *session);

    match iso.select_by_id(CEPAS_MAIN_DF) {
        Ok(_) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            log::debug!("no CEPAS main DF: {}", e);
            return Ok(None);
        }
    }

    let mut scan = CepasScan {
        config,
        total: config.cepas_purse_count as usize * 2 + config.cepas_file_scan.len(),
        purses: BTreeMap::new(),
        histories: BTreeMap::new(),
        files: BTreeMap::new(),
    };

    let outcome = match scan.read_purses(&mut iso, progress) {
        Ok(()) if scan.purses.is_empty() => {
            log::debug!("main DF present but no purse answered");
            return Ok(None);
        }
        Ok(()) => {
            progress.announce_card_kind(CardKind::Cepas);
            scan.read_rest(&mut iso, progress)
        }
        Err(e) if e.is_tag_lost() && scan.purses.is_empty() => return Err(e),
        Err(e) => Err(e),
    };

    let partial_read = match outcome {
        Ok(()) => {
            progress.update_progress(scan.total, scan.total);
            false
        }
        Err(e) if e.is_tag_lost() => {
            log::warn!("tag lost, returning partial CEPAS read");
            true
        }
        Err(e) => return Err(e),
    };

    Ok(Some(Card::new(
        identity,
        partial_read,
        CardData::Cepas(CepasCard::new(scan.purses, scan.histories, scan.files)),
    )))
}

struct CepasScan<'c> {
    config: &'c ReaderConfig,
    total: usize,
    purses: BTreeMap<u8, CepasPurse>,
    histories: BTreeMap<u8, CepasHistory>,
    files: BTreeMap<Selector, Iso7816File>,
}

impl CepasScan<'_> {
    fn read_purses(
        &mut self,
        iso: &mut Iso7816Protocol<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        for id in 0..self.config.cepas_purse_count {
            let Some(raw) = CepasProtocol::new(iso).get_purse(id)? else {
                continue;
            };
            self.purses.insert(id, CepasPurse::from_raw(raw));
            progress.update_progress(id as usize, self.total);
        }
        Ok(())
    }

    fn read_rest(
        &mut self,
        iso: &mut Iso7816Protocol<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        let count = self.config.cepas_purse_count as usize;
        let ids: Vec<u8> = self.purses.keys().copied().collect();
        for id in ids {
            self.read_history(iso, id)?;
            progress.update_progress(id as usize + count, self.total);
        }

        progress.update_status("reading CEPAS files");
        for (i, file_id) in self.config.cepas_file_scan.clone().enumerate() {
            let selector = Selector::by_ids(&[CEPAS_MASTER_FILE, CEPAS_MAIN_DF, file_id]);
            match dump_file(iso, &selector, 0)? {
                Some(file) => {
                    self.files.insert(selector, file);
                }
                None => log::debug!("couldn't read {}", selector),
            }
            progress.update_progress(i + 2 * count, self.total);
        }
        Ok(())
    }

    /// Both history phases. A card lost during the second phase still
    /// leaves the first buffer in the scan.
    fn read_history(&mut self, iso: &mut Iso7816Protocol<'_>, id: u8) -> Result<()> {
        let mut cepas = CepasProtocol::new(iso);
        let Some(mut raw) = cepas.history_head(id)? else {
            return Ok(());
        };
        let lost = match cepas.history_tail(id, &raw) {
            Ok(rest) => {
                raw.extend_from_slice(&rest);
                None
            }
            Err(e) if e.is_fatal() => Some(e),
            Err(e) => {
                log::warn!("history {} second read failed, keeping first buffer: {}", id, e);
                None
            }
        };
        match CepasHistory::parse(&raw) {
            Ok(history) => {
                self.histories.insert(id, history);
            }
            Err(e) => log::warn!("history {} unparseable, dropped: {}", id, e),
        }
        match lost {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
