// transitcard-rs/transitcard/src/reader/iso7816.rs

//! Generic ISO7816 acquisition driven by [`Iso7816AppProbe`] lists.

use crate::card::iso7816::{Iso7816Application, Iso7816Card, Iso7816File, Selector};
use crate::card::{Card, CardData, CardIdentity};
use crate::constants::MAX_SFI;
use crate::progress::ProgressSink;
use crate::protocol::Iso7816Protocol;
use crate::reader::{Iso7816AppProbe, ReaderConfig};
use crate::transport::{Session, Transport};
use crate::types::CardKind;
use crate::utils::hex_dump;
use crate::Result;
use std::collections::BTreeMap;

/// Dump the configured applications. `Ok(None)` if none of them answers.
pub fn read_iso7816(
    transport: &mut dyn Transport,
    config: &ReaderConfig,
    progress: &mut dyn ProgressSink,
) -> Result<Option<Card>> {
    let mut session = Session::open(transport)?;
    let identity = CardIdentity::now(session.tag_id());
    let mut iso = Iso7816Protocol::new(&mut *session);

    let total: usize = config.iso7816_applications.iter().map(probe_steps).sum();
    let mut done = 0;
    let mut applications = Vec::new();
    let mut partial_read = false;

    for probe in &config.iso7816_applications {
        let fci = match iso.select_by_name_or_none(&probe.name) {
            Ok(Some(fci)) => fci,
            Ok(None) => {
                done += probe_steps(probe);
                continue;
            }
            Err(e) if e.is_tag_lost() && !applications.is_empty() => {
                log::warn!("tag lost while selecting an application, partial read");
                partial_read = true;
                break;
            }
            Err(e) => return Err(e),
        };
        if applications.is_empty() {
            progress.announce_card_kind(CardKind::Iso7816);
        }
        progress.update_status(&format!("reading application {}", Selector::by_name(&probe.name)));

        let mut dump = AppDump::default();
        let outcome = dump.run(&mut iso, probe, progress, &mut done, total);
        applications.push(Iso7816Application::new(
            Some(probe.name.clone()),
            Some(fci),
            dump.files,
            dump.sfi_files,
        ));
        match outcome {
            Ok(()) => {}
            Err(e) if e.is_tag_lost() => {
                log::warn!("tag lost, returning partial ISO7816 read");
                partial_read = true;
                break;
            }
            Err(e) => return Err(e),
        }
    }

    if applications.is_empty() {
        log::debug!("no configured ISO7816 application answered");
        return Ok(None);
    }
    if !partial_read {
        progress.update_progress(total, total);
    }
    Ok(Some(Card::new(
        identity,
        partial_read,
        CardData::Iso7816(Iso7816Card::new(applications)),
    )))
}

fn probe_steps(probe: &Iso7816AppProbe) -> usize {
    probe.files.len() + if probe.scan_sfi { MAX_SFI as usize } else { 0 }
}

/// Files collected for one application. Survives a tag loss half way.
#[derive(Default)]
struct AppDump {
    files: BTreeMap<Selector, Iso7816File>,
    sfi_files: BTreeMap<u8, Iso7816File>,
}

impl AppDump {
    fn run(
        &mut self,
        iso: &mut Iso7816Protocol<'_>,
        probe: &Iso7816AppProbe,
        progress: &mut dyn ProgressSink,
        done: &mut usize,
        total: usize,
    ) -> Result<()> {
        for selector in &probe.files {
            progress.update_progress(*done, total);
            *done += 1;
            if let Some(file) = dump_file(iso, selector, probe.record_length)? {
                self.files.insert(selector.clone(), file);
            }
        }
        if probe.scan_sfi {
            for sfi in 1..=MAX_SFI {
                progress.update_progress(*done, total);
                *done += 1;
                if let Some(file) = dump_sfi(iso, sfi, probe.record_length)? {
                    self.sfi_files.insert(sfi, file);
                }
            }
        }
        Ok(())
    }
}

/// Select `selector` from the MF and read its binary data and records.
/// `Ok(None)` if the path cannot be selected; only tag loss and transport
/// failures are errors.
pub(crate) fn dump_file(
    iso: &mut Iso7816Protocol<'_>,
    selector: &Selector,
    record_length: u8,
) -> Result<Option<Iso7816File>> {
    iso.unselect_file();

    let fci = match iso.select_path(selector) {
        Ok(fci) => fci,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            log::debug!("select {} failed: {}", selector, e);
            return Ok(None);
        }
    };

    let binary = match iso.read_binary(None) {
        Ok(data) => {
            log::trace!("{} binary data:\n{}", selector, hex_dump(&data));
            Some(data)
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            log::trace!("{} has no binary data: {}", selector, e);
            None
        }
    };
    let run = iso.read_all_records(None, record_length)?;
    Ok(Some(Iso7816File::new(binary, run.records, fci)))
}

/// Read a file through its short file identifier. A missing or locked file
/// is `None`, as is one that yielded nothing at all.
pub(crate) fn dump_sfi(
    iso: &mut Iso7816Protocol<'_>,
    sfi: u8,
    record_length: u8,
) -> Result<Option<Iso7816File>> {
    let binary = match iso.read_binary(Some(sfi)) {
        Ok(data) => Some(data),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) if e.is_not_found() || e.is_access_denied() => return Ok(None),
        Err(e) => {
            log::trace!("sfi {} binary: {}", sfi, e);
            None
        }
    };
    let run = iso.read_all_records(Some(sfi), record_length)?;
    if binary.is_none() && run.records.is_empty() && !run.reached_eof {
        return Ok(None);
    }
    Ok(Some(Iso7816File::new(binary, run.records, None)))
}
