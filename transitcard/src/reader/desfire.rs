// transitcard-rs/transitcard/src/reader/desfire.rs

//! MIFARE DESFire acquisition.

use crate::card::desfire::{
    DesfireApplication, DesfireAuthLog, DesfireCard, DesfireFile, DesfireFileSettings,
    DesfireFileType, DesfireManufacturingData,
};
use crate::card::{Card, CardData, CardIdentity};
use crate::progress::ProgressSink;
use crate::protocol::status::CardStatus;
use crate::protocol::DesfireProtocol;
use crate::reader::ReaderConfig;
use crate::transport::{Session, Transport};
use crate::types::{CardKind, DesfireAppId};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Card-specific unlock sequence run before each file of an application.
pub trait DesfireUnlocker {
    /// Whether this unlocker handles `app` on a card with `manufacturing` data.
    fn applies_to(&self, app: DesfireAppId, manufacturing: &DesfireManufacturingData) -> bool;

    /// Order in which the files of an application are read.
    fn file_order(&mut self, files: Vec<u8>) -> Vec<u8> {
        files
    }

    /// Run before `file_no` is read. Exchanges are appended to `auth_log`.
    fn unlock(
        &mut self,
        protocol: &mut DesfireProtocol<'_>,
        files: &BTreeMap<u8, DesfireFile>,
        file_no: u8,
        auth_log: &mut Vec<DesfireAuthLog>,
    ) -> Result<()>;
}

/// Dump a DESFire card. `Ok(None)` if the card does not answer like one.
pub fn read_desfire(
    transport: &mut dyn Transport,
    unlocker: Option<&mut dyn DesfireUnlocker>,
    config: &ReaderConfig,
    progress: &mut dyn ProgressSink,
) -> Result<Option<Card>> {
    let mut session = Session::open(transport)?;
    let identity = CardIdentity::now(session.tag_id());
    let mut protocol = DesfireProtocol::new(&mut *session);

    let manufacturing = match protocol.manufacturing_data() {
        Ok(m) => m,
        Err(
            e @ (Error::MalformedResponse(_)
            | Error::UnexpectedResponse { .. }
            | Error::InvalidLength { .. }),
        ) => {
            log::warn!("invalid answer to GetManufacturingData, not a DESFire card? {}", e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    progress.announce_card_kind(CardKind::MifareDesfire);
    progress.update_status("reading DESFire card");
    progress.update_progress(0, 1);

    let mut scan = DesfireScan {
        protocol,
        unlocker,
        config,
        progress,
        manufacturing: &manufacturing,
        done: 0,
        total: 0,
        applications: Vec::new(),
        app_list_locked: false,
    };
    let partial_read = match scan.run() {
        Ok(()) => false,
        Err(e) if e.is_tag_lost() => {
            log::warn!("tag lost, returning partial DESFire read");
            true
        }
        Err(e) => return Err(e),
    };

    let DesfireScan {
        applications,
        app_list_locked,
        ..
    } = scan;
    let card = DesfireCard::new(manufacturing.clone(), applications, app_list_locked);
    Ok(Some(Card::new(
        identity,
        partial_read,
        CardData::Desfire(card),
    )))
}

struct DesfireScan<'s, 'u, 'a> {
    protocol: DesfireProtocol<'a>,
    unlocker: Option<&'s mut (dyn DesfireUnlocker + 'u)>,
    config: &'s ReaderConfig,
    progress: &'s mut dyn ProgressSink,
    manufacturing: &'s DesfireManufacturingData,
    done: usize,
    total: usize,
    applications: Vec<DesfireApplication>,
    app_list_locked: bool,
}

impl DesfireScan<'_, '_, '_> {
    fn run(&mut self) -> Result<()> {
        let app_ids = match self.protocol.app_list() {
            Ok(ids) => ids,
            Err(e) if e.is_access_denied() => {
                log::debug!("application list locked, probing known ids");
                self.app_list_locked = true;
                self.config.desfire_hidden_app_ids.clone()
            }
            Err(e) => return Err(e),
        };
        self.total = app_ids.len();

        for app_id in app_ids {
            self.progress.update_progress(self.done, self.total);
            match self.protocol.select_app(app_id) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    log::debug!("application {} not present", app_id);
                    continue;
                }
                Err(e) => return Err(e),
            }
            self.done += 1;
            self.read_application(app_id)?;
        }
        Ok(())
    }

    fn read_application(&mut self, app_id: DesfireAppId) -> Result<()> {
        let mut dir_list_locked = false;
        let mut file_ids = match self.protocol.file_list() {
            Ok(ids) => ids,
            Err(e) if e.is_access_denied() => {
                log::debug!("file list of {} locked, scanning", app_id);
                dir_list_locked = true;
                self.config.desfire_file_scan_range.clone().collect()
            }
            Err(e) => return Err(e),
        };

        let manufacturing = self.manufacturing;
        let mut unlocker = self
            .unlocker
            .as_deref_mut()
            .filter(|u| u.applies_to(app_id, manufacturing));
        if let Some(u) = unlocker.as_deref_mut() {
            file_ids = u.file_order(file_ids);
        }
        let steps_per_file = if unlocker.is_some() { 2 } else { 1 };
        self.total += file_ids.len() * steps_per_file;

        let mut files = BTreeMap::new();
        let mut auth_log = Vec::new();
        // Keep what was read so far if the card leaves mid-application
        let mut outcome = Ok(());
        for file_no in file_ids {
            self.progress.update_progress(self.done, self.total);
            if let Some(u) = unlocker.as_deref_mut() {
                self.progress.update_status("unlocking DESFire application");
                if let Err(e) = u.unlock(&mut self.protocol, &files, file_no, &mut auth_log) {
                    if e.is_fatal() {
                        outcome = Err(e);
                        break;
                    }
                    log::debug!("unlock before file {} failed: {}", file_no, e);
                }
                self.done += 1;
                self.progress.update_progress(self.done, self.total);
            }

            match read_file(&mut self.protocol, file_no) {
                Ok(Some(file)) => {
                    files.insert(file_no, file);
                }
                Ok(None) => continue,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
            self.done += 1;
        }

        self.applications.push(DesfireApplication::new(
            app_id,
            files,
            auth_log,
            dir_list_locked,
        ));
        outcome
    }
}

/// Read one file. `Ok(None)` if the file does not exist.
fn read_file(protocol: &mut DesfireProtocol<'_>, file_no: u8) -> Result<Option<DesfireFile>> {
    let raw = match protocol.file_settings(file_no) {
        Ok(raw) => raw,
        Err(e) if e.is_access_denied() => {
            return match try_all_commands(protocol, file_no) {
                Ok(file) => Ok(Some(file)),
                Err(e) => placeholder(e, None),
            };
        }
        Err(e) => return placeholder(e, None),
    };
    let settings = match DesfireFileSettings::parse(&raw) {
        Ok(s) => s,
        Err(e) => return placeholder(e, None),
    };

    let data = match settings.file_type {
        DesfireFileType::Standard | DesfireFileType::Backup => protocol.read_file(file_no),
        DesfireFileType::Value => protocol.get_value(file_no),
        DesfireFileType::LinearRecord | DesfireFileType::CyclicRecord => {
            protocol.read_record(file_no)
        }
    };
    match data {
        Ok(data) => {
            let file_type = settings.file_type;
            let settings = Some(settings);
            Ok(Some(match file_type {
                DesfireFileType::Standard | DesfireFileType::Backup => {
                    DesfireFile::Standard { settings, data }
                }
                DesfireFileType::Value => DesfireFile::Value { settings, data },
                DesfireFileType::LinearRecord | DesfireFileType::CyclicRecord => {
                    DesfireFile::Record { settings, data }
                }
            }))
        }
        Err(e) => placeholder(e, Some(settings)),
    }
}

/// Map a failed read onto a placeholder. Missing files are skipped and
/// transport failures propagate.
fn placeholder(e: Error, settings: Option<DesfireFileSettings>) -> Result<Option<DesfireFile>> {
    if e.is_not_found() {
        Ok(None)
    } else if e.is_fatal() {
        Err(e)
    } else if e.is_access_denied() {
        Ok(Some(DesfireFile::Unauthorized {
            settings,
            message: e.to_string(),
        }))
    } else {
        Ok(Some(DesfireFile::Invalid {
            settings,
            message: e.to_string(),
        }))
    }
}

/// Without settings the file type is unknown: try READ_DATA, GET_VALUE and
/// READ_RECORD in turn. Permission denied moves on to the next command.
fn try_all_commands(protocol: &mut DesfireProtocol<'_>, file_no: u8) -> Result<DesfireFile> {
    for attempt in 0..3 {
        let result = match attempt {
            0 => protocol.read_file(file_no),
            1 => protocol.get_value(file_no),
            _ => protocol.read_record(file_no),
        };
        match result {
            Ok(data) => {
                return Ok(match attempt {
                    0 => DesfireFile::Standard {
                        settings: None,
                        data,
                    },
                    1 => DesfireFile::Value {
                        settings: None,
                        data,
                    },
                    _ => DesfireFile::Record {
                        settings: None,
                        data,
                    },
                });
            }
            Err(Error::DesfireStatus {
                status: CardStatus::PermissionDenied,
                ..
            }) => continue,
            Err(e) if e.is_access_denied() => {
                return Ok(DesfireFile::Unauthorized {
                    settings: None,
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(DesfireFile::Invalid {
        settings: None,
        message: "No command worked".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoopProgress, RecordingProgress};
    use crate::transport::mock::MockTransport;

    const MANUF: &str = "04010100021a0504010100061a05048e1d52a22c80ba54b5d0703413";

    fn frame(payload: &[u8], status: u8) -> Vec<u8> {
        let mut v = payload.to_vec();
        v.extend_from_slice(&[0x91, status]);
        v
    }

    fn ok(payload: &[u8]) -> Vec<u8> {
        frame(payload, 0x00)
    }

    fn with_manufacturing(m: &mut MockTransport) {
        let raw = hex::decode(MANUF).unwrap();
        m.push_response(frame(&raw[..7], 0xaf));
        m.push_response(frame(&raw[7..14], 0xaf));
        m.push_response(ok(&raw[14..]));
    }

    fn standard_settings(size: u8) -> Vec<u8> {
        vec![0x00, 0x00, 0xe0, 0xee, size, 0x00, 0x00]
    }

    #[test]
    fn not_desfire_returns_none() {
        let mut m = MockTransport::new(&[1]);
        m.push_response(vec![0x6e, 0x00]);
        let card = read_desfire(&mut m, None, &ReaderConfig::default(), &mut NoopProgress).unwrap();
        assert!(card.is_none());
        assert_eq!(m.close_calls, 1);
    }

    #[test]
    fn desfire_status_on_manufacturing_data_is_an_error() {
        let mut m = MockTransport::new(&[1]);
        m.push_response(frame(&[], 0x9d));
        match read_desfire(&mut m, None, &ReaderConfig::default(), &mut NoopProgress) {
            Err(Error::DesfireStatus { code: 0x9d, .. }) => {}
            other => panic!("expected DesfireStatus, got {:?}", other),
        }
        assert_eq!(m.close_calls, 1);
    }

    #[test]
    fn one_app_one_file() {
        let mut m = MockTransport::new(&[4, 1, 2]);
        with_manufacturing(&mut m);
        m.push_response(ok(&[0x01, 0x20, 0xf2]));
        m.push_response(ok(&[])); // select
        m.push_response(ok(&[0x01]));
        m.push_response(ok(&standard_settings(4)));
        m.push_response(ok(&[0xde, 0xad, 0xbe, 0xef]));

        let mut progress = RecordingProgress::new();
        let card = read_desfire(&mut m, None, &ReaderConfig::default(), &mut progress)
            .unwrap()
            .unwrap();
        assert!(!card.is_partial_read());
        let desfire = card.as_desfire().unwrap();
        let app = DesfireAppId::from_bytes([0x01, 0x20, 0xf2]);
        let file = desfire.file(app, 1).unwrap();
        assert_eq!(file.data(), Some(&[0xde, 0xad, 0xbe, 0xef][..]));
        assert!(file.settings().is_some());
        assert!(!desfire.app_list_locked());
        assert_eq!(progress.kinds, vec![CardKind::MifareDesfire]);
        // select carries the id in card order
        assert_eq!(m.sent[4], vec![0x90, 0x5a, 0, 0, 3, 0x01, 0x20, 0xf2, 0]);
    }

    #[test]
    fn locked_app_list_uses_hidden_ids() {
        let mut m = MockTransport::new(&[1]);
        with_manufacturing(&mut m);
        m.push_response(frame(&[], 0xae));
        m.push_response(frame(&[], 0xa0)); // first hidden id missing
        m.push_response(ok(&[])); // second selected
        m.push_response(ok(&[]));
        let config = ReaderConfig::builder()
            .desfire_hidden_app(DesfireAppId::new(0x111111))
            .desfire_hidden_app(DesfireAppId::new(0x222222))
            .build()
            .unwrap();
        let card = read_desfire(&mut m, None, &config, &mut NoopProgress)
            .unwrap()
            .unwrap();
        let desfire = card.as_desfire().unwrap();
        assert!(desfire.app_list_locked());
        assert_eq!(desfire.applications().len(), 1);
        assert_eq!(desfire.applications()[0].id(), DesfireAppId::new(0x222222));
    }

    #[test]
    fn locked_file_list_scans_range_and_tries_commands() {
        let mut m = MockTransport::new(&[1]);
        with_manufacturing(&mut m);
        m.push_response(ok(&[0x01, 0x00, 0x00]));
        m.push_response(ok(&[]));
        m.push_response(frame(&[], 0x9d)); // file list
        // file 0: settings denied, READ_DATA denied, GET_VALUE works
        m.push_response(frame(&[], 0x9d));
        m.push_response(frame(&[], 0x9d));
        m.push_response(ok(&[0x10, 0x00, 0x00, 0x00]));
        // file 1: settings denied, READ_DATA authentication error
        m.push_response(frame(&[], 0x9d));
        m.push_response(frame(&[], 0xae));
        // file 2: missing
        m.push_response(frame(&[], 0xf0));
        // file 3: every command denied
        m.push_responses((0..4).map(|_| frame(&[], 0x9d)));

        let config = ReaderConfig::builder()
            .desfire_file_scan_range(0..4)
            .build()
            .unwrap();
        let card = read_desfire(&mut m, None, &config, &mut NoopProgress)
            .unwrap()
            .unwrap();
        let app = &card.as_desfire().unwrap().applications()[0];
        assert!(app.dir_list_locked());
        match app.file(0) {
            Some(DesfireFile::Value { settings: None, data }) => assert_eq!(data[0], 0x10),
            other => panic!("expected Value, got {:?}", other),
        }
        assert!(app.file(1).unwrap().is_unauthorized());
        assert!(app.file(2).is_none());
        let f3 = app.file(3).unwrap();
        assert!(f3.is_invalid());
        assert_eq!(f3.message(), Some("No command worked"));
        assert_eq!(m.remaining(), 0);
    }

    #[test]
    fn read_denied_after_settings_keeps_settings() {
        let mut m = MockTransport::new(&[1]);
        with_manufacturing(&mut m);
        m.push_response(ok(&[0x01, 0x00, 0x00]));
        m.push_response(ok(&[]));
        m.push_response(ok(&[0x05]));
        m.push_response(ok(&standard_settings(16)));
        m.push_response(frame(&[], 0x9d));
        let card = read_desfire(&mut m, None, &ReaderConfig::default(), &mut NoopProgress)
            .unwrap()
            .unwrap();
        let file = card.as_desfire().unwrap().applications()[0].file(5).unwrap();
        assert!(file.is_unauthorized());
        assert!(file.settings().is_some());
    }

    #[test]
    fn tag_lost_mid_application_is_partial() {
        let mut m = MockTransport::new(&[1]);
        with_manufacturing(&mut m);
        m.push_response(ok(&[0x01, 0x00, 0x00]));
        m.push_response(ok(&[]));
        m.push_response(ok(&[0x01, 0x02]));
        m.push_response(ok(&standard_settings(1)));
        m.push_response(ok(&[0x42]));
        m.push_lost();
        let card = read_desfire(&mut m, None, &ReaderConfig::default(), &mut NoopProgress)
            .unwrap()
            .unwrap();
        assert!(card.is_partial_read());
        let app = &card.as_desfire().unwrap().applications()[0];
        assert_eq!(app.file(1).unwrap().data(), Some(&[0x42][..]));
        assert!(app.file(2).is_none());
        assert_eq!(m.close_calls, 1);
    }

    struct RecordingUnlocker {
        calls: Vec<u8>,
    }

    impl DesfireUnlocker for RecordingUnlocker {
        fn applies_to(&self, app: DesfireAppId, _m: &DesfireManufacturingData) -> bool {
            app == DesfireAppId::from_bytes([0x01, 0x00, 0x00])
        }

        fn file_order(&mut self, mut files: Vec<u8>) -> Vec<u8> {
            files.reverse();
            files
        }

        fn unlock(
            &mut self,
            protocol: &mut DesfireProtocol<'_>,
            _files: &BTreeMap<u8, DesfireFile>,
            file_no: u8,
            auth_log: &mut Vec<DesfireAuthLog>,
        ) -> Result<()> {
            self.calls.push(file_no);
            let challenge = protocol.send_unlock(file_no)?;
            auth_log.push(DesfireAuthLog {
                key_id: file_no,
                challenge,
                response: Vec::new(),
                confirm: Vec::new(),
            });
            Ok(())
        }
    }

    #[test]
    fn unlocker_runs_before_each_file() {
        let mut m = MockTransport::new(&[1]);
        with_manufacturing(&mut m);
        m.push_response(ok(&[0x01, 0x00, 0x00]));
        m.push_response(ok(&[]));
        m.push_response(ok(&[0x01, 0x02]));
        // file 2 first
        m.push_response(frame(&[0xaa; 8], 0xaf));
        m.push_response(ok(&standard_settings(1)));
        m.push_response(ok(&[0x02]));
        m.push_response(frame(&[0xbb; 8], 0xaf));
        m.push_response(ok(&standard_settings(1)));
        m.push_response(ok(&[0x01]));

        let mut unlocker = RecordingUnlocker { calls: Vec::new() };
        let mut progress = RecordingProgress::new();
        let card = read_desfire(&mut m, Some(&mut unlocker), &ReaderConfig::default(), &mut progress)
            .unwrap()
            .unwrap();
        assert_eq!(unlocker.calls, vec![2, 1]);
        let app = &card.as_desfire().unwrap().applications()[0];
        assert_eq!(app.auth_log().len(), 2);
        assert_eq!(app.auth_log()[0].challenge, vec![0xaa; 8]);
        assert_eq!(app.file(1).unwrap().data(), Some(&[0x01][..]));
        // one app plus two steps for each of two files
        assert_eq!(progress.last().map(|p| p.1), Some(5));
    }
}
