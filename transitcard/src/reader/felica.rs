// transitcard-rs/transitcard/src/reader/felica.rs

//! FeliCa acquisition: systems, then services, then blocks.

use crate::card::felica::{FelicaBlock, FelicaCard, FelicaService, FelicaSystem};
use crate::card::{Card, CardData, CardIdentity};
use crate::constants::{FELICA_LITE_BLOCK_LIMIT, SERVICE_FELICA_LITE_READONLY};
use crate::progress::ProgressSink;
use crate::protocol::felica::idm_matches;
use crate::protocol::FelicaProtocol;
use crate::reader::ReaderConfig;
use crate::transport::{Session, Transport};
use crate::types::{CardKind, Idm, ServiceCode, SystemCode};
use crate::{Error, Result};

/// How the services of a system are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discovery {
    Search,
    /// The card hides its service list; read this one service directly.
    Magic(ServiceCode),
    /// FeliCa Lite: a single read-only service with a bounded block range.
    Lite,
}

/// Dump every open service of a FeliCa card.
pub fn read_felica(
    transport: &mut dyn Transport,
    config: &ReaderConfig,
    progress: &mut dyn ProgressSink,
) -> Result<Card> {
    let mut session = Session::open(transport)?;
    let identity = CardIdentity::now(session.tag_id());
    let mut protocol = FelicaProtocol::new(&mut *session);

    let idm = protocol
        .polling(SystemCode::ANY)?
        .ok_or_else(|| Error::MalformedResponse("no IDm in polling response".into()))?;
    let pmm = protocol.pmm();
    progress.announce_card_kind(CardKind::Felica);
    log::debug!("felica card {}", idm.to_hex());

    let mut systems = Vec::new();
    let partial_read = match read_systems(&mut protocol, idm, config, progress, &mut systems) {
        Ok(()) => false,
        Err(e) if e.is_tag_lost() => {
            log::warn!("tag lost, returning partial FeliCa read");
            true
        }
        Err(e) => return Err(e),
    };

    Ok(Card::new(
        identity,
        partial_read,
        CardData::Felica(FelicaCard::new(idm, pmm, systems)),
    ))
}

/// Systems the card lists, or the magic systems it answers to.
fn discover_systems(
    protocol: &mut FelicaProtocol<'_>,
    idm: Idm,
    config: &ReaderConfig,
) -> Result<Vec<(SystemCode, Discovery)>> {
    let codes = protocol.request_system_codes(idm)?;
    if !codes.is_empty() {
        return Ok(codes.into_iter().map(|c| (c, Discovery::Search)).collect());
    }

    if answers(protocol, SystemCode::FELICA_LITE, &idm)? {
        log::debug!("FeliCa Lite detected");
        return Ok(vec![(SystemCode::FELICA_LITE, Discovery::Lite)]);
    }

    let mut found = Vec::new();
    for (system, service) in &config.felica_magic_systems {
        if answers(protocol, *system, &idm)? {
            log::debug!("magic system {} answered", system);
            found.push((*system, Discovery::Magic(*service)));
        }
    }
    Ok(found)
}

/// True if the card addressed by `idm` answers a poll for `system`.
fn answers(protocol: &mut FelicaProtocol<'_>, system: SystemCode, idm: &Idm) -> Result<bool> {
    match protocol.polling(system)? {
        Some(found) if idm_matches(idm, &found) => Ok(true),
        Some(found) => {
            log::debug!(
                "card {} answered system {} instead of {}",
                found.to_hex(),
                system,
                idm.to_hex()
            );
            Ok(false)
        }
        None => Ok(false),
    }
}

fn read_systems(
    protocol: &mut FelicaProtocol<'_>,
    idm: Idm,
    config: &ReaderConfig,
    progress: &mut dyn ProgressSink,
    systems: &mut Vec<FelicaSystem>,
) -> Result<()> {
    let discovered = discover_systems(protocol, idm, config)?;
    let total = discovered.len();

    for (done, (code, discovery)) in discovered.into_iter().enumerate() {
        progress.update_progress(done, total);
        progress.update_status(&format!("reading FeliCa system {}", code));

        let number = protocol.poll_for_system_code(code, &idm, config.felica_poll_attempts)?;
        let system_idm = idm.for_system(number);

        let service_codes = match discovery {
            Discovery::Search => discover_services(protocol, system_idm)?,
            Discovery::Magic(service) => vec![service],
            Discovery::Lite => vec![ServiceCode::new(SERVICE_FELICA_LITE_READONLY)],
        };
        let limit = match discovery {
            Discovery::Lite => FELICA_LITE_BLOCK_LIMIT,
            _ => u16::MAX,
        };

        let mut services = Vec::new();
        let mut lost = None;
        for service in service_codes {
            // Re-select the system before each service
            if let Err(e) = protocol.polling(code) {
                lost = Some(e);
                break;
            }
            let (blocks, err) = read_service(protocol, system_idm, service, limit);
            if !blocks.is_empty() {
                log::debug!("service {} had {} block(s)", service, blocks.len());
                services.push(FelicaService::new(service, blocks));
            }
            if let Some(e) = err {
                lost = Some(e);
                break;
            }
        }

        systems.push(FelicaSystem::new(code, services));
        if let Some(e) = lost {
            return Err(e);
        }
    }
    progress.update_progress(total, total);
    Ok(())
}

/// Open service codes of a system. Services needing a key are skipped.
fn discover_services(protocol: &mut FelicaProtocol<'_>, idm: Idm) -> Result<Vec<ServiceCode>> {
    let mut out = Vec::new();
    for found in protocol.service_codes(idm) {
        match found {
            Ok(code) if code.is_open() => out.push(code),
            Ok(code) => log::trace!("skipping protected service {}", code),
            Err(e) if e.is_tag_lost() => return Err(e),
            Err(e) => {
                log::debug!("service search stopped: {}", e);
                break;
            }
        }
    }
    Ok(out)
}

/// Read blocks 0, 1, ... until the card reports an error. Returns what was
/// read and the tag-loss error that cut the read short, if any.
fn read_service(
    protocol: &mut FelicaProtocol<'_>,
    idm: Idm,
    service: ServiceCode,
    limit: u16,
) -> (Vec<FelicaBlock>, Option<Error>) {
    let mut blocks = Vec::new();
    for address in 0..limit {
        match protocol.read_without_encryption(idm, service, address) {
            Ok(Some(data)) => blocks.push(FelicaBlock::new(address, data)),
            Ok(None) => break,
            Err(e) if e.is_tag_lost() => return (blocks, Some(e)),
            Err(e) => {
                log::debug!("service {} block {}: {}", service, address, e);
                break;
            }
        }
    }
    (blocks, None)
}
