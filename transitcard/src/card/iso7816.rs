// transitcard-rs/transitcard/src/card/iso7816.rs

//! Generic ISO7816 applications, files and selectors.

use crate::utils::{bytes_to_hex, parse_hex};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One step of a selector path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectorElement {
    ById(u16),
    ByName(Vec<u8>),
}

impl fmt::Display for SelectorElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorElement::ById(id) => write!(f, ":{:04x}", id),
            SelectorElement::ByName(name) => write!(f, "#{}", bytes_to_hex(name)),
        }
    }
}

/// Ordered path of select steps identifying a file.
///
/// Text form concatenates the steps: `#a0000000031010:3f00:0002`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selector {
    path: Vec<SelectorElement>,
}

impl Selector {
    pub fn new(path: Vec<SelectorElement>) -> Self {
        Self { path }
    }

    /// Path of file identifiers.
    pub fn by_ids(ids: &[u16]) -> Self {
        Self::new(ids.iter().map(|id| SelectorElement::ById(*id)).collect())
    }

    pub fn by_name(name: &[u8]) -> Self {
        Self::new(vec![SelectorElement::ByName(name.to_vec())])
    }

    /// A named DF followed by one file identifier.
    pub fn by_name_and_id(name: &[u8], id: u16) -> Self {
        Self::new(vec![
            SelectorElement::ByName(name.to_vec()),
            SelectorElement::ById(id),
        ])
    }

    pub fn path(&self) -> &[SelectorElement] {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// True if `other` is a prefix of (or equal to) this path.
    pub fn starts_with(&self, other: &Selector) -> bool {
        self.path.starts_with(&other.path)
    }

    /// Parent path, `None` at or one step below the root.
    pub fn parent(&self) -> Option<Selector> {
        if self.path.len() <= 1 {
            return None;
        }
        Some(Self::new(self.path[..self.path.len() - 1].to_vec()))
    }

    pub fn append_path(&self, ids: &[u16]) -> Selector {
        let mut path = self.path.clone();
        path.extend(ids.iter().map(|id| SelectorElement::ById(*id)));
        Self::new(path)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.path {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let bad = || Error::UnsupportedOperation(format!("bad selector path {:?}", input));
        let mut path = Vec::new();
        let mut rest = input;
        while let Some(marker) = rest.chars().next() {
            let body = &rest[marker.len_utf8()..];
            let end = body
                .find(|c: char| !c.is_ascii_hexdigit())
                .unwrap_or(body.len());
            let digits = &body[..end];
            match marker {
                ':' => {
                    let id = u16::from_str_radix(digits, 16).map_err(|_| bad())?;
                    path.push(SelectorElement::ById(id));
                }
                '#' => {
                    let name = parse_hex(digits).map_err(|_| bad())?;
                    path.push(SelectorElement::ByName(name));
                }
                _ => return Err(bad()),
            }
            rest = &body[end..];
        }
        Ok(Self::new(path))
    }
}

/// Contents of one elementary file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iso7816File {
    binary_data: Option<Vec<u8>>,
    records: BTreeMap<u8, Vec<u8>>,
    fci: Option<Vec<u8>>,
}

impl Iso7816File {
    pub fn new(
        binary_data: Option<Vec<u8>>,
        records: BTreeMap<u8, Vec<u8>>,
        fci: Option<Vec<u8>>,
    ) -> Self {
        Self {
            binary_data,
            records,
            fci,
        }
    }

    pub fn binary_data(&self) -> Option<&[u8]> {
        self.binary_data.as_deref()
    }

    pub fn fci(&self) -> Option<&[u8]> {
        self.fci.as_deref()
    }

    pub fn records(&self) -> &BTreeMap<u8, Vec<u8>> {
        &self.records
    }

    /// Records are numbered from 1.
    pub fn record(&self, number: u8) -> Option<&[u8]> {
        self.records.get(&number).map(Vec::as_slice)
    }
}

/// One selected application with the files dumped under it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iso7816Application {
    name: Option<Vec<u8>>,
    fci: Option<Vec<u8>>,
    files: BTreeMap<Selector, Iso7816File>,
    sfi_files: BTreeMap<u8, Iso7816File>,
}

impl Iso7816Application {
    pub fn new(
        name: Option<Vec<u8>>,
        fci: Option<Vec<u8>>,
        files: BTreeMap<Selector, Iso7816File>,
        sfi_files: BTreeMap<u8, Iso7816File>,
    ) -> Self {
        Self {
            name,
            fci,
            files,
            sfi_files,
        }
    }

    pub fn name(&self) -> Option<&[u8]> {
        self.name.as_deref()
    }

    pub fn fci(&self) -> Option<&[u8]> {
        self.fci.as_deref()
    }

    pub fn files(&self) -> &BTreeMap<Selector, Iso7816File> {
        &self.files
    }

    pub fn sfi_files(&self) -> &BTreeMap<u8, Iso7816File> {
        &self.sfi_files
    }

    pub fn file(&self, selector: &Selector) -> Option<&Iso7816File> {
        self.files.get(selector)
    }

    pub fn sfi_file(&self, sfi: u8) -> Option<&Iso7816File> {
        self.sfi_files.get(&sfi)
    }

    /// True if any dumped file lives at or below `selector`.
    pub fn path_exists(&self, selector: &Selector) -> bool {
        self.files.keys().any(|s| s.starts_with(selector))
    }
}

/// Generic ISO7816 card: the applications that answered a probe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iso7816Card {
    applications: Vec<Iso7816Application>,
}

impl Iso7816Card {
    pub fn new(applications: Vec<Iso7816Application>) -> Self {
        Self { applications }
    }

    pub fn applications(&self) -> &[Iso7816Application] {
        &self.applications
    }

    pub fn application(&self, name: &[u8]) -> Option<&Iso7816Application> {
        self.applications.iter().find(|a| a.name() == Some(name))
    }

    /// First file at `selector` across applications, in probe order.
    pub fn file(&self, selector: &Selector) -> Option<&Iso7816File> {
        self.applications.iter().find_map(|a| a.file(selector))
    }

    /// Record 1 of the first application holding a file at `selector`.
    pub fn first_applicable_record_for(&self, selector: &Selector) -> Option<&[u8]> {
        self.applications
            .iter()
            .filter_map(|a| a.file(selector))
            .find_map(|f| f.record(1))
    }
}
