//! Guide files: the `<comic>.gui` sidecar holding every page's panel rects.
//!
//! One line per page that has panels:
//!
//! ```text
//! page3: 10_20;110_220;120_20;300_220
//! ```
//!
//! Each panel contributes two `;`-separated tokens, its top-left and
//! bottom-right corners as `x_y`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, warn};
use thiserror::Error;

use crate::geometry::PanelRect;

pub type PageKey = usize;

const GUIDE_EXTENSION: &str = ".gui";
const PAGE_PREFIX: &str = "page";

/// Page index to ordered panel list. Pages without panels are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelStore {
    pages: BTreeMap<PageKey, Vec<PanelRect>>,
}

impl PanelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panels(&self, page: PageKey) -> &[PanelRect] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or_default()
    }

    /// Replaces a page's panels. An empty list removes the page.
    pub fn set_panels(&mut self, page: PageKey, panels: Vec<PanelRect>) {
        if panels.is_empty() {
            self.pages.remove(&page);
        } else {
            self.pages.insert(page, panels);
        }
    }

    pub fn remove_page(&mut self, page: PageKey) -> Vec<PanelRect> {
        self.pages.remove(&page).unwrap_or_default()
    }

    pub fn pages(&self) -> impl Iterator<Item = PageKey> + '_ {
        self.pages.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PageKey, &[PanelRect])> {
        self.pages.iter().map(|(page, panels)| (*page, panels.as_slice()))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn panel_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromIterator<(PageKey, Vec<PanelRect>)> for PanelStore {
    fn from_iter<T: IntoIterator<Item = (PageKey, Vec<PanelRect>)>>(iter: T) -> Self {
        let mut store = PanelStore::new();
        for (page, panels) in iter {
            store.set_panels(page, panels);
        }
        store
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GuideParseError {
    #[error("expected `page<N>: <coords>`, got {0:?}")]
    MissingSeparator(String),
    #[error("invalid page key {0:?}")]
    InvalidPageKey(String),
    #[error("invalid coordinate token {0:?}")]
    InvalidToken(String),
    #[error("dangling coordinate token {0:?}")]
    DanglingToken(String),
}

/// `comic.cbz` -> `comic.cbz.gui`
pub fn guide_path(comic_path: &Path) -> PathBuf {
    let mut path: OsString = comic_path.as_os_str().to_owned();
    path.push(GUIDE_EXTENSION);
    PathBuf::from(path)
}

pub fn encode(store: &PanelStore) -> String {
    store
        .iter()
        .map(|(page, panels)| {
            let coords = panels
                .iter()
                .map(|p| format!("{}_{};{}_{}", p.x1, p.y1, p.x2, p.y2))
                .join(";");
            format!("{PAGE_PREFIX}{page}: {coords}\n")
        })
        .collect()
}

/// Decodes a whole guide file. Malformed lines are logged and skipped.
pub fn decode(content: &str) -> PanelStore {
    decode_bytes(content.as_bytes())
}

/// Like [`decode`], but a line that is not valid UTF-8 is skipped on its own.
pub fn decode_bytes(content: &[u8]) -> PanelStore {
    let mut store = PanelStore::new();

    for (number, line) in content.split(|&b| b == b'\n').enumerate() {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!("Skipping guide line {}: {e}", number + 1);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        match decode_line(line) {
            Ok((page, panels)) => store.set_panels(page, panels),
            Err(e) => warn!("Skipping guide line {}: {e}", number + 1),
        }
    }

    store
}

pub fn decode_line(line: &str) -> Result<(PageKey, Vec<PanelRect>), GuideParseError> {
    let (key, value) = line
        .split_once(':')
        .filter(|(_, value)| !value.contains(':'))
        .ok_or_else(|| GuideParseError::MissingSeparator(line.to_string()))?;

    let page = key
        .trim()
        .strip_prefix(PAGE_PREFIX)
        .and_then(|x| x.trim().parse::<PageKey>().ok())
        .ok_or_else(|| GuideParseError::InvalidPageKey(key.to_string()))?;

    let value = value.trim();
    if value.is_empty() {
        return Ok((page, vec![]));
    }

    let mut panels = vec![];
    for mut pair in &value.split(';').map(str::trim).chunks(2) {
        let top_left = pair.next().unwrap_or_default();
        let Some(bottom_right) = pair.next() else {
            return Err(GuideParseError::DanglingToken(top_left.to_string()));
        };

        let (x1, y1) = decode_point(top_left)?;
        let (x2, y2) = decode_point(bottom_right)?;
        panels.push(PanelRect::new(x1, y1, x2, y2));
    }

    Ok((page, panels))
}

fn decode_point(token: &str) -> Result<(i32, i32), GuideParseError> {
    let invalid = || GuideParseError::InvalidToken(token.to_string());

    let (x, y) = token.split_once('_').ok_or_else(invalid)?;
    Ok((
        decode_coordinate(x).ok_or_else(invalid)?,
        decode_coordinate(y).ok_or_else(invalid)?,
    ))
}

/// Older guide files were written with float coordinates; they are truncated.
fn decode_coordinate(value: &str) -> Option<i32> {
    let value: f64 = value.trim().parse().ok()?;
    if !value.is_finite() || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return None;
    }
    Some(value.trunc() as i32)
}

/// Loads a guide file. A missing file is an empty store.
pub fn load(path: &Path) -> io::Result<PanelStore> {
    match fs::read(path) {
        Ok(content) => {
            let store = decode_bytes(&content);
            debug!(
                "Loaded {} panels on {} pages from {path:?}",
                store.panel_count(),
                store.page_count()
            );
            Ok(store)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No guide file at {path:?}");
            Ok(PanelStore::new())
        }
        Err(e) => Err(e),
    }
}

/// Writes the whole store next to `path` and renames it into place.
pub fn save(path: &Path, store: &PanelStore) -> io::Result<()> {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, encode(store))?;
    fs::rename(&tmp, path)
}
