use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::{debug, info};
use thiserror::Error;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum PageSourceError {
    #[error("unsupported comic format: {0:?}")]
    UnsupportedArchiveFormat(PathBuf),
    #[error("page {index} is out of range ({count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    #[error("could not extract page {index}: {reason}")]
    Extraction { index: usize, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The pages of one open comic, in reading order.
pub trait PageSource {
    /// Page identifiers (entry names), sorted.
    fn list_pages(&self) -> &[String];

    /// Makes the page available as a local file and returns its path.
    fn materialize_page(&self, index: usize) -> Result<PathBuf, PageSourceError>;

    fn page_count(&self) -> usize {
        self.list_pages().len()
    }

    fn load_page_image(&self, index: usize) -> Result<DynamicImage, PageSourceError> {
        let path = self.materialize_page(index)?;
        image::open(&path).map_err(|e| PageSourceError::Extraction {
            index,
            reason: e.to_string(),
        })
    }
}

/// Opens the pages of a comic. Only unpacked comic directories are handled
/// here; archive containers need a [`PageSource`] of their own.
pub fn open_page_source(path: &Path) -> Result<Box<dyn PageSource>, PageSourceError> {
    if path.is_dir() {
        return Ok(Box::new(DirectoryPageSource::open(path)?));
    }
    Err(PageSourceError::UnsupportedArchiveFormat(path.to_path_buf()))
}

/// A comic unpacked into a directory of page images.
#[derive(Debug, Clone)]
pub struct DirectoryPageSource {
    root: PathBuf,
    pages: Vec<String>,
}

impl DirectoryPageSource {
    pub fn open(root: &Path) -> Result<Self, PageSourceError> {
        let mut pages: Vec<String> = fs::read_dir(root)?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_page_image(name))
            .collect();
        pages.sort();

        info!("Opened {root:?} with {} pages", pages.len());

        Ok(Self {
            root: root.to_path_buf(),
            pages,
        })
    }
}

impl PageSource for DirectoryPageSource {
    fn list_pages(&self) -> &[String] {
        &self.pages
    }

    fn materialize_page(&self, index: usize) -> Result<PathBuf, PageSourceError> {
        let name = self
            .pages
            .get(index)
            .ok_or(PageSourceError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })?;

        let path = self.root.join(name);
        if !path.is_file() {
            return Err(PageSourceError::Extraction {
                index,
                reason: format!("{path:?} no longer exists"),
            });
        }

        debug!("Page {index} -> {path:?}");
        Ok(path)
    }
}

fn is_page_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|x| x.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
