use std::io;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::batch::BatchReport;
use crate::detect::PanelDetector;
use crate::editing::{self, OrderError};
use crate::geometry::PanelRect;
use crate::guide::{self, PageKey, PanelStore};
use crate::page_source::{PageSource, PageSourceError, open_page_source};

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("page {page} has no panel {index} ({len} panels)")]
    IndexOutOfRange {
        page: PageKey,
        index: usize,
        len: usize,
    },
    #[error("cannot reorder page {page}: {source}")]
    InvalidOrder {
        page: PageKey,
        #[source]
        source: OrderError,
    },
    #[error(transparent)]
    Page(#[from] PageSourceError),
    #[error("could not read guide file {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not save guide file {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PanelError {
    fn from_order(page: PageKey, e: OrderError) -> Self {
        match e {
            OrderError::IndexOutOfRange { index, len } => {
                PanelError::IndexOutOfRange { page, index, len }
            }
            e => PanelError::InvalidOrder { page, source: e },
        }
    }
}

/// The panels of one open comic, kept in sync with its guide file.
///
/// Every mutating call rewrites the whole guide file before returning.
pub struct PanelManager {
    comic_path: PathBuf,
    guide_path: PathBuf,
    store: PanelStore,
    source: Box<dyn PageSource>,
}

impl PanelManager {
    pub fn open(comic_path: &Path) -> Result<Self, PanelError> {
        let source = open_page_source(comic_path)?;
        Self::with_source(comic_path, source)
    }

    pub fn with_source(comic_path: &Path, source: Box<dyn PageSource>) -> Result<Self, PanelError> {
        let guide_path = guide::guide_path(comic_path);
        let store = guide::load(&guide_path).map_err(|source| PanelError::Load {
            path: guide_path.clone(),
            source,
        })?;

        info!(
            "Opened {comic_path:?}: {} pages, {} with panels",
            source.page_count(),
            store.page_count()
        );

        Ok(Self {
            comic_path: comic_path.to_path_buf(),
            guide_path,
            store,
            source,
        })
    }

    pub fn comic_path(&self) -> &Path {
        &self.comic_path
    }

    pub fn guide_path(&self) -> &Path {
        &self.guide_path
    }

    pub fn store(&self) -> &PanelStore {
        &self.store
    }

    pub fn panels(&self, page: PageKey) -> &[PanelRect] {
        self.store.panels(page)
    }

    pub fn set_panels(&mut self, page: PageKey, panels: Vec<PanelRect>) -> Result<(), PanelError> {
        debug!("Set {} panels on page {page}", panels.len());
        self.store.set_panels(page, panels);
        self.save()
    }

    pub fn delete_panel(&mut self, page: PageKey, index: usize) -> Result<PanelRect, PanelError> {
        let mut panels = self.panels(page).to_vec();
        if index >= panels.len() {
            return Err(PanelError::IndexOutOfRange {
                page,
                index,
                len: panels.len(),
            });
        }

        let removed = panels.remove(index);
        info!("Deleting panel {index} {removed} on page {page}, {} left", panels.len());
        self.set_panels(page, panels)?;
        Ok(removed)
    }

    /// Appends a manually drawn panel. Returns its index.
    pub fn add_panel(&mut self, page: PageKey, rect: PanelRect) -> Result<usize, PanelError> {
        let mut panels = self.panels(page).to_vec();
        panels.push(rect.normalized());
        let index = panels.len() - 1;
        info!("Adding panel {index} {} on page {page}", panels[index]);
        self.set_panels(page, panels)?;
        Ok(index)
    }

    /// Moves or resizes an existing panel in place.
    pub fn replace_panel(
        &mut self,
        page: PageKey,
        index: usize,
        rect: PanelRect,
    ) -> Result<(), PanelError> {
        let mut panels = self.panels(page).to_vec();
        let len = panels.len();
        let slot = panels
            .get_mut(index)
            .ok_or(PanelError::IndexOutOfRange { page, index, len })?;
        *slot = rect.normalized();
        self.set_panels(page, panels)
    }

    /// Returns the panel's new index.
    pub fn move_panel_up(&mut self, page: PageKey, index: usize) -> Result<usize, PanelError> {
        let mut panels = self.panels(page).to_vec();
        let new_index =
            editing::move_up(&mut panels, index).map_err(|e| PanelError::from_order(page, e))?;
        self.set_panels(page, panels)?;
        Ok(new_index)
    }

    /// Returns the panel's new index.
    pub fn move_panel_down(&mut self, page: PageKey, index: usize) -> Result<usize, PanelError> {
        let mut panels = self.panels(page).to_vec();
        let new_index =
            editing::move_down(&mut panels, index).map_err(|e| PanelError::from_order(page, e))?;
        self.set_panels(page, panels)?;
        Ok(new_index)
    }

    /// `order[i]` is the current index of the panel that becomes panel `i`.
    pub fn reorder_panels(&mut self, page: PageKey, order: &[usize]) -> Result<(), PanelError> {
        let panels = editing::apply_order(self.panels(page), order)
            .map_err(|e| PanelError::from_order(page, e))?;
        info!("Saving new panel order {order:?} for page {page}");
        self.set_panels(page, panels)
    }

    /// Returns `false` when the page has no panels to order.
    pub fn auto_order_page(&mut self, page: PageKey, tolerance: i32) -> Result<bool, PanelError> {
        let panels = self.panels(page);
        if panels.is_empty() {
            debug!("No panels to reorder on page {page}");
            return Ok(false);
        }

        let ordered = editing::auto_order(panels, tolerance);
        self.set_panels(page, ordered)?;
        Ok(true)
    }

    /// Returns how many panels were removed.
    pub fn prune_zero_size(&mut self, page: PageKey) -> Result<usize, PanelError> {
        let (kept, removed) = editing::prune_degenerate(self.panels(page));
        info!("Removed {removed} zero-size panels on page {page}");
        self.set_panels(page, kept)?;
        Ok(removed)
    }

    /// Returns how many panels were removed.
    pub fn prune_contained(&mut self, page: PageKey, threshold: f64) -> Result<usize, PanelError> {
        let panels = self.panels(page);
        let kept = editing::prune_contained(panels, threshold);
        let removed = panels.len() - kept.len();
        info!("Removed {removed} nested panels on page {page}");
        self.set_panels(page, kept)?;
        Ok(removed)
    }

    /// Replaces the page's panels with freshly detected ones. Returns the new count.
    pub fn recalculate_page(
        &mut self,
        page: PageKey,
        detector: &dyn PanelDetector,
    ) -> Result<usize, PanelError> {
        info!("Recalculating panels for page {page}");
        let image = self.page_image(page)?;
        let panels = detector.detect(&image);
        let count = panels.len();
        self.set_panels(page, panels)?;
        info!("Panels recalculated for page {page}. New panel count: {count}");
        Ok(count)
    }

    pub fn recalculate_pages(
        &mut self,
        pages: &[PageKey],
        detector: &dyn PanelDetector,
    ) -> BatchReport {
        self.run_batch(pages, |manager, page| {
            manager.recalculate_page(page, detector).map(|_| true)
        })
    }

    /// Recalculates `from` and every page after it.
    pub fn recalculate_remaining(
        &mut self,
        from: PageKey,
        detector: &dyn PanelDetector,
    ) -> BatchReport {
        let pages: Vec<PageKey> = (from..self.num_pages()).collect();
        self.recalculate_pages(&pages, detector)
    }

    pub fn auto_order_pages(&mut self, pages: &[PageKey], tolerance: i32) -> BatchReport {
        self.run_batch(pages, |manager, page| manager.auto_order_page(page, tolerance))
    }

    pub fn auto_order_remaining(&mut self, from: PageKey, tolerance: i32) -> BatchReport {
        let pages: Vec<PageKey> = (from..self.num_pages()).collect();
        self.auto_order_pages(&pages, tolerance)
    }

    /// `op` returns `false` when it had nothing to do on the page.
    fn run_batch<F>(&mut self, pages: &[PageKey], mut op: F) -> BatchReport
    where
        F: FnMut(&mut Self, PageKey) -> Result<bool, PanelError>,
    {
        let mut report = BatchReport::default();
        for &page in pages {
            match op(self, page) {
                Ok(true) => report.updated.push(page),
                Ok(false) => report.skipped.push(page),
                Err(e) => {
                    error!("Skipping page {page}: {e}");
                    report.failed.push((page, e.to_string()));
                }
            }
        }
        report
    }

    pub fn num_pages(&self) -> usize {
        self.source.page_count()
    }

    pub fn page_path(&self, page: PageKey) -> Result<PathBuf, PanelError> {
        Ok(self.source.materialize_page(page)?)
    }

    pub fn page_image(&self, page: PageKey) -> Result<DynamicImage, PanelError> {
        Ok(self.source.load_page_image(page)?)
    }

    /// Crops one panel out of its page.
    pub fn panel_image(&self, page: PageKey, index: usize) -> Result<DynamicImage, PanelError> {
        let panels = self.panels(page);
        let panel = panels.get(index).ok_or(PanelError::IndexOutOfRange {
            page,
            index,
            len: panels.len(),
        })?;

        let image = self.page_image(page)?;
        // Only the part of the panel that lies on the page.
        let visible = PanelRect::new(
            panel.x1.max(0),
            panel.y1.max(0),
            panel.x2.min(image.width() as i32),
            panel.y2.min(image.height() as i32),
        );
        Ok(image.crop_imm(
            visible.x1 as u32,
            visible.y1 as u32,
            visible.width() as u32,
            visible.height() as u32,
        ))
    }

    /// Nearest readable page after `page`, else before it.
    pub fn find_next_valid_page(&self, page: PageKey) -> Option<PageKey> {
        let count = self.num_pages();
        let forward = (page + 1)..count;
        let backward = (0..page.min(count)).rev();

        let found = forward.chain(backward).find(|&candidate| {
            self.page_image(candidate)
                .inspect_err(|e| warn!("Page {candidate} is unreadable: {e}"))
                .is_ok()
        });

        match found {
            Some(valid) => info!("Falling back from page {page} to page {valid}"),
            None => error!("No readable page in {:?}", self.comic_path),
        }
        found
    }

    pub fn save(&self) -> Result<(), PanelError> {
        guide::save(&self.guide_path, &self.store).map_err(|source| {
            error!("Saving {:?} failed: {source}", self.guide_path);
            PanelError::Persist {
                path: self.guide_path.clone(),
                source,
            }
        })
    }
}
