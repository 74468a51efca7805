use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::guide::PageKey;
use crate::manager::PanelManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ViewMode {
    #[strum(serialize = "page view")]
    Page,
    #[strum(serialize = "panel view")]
    Panel { index: usize },
}

/// Result of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved,
    AtStart,
    AtEnd,
}

/// Where the reader is: a page, and optionally a panel on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    page: PageKey,
    mode: ViewMode,
}

impl Viewer {
    pub fn new(page: PageKey) -> Self {
        Self {
            page,
            mode: ViewMode::Page,
        }
    }

    pub fn page(&self) -> PageKey {
        self.page
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn panel(&self) -> Option<usize> {
        match self.mode {
            ViewMode::Page => None,
            ViewMode::Panel { index } => Some(index),
        }
    }

    /// Switches between page and panel view. A page without panels stays in
    /// page view. Returns the new mode.
    pub fn toggle(&mut self, manager: &PanelManager) -> ViewMode {
        self.mode = match self.mode {
            ViewMode::Panel { .. } => ViewMode::Page,
            ViewMode::Page if manager.panels(self.page).is_empty() => {
                warn!("No panels on page {}", self.page);
                ViewMode::Page
            }
            ViewMode::Page => ViewMode::Panel { index: 0 },
        };
        debug!("Switched to {}", self.mode);
        self.mode
    }

    /// Keeps the panel cursor inside the page's current panel list.
    pub fn clamp(&mut self, manager: &PanelManager) {
        let len = manager.panels(self.page).len();
        if let ViewMode::Panel { index } = self.mode {
            self.mode = if len == 0 {
                ViewMode::Page
            } else {
                ViewMode::Panel {
                    index: index.min(len - 1),
                }
            };
        }
    }

    pub fn go_to_page(&mut self, page: PageKey, manager: &PanelManager) {
        self.page = page;
        if self.panel().is_some() {
            self.mode = ViewMode::Panel { index: 0 };
            self.clamp(manager);
        }
    }

    pub fn next(&mut self, manager: &PanelManager) -> Step {
        if let ViewMode::Panel { index } = self.mode
            && index + 1 < manager.panels(self.page).len()
        {
            self.mode = ViewMode::Panel { index: index + 1 };
            return Step::Moved;
        }

        if self.page + 1 >= manager.num_pages() {
            info!("Reached the end of the comic");
            return Step::AtEnd;
        }
        self.go_to_page(self.page + 1, manager);
        Step::Moved
    }

    pub fn prev(&mut self, manager: &PanelManager) -> Step {
        if let ViewMode::Panel { index } = self.mode
            && index > 0
        {
            self.mode = ViewMode::Panel { index: index - 1 };
            return Step::Moved;
        }

        if self.page == 0 {
            info!("Reached the start of the comic");
            return Step::AtStart;
        }
        self.page -= 1;
        if self.panel().is_some() {
            let len = manager.panels(self.page).len();
            self.mode = ViewMode::Panel {
                index: len.saturating_sub(1),
            };
            self.clamp(manager);
        }
        Step::Moved
    }

    pub fn state(&self, comic_path: &Path) -> ViewerState {
        ViewerState {
            last_file: comic_path.to_path_buf(),
            current_page: self.page,
            current_panel: self.panel().unwrap_or_default(),
            viewing_panels: self.panel().is_some(),
        }
    }

    pub fn from_state(state: &ViewerState, manager: &PanelManager) -> Self {
        let mut viewer = Self::new(state.current_page);
        if state.viewing_panels {
            viewer.mode = ViewMode::Panel {
                index: state.current_panel,
            };
            viewer.clamp(manager);
        }
        viewer
    }
}

/// The last reading position, restored on the next start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerState {
    pub last_file: PathBuf,
    pub current_page: PageKey,
    pub current_panel: usize,
    pub viewing_panels: bool,
}

impl ViewerState {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No previous state found");
                return Ok(None);
            }
            Err(e) => return Err(e).with_context(|| format!("Could not read {path:?}")),
        };

        let state: Self =
            serde_json::from_str(&content).with_context(|| format!("Invalid state in {path:?}"))?;
        info!(
            "Loaded state: page {}, panel {}, viewing panels: {}",
            state.current_page, state.current_panel, state.viewing_panels
        );
        Ok(Some(state))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Could not write {path:?}"))?;
        info!(
            "Saved state: page {}, panel {}, viewing panels: {}",
            self.current_page, self.current_panel, self.viewing_panels
        );
        Ok(())
    }
}
