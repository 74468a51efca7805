//! Command-line surface over the panel guide of one comic.
//!
//! Page and panel numbers are 1-based here and 0-based everywhere else.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comic_panels::batch::BatchReport;
use comic_panels::view::{Step, ViewMode};
use comic_panels::{
    PageKey, PanelDetector, PanelManager, PanelRect, Settings, Viewer, ViewerState,
    parse_page_ranges,
};
use itertools::Itertools;
use log::{info, warn};

/// Edit the panel guide of a comic
#[derive(Parser, Debug)]
#[command(name = "comic-panels", version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the pages and their panel counts
    Pages { comic: PathBuf },
    /// Print the panels of a page
    Show {
        comic: PathBuf,
        #[arg(long)]
        page: usize,
    },
    /// Detect panels again, replacing the current ones
    Recalc {
        comic: PathBuf,
        #[command(flatten)]
        pages: PageSelection,
    },
    /// Sort panels into rows, left to right and top to bottom
    Order {
        comic: PathBuf,
        #[command(flatten)]
        pages: PageSelection,
    },
    /// Put a page's panels in an explicit order, e.g. `3,1,2`
    Reorder {
        comic: PathBuf,
        #[arg(long)]
        page: usize,
        #[arg(long, value_delimiter = ',')]
        order: Vec<usize>,
    },
    /// Move one panel up or down by one position
    Move {
        comic: PathBuf,
        #[arg(long)]
        page: usize,
        #[arg(long)]
        panel: usize,
        direction: Direction,
    },
    /// Remove zero-size panels, and with `--nested` panels inside other panels
    Prune {
        comic: PathBuf,
        #[arg(long)]
        page: usize,
        #[arg(long)]
        nested: bool,
    },
    /// Delete one panel
    Delete {
        comic: PathBuf,
        #[arg(long)]
        page: usize,
        #[arg(long)]
        panel: usize,
    },
    /// Add a panel from two corners
    Add {
        comic: PathBuf,
        #[arg(long)]
        page: usize,
        #[arg(allow_negative_numbers = true)]
        x1: i32,
        #[arg(allow_negative_numbers = true)]
        y1: i32,
        #[arg(allow_negative_numbers = true)]
        x2: i32,
        #[arg(allow_negative_numbers = true)]
        y2: i32,
    },
    /// Continue reading where the last session stopped
    Read {
        comic: PathBuf,
        #[arg(value_enum, default_value_t = ReadAction::Stay)]
        action: ReadAction,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PageSelection {
    /// A single page
    #[arg(long)]
    page: Option<usize>,
    /// This page and every page after it
    #[arg(long)]
    from: Option<usize>,
    /// Pages like `1,3,4-8`
    #[arg(long)]
    pages: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Direction {
    Up,
    Down,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ReadAction {
    Stay,
    Next,
    Prev,
    Toggle,
}

fn page_index(page: usize) -> Result<PageKey> {
    page.checked_sub(1).context("pages are numbered from 1")
}

fn panel_index(panel: usize) -> Result<usize> {
    panel.checked_sub(1).context("panels are numbered from 1")
}

impl PageSelection {
    fn resolve(&self, manager: &PanelManager) -> Result<Vec<PageKey>> {
        if let Some(page) = self.page {
            return Ok(vec![page_index(page)?]);
        }
        if let Some(from) = self.from {
            return Ok((page_index(from)?..manager.num_pages()).collect());
        }
        match &self.pages {
            Some(pages) => Ok(parse_page_ranges(pages)?),
            None => bail!("no pages selected"),
        }
    }
}

pub fn run(args: CliArgs, settings: &Settings) -> Result<()> {
    match args.command {
        Command::Pages { comic } => {
            let manager = open(&comic)?;
            for page in 0..manager.num_pages() {
                println!("page {:>4}: {} panels", page + 1, manager.panels(page).len());
            }
        }
        Command::Show { comic, page } => {
            let manager = open(&comic)?;
            print_panels(&manager, page_index(page)?);
        }
        Command::Recalc { comic, pages } => {
            let mut manager = open(&comic)?;
            let pages = pages.resolve(&manager)?;
            let detector: &dyn PanelDetector = &settings.detector;
            report(&manager.recalculate_pages(&pages, detector))?;
        }
        Command::Order { comic, pages } => {
            let mut manager = open(&comic)?;
            let pages = pages.resolve(&manager)?;
            report(&manager.auto_order_pages(&pages, settings.row_tolerance))?;
        }
        Command::Reorder { comic, page, order } => {
            let mut manager = open(&comic)?;
            let page = page_index(page)?;
            let order = order
                .into_iter()
                .map(panel_index)
                .collect::<Result<Vec<_>>>()?;
            manager.reorder_panels(page, &order)?;
            print_panels(&manager, page);
        }
        Command::Move {
            comic,
            page,
            panel,
            direction,
        } => {
            let mut manager = open(&comic)?;
            let page = page_index(page)?;
            let panel = panel_index(panel)?;
            let moved_to = match direction {
                Direction::Up => manager.move_panel_up(page, panel)?,
                Direction::Down => manager.move_panel_down(page, panel)?,
            };
            println!("panel {} is now panel {}", panel + 1, moved_to + 1);
        }
        Command::Prune {
            comic,
            page,
            nested,
        } => {
            let mut manager = open(&comic)?;
            let page = page_index(page)?;
            let mut removed = manager.prune_zero_size(page)?;
            if nested {
                removed += manager.prune_contained(page, settings.containment_threshold)?;
            }
            println!("{removed} panels were removed.");
        }
        Command::Delete { comic, page, panel } => {
            let mut manager = open(&comic)?;
            let page = page_index(page)?;
            let removed = manager.delete_panel(page, panel_index(panel)?)?;
            println!("deleted {removed}, {} panels left", manager.panels(page).len());
        }
        Command::Add {
            comic,
            page,
            x1,
            y1,
            x2,
            y2,
        } => {
            let mut manager = open(&comic)?;
            let page = page_index(page)?;
            let index = manager.add_panel(page, PanelRect::from_corners((x1, y1), (x2, y2)))?;
            println!("added panel {}", index + 1);
        }
        Command::Read { comic, action } => read(&comic, action, &settings.state_file)?,
    }
    Ok(())
}

fn open(comic: &Path) -> Result<PanelManager> {
    PanelManager::open(comic).with_context(|| format!("Could not open {comic:?}"))
}

fn print_panels(manager: &PanelManager, page: PageKey) {
    let panels = manager.panels(page);
    if panels.is_empty() {
        println!("page {} has no panels", page + 1);
    }
    for (i, panel) in panels.iter().enumerate() {
        println!("{:>3}: {panel}", i + 1);
    }
}

fn report(report: &BatchReport) -> Result<()> {
    println!("{} pages updated", report.updated.len());
    if !report.skipped.is_empty() {
        println!(
            "{} pages had no panels: {}",
            report.skipped.len(),
            report.skipped.iter().map(|page| page + 1).join(", ")
        );
    }
    if !report.is_success() {
        for (page, reason) in &report.failed {
            println!("page {}: {reason}", page + 1);
        }
        bail!("pages {} could not be processed", report.failed_pages());
    }
    Ok(())
}

fn read(comic: &Path, action: ReadAction, state_file: &Path) -> Result<()> {
    let manager = open(comic)?;

    let mut viewer = match ViewerState::load(state_file)? {
        Some(state) if state.last_file == comic => Viewer::from_state(&state, &manager),
        _ => Viewer::new(0),
    };

    let step = match action {
        ReadAction::Stay => Step::Moved,
        ReadAction::Next => viewer.next(&manager),
        ReadAction::Prev => viewer.prev(&manager),
        ReadAction::Toggle => {
            viewer.toggle(&manager);
            Step::Moved
        }
    };
    match step {
        Step::AtStart => println!("This is the first page of the comic."),
        Step::AtEnd => println!("This is the end of the comic."),
        Step::Moved => {}
    }

    if let Err(e) = manager.page_image(viewer.page()) {
        warn!("Page {} could not be shown: {e}", viewer.page());
        let Some(page) = manager.find_next_valid_page(viewer.page()) else {
            bail!("no page of {comic:?} can be read");
        };
        viewer.go_to_page(page, &manager);
    }

    match viewer.mode() {
        ViewMode::Page => println!("page {}/{}", viewer.page() + 1, manager.num_pages()),
        ViewMode::Panel { index } => println!(
            "page {}/{}, panel {}/{}: {}",
            viewer.page() + 1,
            manager.num_pages(),
            index + 1,
            manager.panels(viewer.page()).len(),
            manager.panels(viewer.page())[index]
        ),
    }

    viewer.state(comic).save(state_file)?;
    info!("Reading position saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn comic(pages: usize) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let comic = dir.path().join("comic");
        fs::create_dir(&comic).unwrap();
        for i in 0..pages {
            RgbImage::from_pixel(40, 60, Rgb([255, 255, 255]))
                .save(comic.join(format!("{i:03}.png")))
                .unwrap();
        }
        (dir, comic)
    }

    fn run_args(args: &[&str], settings: &Settings) -> Result<()> {
        let args = CliArgs::try_parse_from([&["comic-panels"][..], args].concat())?;
        run(args, settings)
    }

    #[test]
    fn exactly_one_page_selection() {
        assert!(CliArgs::try_parse_from(["comic-panels", "recalc", "c"]).is_err());
        assert!(
            CliArgs::try_parse_from(["comic-panels", "recalc", "c", "--page", "1", "--from", "2"])
                .is_err()
        );
        assert!(CliArgs::try_parse_from(["comic-panels", "order", "c", "--pages", "1,3-4"]).is_ok());
    }

    #[test]
    fn numbers_start_at_one() {
        assert!(page_index(0).is_err());
        assert_eq!(page_index(1).unwrap(), 0);
        assert!(panel_index(0).is_err());
        assert_eq!(panel_index(3).unwrap(), 2);

        let (_dir, comic) = comic(1);
        let comic = comic.to_str().unwrap();
        assert!(run_args(&["show", comic, "--page", "0"], &Settings::default()).is_err());
        assert!(
            run_args(&["delete", comic, "--page", "1", "--panel", "0"], &Settings::default())
                .is_err()
        );
    }

    #[test]
    fn from_selects_the_remaining_pages() {
        let (_dir, comic) = comic(3);
        let manager = PanelManager::open(&comic).unwrap();
        let args =
            CliArgs::try_parse_from(["comic-panels", "order", comic.to_str().unwrap(), "--from", "2"])
                .unwrap();

        let Command::Order { pages, .. } = args.command else {
            panic!("expected the order command");
        };
        assert_eq!(pages.resolve(&manager).unwrap(), vec![1, 2]);
    }

    #[test]
    fn edit_commands_update_the_guide() {
        let (_dir, comic) = comic(2);
        let path = comic.to_str().unwrap();
        let settings = Settings::default();
        let left = PanelRect::new(-5, 0, 10, 10);
        let right = PanelRect::new(20, 0, 30, 10);

        run_args(&["add", path, "--page", "2", "10", "10", "-5", "0"], &settings).unwrap();
        run_args(&["add", path, "--page", "2", "20", "0", "30", "10"], &settings).unwrap();
        assert_eq!(PanelManager::open(&comic).unwrap().panels(1), &[left, right]);

        run_args(&["reorder", path, "--page", "2", "--order", "2,1"], &settings).unwrap();
        assert_eq!(PanelManager::open(&comic).unwrap().panels(1), &[right, left]);

        run_args(&["delete", path, "--page", "2", "--panel", "1"], &settings).unwrap();
        assert_eq!(PanelManager::open(&comic).unwrap().panels(1), &[left]);

        assert!(run_args(&["reorder", path, "--page", "2", "--order", "1,1"], &settings).is_err());
        assert_eq!(PanelManager::open(&comic).unwrap().panels(1), &[left]);
    }

    #[test]
    fn read_moves_past_an_unreadable_page() {
        let (dir, comic) = comic(3);
        fs::write(comic.join("000.png"), b"corrupt").unwrap();
        let settings = Settings {
            state_file: dir.path().join("comic_state.json"),
            ..Settings::default()
        };
        let path = comic.to_str().unwrap();

        run_args(&["read", path], &settings).unwrap();

        let state = ViewerState::load(&settings.state_file).unwrap().unwrap();
        assert_eq!(state.last_file, comic);
        assert_eq!(state.current_page, 1);
        assert!(!state.viewing_panels);

        run_args(&["read", path, "next"], &settings).unwrap();

        let state = ViewerState::load(&settings.state_file).unwrap().unwrap();
        assert_eq!(state.current_page, 2);
    }

    #[test]
    fn read_of_another_comic_starts_over() {
        let (dir, comic) = comic(2);
        let settings = Settings {
            state_file: dir.path().join("comic_state.json"),
            ..Settings::default()
        };
        ViewerState {
            last_file: dir.path().join("other"),
            current_page: 1,
            current_panel: 0,
            viewing_panels: false,
        }
        .save(&settings.state_file)
        .unwrap();

        run_args(&["read", comic.to_str().unwrap()], &settings).unwrap();

        let state = ViewerState::load(&settings.state_file).unwrap().unwrap();
        assert_eq!(state.last_file, comic);
        assert_eq!(state.current_page, 0);
    }
}
