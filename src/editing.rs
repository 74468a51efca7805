//! Pure operations over one page's panel list.
//!
//! Panels are identified by position, so every reordering here is a
//! renumbering of the page.

use itertools::Itertools;
use thiserror::Error;

use crate::geometry::PanelRect;

/// Default vertical distance between two panel tops that still counts as one row.
pub const DEFAULT_ROW_TOLERANCE: i32 = 50;

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("panel {index} does not exist ({len} panels)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("{0:?} is not a permutation of the page's {1} panels")]
    NotAPermutation(Vec<usize>, usize),
}

/// Drops every panel that lies mostly inside another panel.
///
/// Every other panel is tested, whether or not it is dropped itself. Of two
/// panels contained in each other, the one earlier in the list survives.
pub fn prune_contained(panels: &[PanelRect], threshold: f64) -> Vec<PanelRect> {
    panels
        .iter()
        .enumerate()
        .filter(|&(i, panel)| {
            !panels.iter().enumerate().any(|(j, q)| {
                j != i
                    && panel.is_contained_in(q, threshold)
                    && !(j > i && q.is_contained_in(panel, threshold))
            })
        })
        .map(|(_, panel)| *panel)
        .collect()
}

/// Drops panels with zero width or height. Returns the remaining panels and
/// how many were removed.
pub fn prune_degenerate(panels: &[PanelRect]) -> (Vec<PanelRect>, usize) {
    let (kept, removed): (Vec<PanelRect>, Vec<PanelRect>) =
        panels.iter().partition(|p| !p.is_degenerate());
    (kept, removed.len())
}

/// Approximates left-to-right, top-to-bottom reading order.
///
/// Panels are grouped into rows: the topmost ungrouped panel seeds a row and
/// every panel whose top is within `tolerance` of the seed's top joins it.
/// Rows are sorted by `x1` and concatenated top to bottom.
pub fn auto_order(panels: &[PanelRect], tolerance: i32) -> Vec<PanelRect> {
    let mut rows: Vec<Vec<PanelRect>> = vec![];

    for panel in panels.iter().sorted_by_key(|p| p.y1) {
        match rows.last_mut() {
            Some(row) if (panel.y1 - row[0].y1).abs() <= tolerance => row.push(*panel),
            _ => rows.push(vec![*panel]),
        }
    }

    rows.into_iter()
        .flat_map(|row| row.into_iter().sorted_by_key(|p| p.x1))
        .collect()
}

/// Swaps the panel at `index` with the one before it. Returns the panel's new index.
pub fn move_up(panels: &mut [PanelRect], index: usize) -> Result<usize, OrderError> {
    check_index(panels, index)?;
    if index == 0 {
        return Ok(index);
    }
    panels.swap(index, index - 1);
    Ok(index - 1)
}

/// Swaps the panel at `index` with the one after it. Returns the panel's new index.
pub fn move_down(panels: &mut [PanelRect], index: usize) -> Result<usize, OrderError> {
    check_index(panels, index)?;
    if index + 1 == panels.len() {
        return Ok(index);
    }
    panels.swap(index, index + 1);
    Ok(index + 1)
}

/// `order[i]` is the current index of the panel that should end up at `i`.
pub fn apply_order(panels: &[PanelRect], order: &[usize]) -> Result<Vec<PanelRect>, OrderError> {
    let is_permutation = order.len() == panels.len()
        && order.iter().all_unique()
        && order.iter().all(|&i| i < panels.len());
    if !is_permutation {
        return Err(OrderError::NotAPermutation(order.to_vec(), panels.len()));
    }

    Ok(order.iter().map(|&i| panels[i]).collect())
}

fn check_index(panels: &[PanelRect], index: usize) -> Result<(), OrderError> {
    if index >= panels.len() {
        return Err(OrderError::IndexOutOfRange {
            index,
            len: panels.len(),
        });
    }
    Ok(())
}
