//! Matching utilities for assigning detections to tracks.

use ndarray::Array2;
use serde::Deserialize;

use crate::tracker::mask::Mask;

/// Detection input for the tracker. Produced fresh every frame.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Segmented region in image coordinates
    pub mask: Mask,
    /// Free-form class label from the segmenter
    pub label: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Frame the detection belongs to
    pub frame_index: u64,
}

impl Detection {
    pub fn new(mask: Mask, label: impl Into<String>, confidence: f32, frame_index: u64) -> Self {
        Self {
            mask,
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            frame_index,
        }
    }
}

/// How the affinity matrix is turned into track/detection pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Globally optimal bipartite assignment (Jonker-Volgenant).
    #[default]
    Optimal,
    /// Highest affinity first; a losing detection falls through to its next-best track.
    Greedy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Convert an affinity matrix (higher is better) into a cost matrix.
pub fn affinity_distance(affinity: &Array2<f32>) -> Array2<f32> {
    affinity.mapv(|a| 1.0 - a)
}

/// Assign rows (tracks) to columns (detections) keeping only pairs with cost <= `thresh`.
pub fn assign(
    cost_matrix: &Array2<f32>,
    thresh: f32,
    strategy: AssignmentStrategy,
) -> AssignmentResult {
    match strategy {
        AssignmentStrategy::Optimal => linear_assignment(cost_matrix, thresh),
        AssignmentStrategy::Greedy => greedy_assignment(cost_matrix, thresh),
    }
}

pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return unmatched_all(num_rows, num_cols);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64;
        }
    }

    let row_to_col = match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => row_to_col,
        Err(err) => {
            tracing::warn!(?err, "lapjv failed, falling back to greedy assignment");
            return greedy_assignment(cost_matrix, thresh);
        }
    };

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask: Vec<bool> = vec![true; num_cols];

    for (row_idx, &col_idx) in row_to_col.iter().enumerate() {
        if row_idx >= num_rows {
            continue;
        }
        if col_idx >= num_cols {
            unmatched_tracks.push(row_idx);
        } else if cost_matrix[[row_idx, col_idx]] <= thresh {
            matches.push((row_idx, col_idx));
            unmatched_detections_mask[col_idx] = false;
        } else {
            unmatched_tracks.push(row_idx);
        }
    }

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections: collect_unmatched(&unmatched_detections_mask),
    }
}

pub fn greedy_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return unmatched_all(num_rows, num_cols);
    }

    let mut candidates: Vec<(usize, usize, f32)> = cost_matrix
        .indexed_iter()
        .filter(|(_, c)| **c <= thresh)
        .map(|((i, j), &c)| (i, j, c))
        .collect();
    candidates.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

    let mut row_free = vec![true; num_rows];
    let mut col_free = vec![true; num_cols];
    let mut matches = vec![];
    for (i, j, _) in candidates {
        if row_free[i] && col_free[j] {
            row_free[i] = false;
            col_free[j] = false;
            matches.push((i, j));
        }
    }
    matches.sort_unstable();

    AssignmentResult {
        matches,
        unmatched_tracks: collect_unmatched(&row_free),
        unmatched_detections: collect_unmatched(&col_free),
    }
}

fn unmatched_all(num_rows: usize, num_cols: usize) -> AssignmentResult {
    AssignmentResult {
        matches: vec![],
        unmatched_tracks: (0..num_rows).collect(),
        unmatched_detections: (0..num_cols).collect(),
    }
}

fn collect_unmatched(free: &[bool]) -> Vec<usize> {
    free.iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect()
}
