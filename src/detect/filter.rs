//! Detection post-processing: class/confidence filtering and non-max
//! suppression. Runs on the worker thread after every inference pass, before
//! publication.

use crate::detect::{Detection, NormBox};

/// Overlap threshold for non-max suppression. Boxes of the retained class
/// overlapping a higher-confidence box by more than this are suppressed.
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Keep only detections of `class_id` at or above `min_confidence`.
pub fn retain_class(raw: Vec<Detection>, class_id: u32, min_confidence: f32) -> Vec<Detection> {
    raw.into_iter()
        .filter(|d| d.class_id == class_id && d.confidence >= min_confidence)
        .collect()
}

/// Intersection-over-union of two center-based normalized boxes.
pub fn iou(a: &NormBox, b: &NormBox) -> f32 {
    let (ax0, ay0, ax1, ay1) = corners(a);
    let (bx0, by0, bx1, by1) = corners(b);

    let ix = (ax1.min(bx1) - ax0.max(bx0)).max(0.0);
    let iy = (ay1.min(by1) - ay0.max(by0)).max(0.0);
    let inter = ix * iy;

    let area_a = (ax1 - ax0) * (ay1 - ay0);
    let area_b = (bx1 - bx0) * (by1 - by0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

fn corners(b: &NormBox) -> (f32, f32, f32, f32) {
    (
        b.x - b.w / 2.0,
        b.y - b.h / 2.0,
        b.x + b.w / 2.0,
        b.y + b.h / 2.0,
    )
}

/// Greedy non-max suppression.
///
/// Candidates are ordered by descending confidence; the sort is stable, so
/// equal-confidence boxes keep their inference order and the earlier one wins.
/// Returned detections preserve that order.
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| iou(&k.bbox, &candidate.bbox) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
