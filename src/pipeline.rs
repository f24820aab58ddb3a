//! Per-frame consumer step.
//!
//! Runs on the capture thread once per frame: read the latest published
//! detection set, measure the closest surface inside each box, classify, and
//! shape the results for the transmitter. Never waits on the inference
//! worker; with no fresh publish it simply re-measures the previous set
//! against the new depth frame.

use crate::detect::DetectionStore;
use crate::frame::CameraFrame;
use crate::measure::{classify, min_depth_in_rect, to_pixel_rect, DistanceThresholds, PixelRect, Severity};
use crate::transport::wire::BoxPacket;

/// Capacity bound on detections pulled from the store per frame. Far above
/// anything a real scene produces; the store truncates silently past it.
pub const MAX_REPORTED_BOXES: usize = 64;

/// The "closest object" readout is suppressed beyond this distance.
pub const DISPLAY_CEILING_M: f32 = 3.0;

/// One detection measured against the current depth frame.
#[derive(Clone, Copy, Debug)]
pub struct BoxReport {
    pub rect: PixelRect,
    pub min_depth_raw: u16,
    /// Closest surface in the box, in meters.
    pub distance_m: f32,
    pub severity: Severity,
}

/// Everything the consumer produces for one frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub seq: u64,
    pub boxes: Vec<BoxReport>,
    /// Closest surface across all boxes, when inside the display ceiling.
    pub closest_m: Option<f32>,
}

/// Measure the latest detection set against one captured frame.
///
/// The frame must already have its shadows normalized; otherwise dropout
/// pixels would win every minimum scan.
pub fn process_frame(
    frame: &CameraFrame,
    store: &DetectionStore,
    thresholds: &DistanceThresholds,
) -> FrameReport {
    let raw_thresholds = thresholds.to_raw(frame.depth_scale);
    let detections = store.read(MAX_REPORTED_BOXES);

    let mut boxes = Vec::with_capacity(detections.len());
    let mut all_min_raw = u16::MAX;

    for detection in &detections {
        let rect = to_pixel_rect(&detection.bbox, frame.width, frame.height);
        let min_raw = min_depth_in_rect(frame, &rect);
        all_min_raw = all_min_raw.min(min_raw);

        boxes.push(BoxReport {
            rect,
            min_depth_raw: min_raw,
            distance_m: min_raw as f32 * frame.depth_scale,
            severity: classify(min_raw, &raw_thresholds),
        });
    }

    let closest_m = (!boxes.is_empty())
        .then(|| all_min_raw as f32 * frame.depth_scale)
        .filter(|m| *m < DISPLAY_CEILING_M);

    FrameReport {
        seq: frame.seq,
        boxes,
        closest_m,
    }
}

/// Shape a frame report for the telemetry channel.
pub fn to_packets(report: &FrameReport) -> Vec<BoxPacket> {
    report
        .boxes
        .iter()
        .map(|b| BoxPacket {
            min_distance: b.distance_m,
            x_min: b.rect.x_min,
            x_max: b.rect.x_max,
            y_min: b.rect.y_min,
            y_max: b.rect.y_max,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Detection, NormBox, PERSON_CLASS_ID};

    /// 100x100 frame, 1mm depth units, uniform background with a nearer
    /// plate inside the detection box.
    fn test_frame() -> CameraFrame {
        let mut depth = vec![5000u16; 100 * 100];
        // plate at 0.9m inside the box centered at (50, 50)
        for y in 45..55 {
            for x in 45..55 {
                depth[y * 100 + x] = 900;
            }
        }
        CameraFrame {
            color: vec![0u8; 100 * 100 * 3],
            depth,
            width: 100,
            height: 100,
            depth_scale: 0.001,
            seq: 7,
        }
    }

    fn detection(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection {
            class_id: PERSON_CLASS_ID,
            confidence: 0.9,
            bbox: NormBox { x, y, w, h },
        }
    }

    #[test]
    fn empty_store_yields_empty_report() {
        let store = DetectionStore::new();
        let report = process_frame(&test_frame(), &store, &DistanceThresholds::default());
        assert!(report.boxes.is_empty());
        assert!(report.closest_m.is_none());
        assert_eq!(report.seq, 7);
    }

    #[test]
    fn box_over_plate_reports_near_severity_and_distance() {
        let store = DetectionStore::new();
        store.publish(&[detection(0.5, 0.5, 0.2, 0.2)]);

        let report = process_frame(&test_frame(), &store, &DistanceThresholds::default());
        assert_eq!(report.boxes.len(), 1);
        let b = report.boxes[0];
        assert_eq!(b.min_depth_raw, 900);
        assert!((b.distance_m - 0.9).abs() < 1e-4);
        assert_eq!(b.severity, Severity::Near);
        assert!((report.closest_m.unwrap() - 0.9).abs() < 1e-4);
    }

    #[test]
    fn box_away_from_plate_is_clear_and_beyond_display_ceiling() {
        let store = DetectionStore::new();
        store.publish(&[detection(0.15, 0.15, 0.2, 0.2)]);

        let report = process_frame(&test_frame(), &store, &DistanceThresholds::default());
        let b = report.boxes[0];
        assert_eq!(b.min_depth_raw, 5000);
        assert_eq!(b.severity, Severity::Clear);
        // 5m background is past the 3m readout ceiling.
        assert!(report.closest_m.is_none());
    }

    #[test]
    fn closest_readout_tracks_global_minimum() {
        let store = DetectionStore::new();
        store.publish(&[
            detection(0.15, 0.15, 0.2, 0.2),
            detection(0.5, 0.5, 0.2, 0.2),
        ]);

        let report = process_frame(&test_frame(), &store, &DistanceThresholds::default());
        assert_eq!(report.boxes.len(), 2);
        assert!((report.closest_m.unwrap() - 0.9).abs() < 1e-4);
    }

    #[test]
    fn packets_mirror_report_geometry() {
        let store = DetectionStore::new();
        store.publish(&[detection(0.5, 0.5, 0.2, 0.2)]);

        let report = process_frame(&test_frame(), &store, &DistanceThresholds::default());
        let packets = to_packets(&report);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].x_min, report.boxes[0].rect.x_min);
        assert_eq!(packets[0].x_max, report.boxes[0].rect.x_max);
        assert_eq!(packets[0].y_min, report.boxes[0].rect.y_min);
        assert_eq!(packets[0].y_max, report.boxes[0].rect.y_max);
        assert_eq!(packets[0].min_distance, report.boxes[0].distance_m);
    }
}
