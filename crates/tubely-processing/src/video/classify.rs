use tubely_core::models::{OrientationCategory, StreamGeometry};

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;
const RATIO_TOLERANCE: f64 = 0.1;

/// Bucket a stream by how close its aspect ratio is to 16:9 or 9:16.
pub fn classify(geometry: &StreamGeometry) -> OrientationCategory {
    let ratio = geometry.aspect_ratio();

    if (LANDSCAPE_RATIO - ratio).abs() < RATIO_TOLERANCE {
        OrientationCategory::Landscape
    } else if (PORTRAIT_RATIO - ratio).abs() < RATIO_TOLERANCE {
        OrientationCategory::Portrait
    } else {
        OrientationCategory::Other
    }
}
