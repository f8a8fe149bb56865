// Contracts for the external collaborators the solver drives
use crate::matching::DetectedRegion;
use thiserror::Error;

/// Failure reported by an interactive session
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("Timed out waiting for '{what}'")]
    Timeout { what: String },

    #[error("Element '{what}' not found")]
    ElementMissing { what: String },

    #[error("Driver error: {0}")]
    Driver(String),
}

/// Failure reported by the detection or classification model
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{model} failed: {reason}")]
pub struct ModelError {
    pub model: String,
    pub reason: String,
}

/// What the session can tell about the puzzle background element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSnapshot {
    /// Inline style attribute, carries the image URL and usually the size
    pub style: Option<String>,
    /// Rendered box size as measured by the browser
    pub measured_size: Option<(f64, f64)>,
}

// A browser page currently showing the puzzle frame
pub trait InteractiveSession {
    /// Current state of the puzzle background element
    fn background_element(&mut self) -> Result<ElementSnapshot, SessionError>;

    /// URL of the reference sprite sheet
    fn sprite_sheet_url(&mut self) -> Result<String, SessionError>;

    /// Move to the background element center plus (dx, dy), then click
    fn click_at_offset(&mut self, dx: i32, dy: i32) -> Result<(), SessionError>;

    fn click_submit(&mut self) -> Result<(), SessionError>;

    /// Class attribute of the result indicator
    fn result_indicator_class(&mut self) -> Result<String, SessionError>;

    /// Ask for a new puzzle
    fn click_reload(&mut self) -> Result<(), SessionError>;
}

/// Black-box object detector over the background image
pub trait RegionDetector {
    fn detect(&self, image: &[u8]) -> Result<Vec<DetectedRegion>, ModelError>;
}

/// Black-box classifier returning one label per sprite slice
pub trait ValidityClassifier {
    fn classify(&self, image: &[u8]) -> Result<String, ModelError>;
}

/// Detector answering with a fixed region list, e.g. one loaded from disk
#[derive(Debug, Clone, Default)]
pub struct StaticRegionDetector {
    regions: Vec<DetectedRegion>,
}

impl StaticRegionDetector {
    pub fn new(regions: Vec<DetectedRegion>) -> Self {
        Self { regions }
    }

    /// Parse a JSON array of `[x1, y1, x2, y2]` boxes
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

impl RegionDetector for StaticRegionDetector {
    fn detect(&self, _image: &[u8]) -> Result<Vec<DetectedRegion>, ModelError> {
        Ok(self.regions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_detector_from_json() {
        let detector = StaticRegionDetector::from_json("[[1,2,30,40],[50,60,70,80]]").unwrap();
        let regions = detector.detect(&[]).unwrap();
        assert_eq!(
            regions,
            vec![
                DetectedRegion::new(1, 2, 30, 40),
                DetectedRegion::new(50, 60, 70, 80)
            ]
        );
    }

    #[test]
    fn test_static_detector_rejects_bad_json() {
        assert!(StaticRegionDetector::from_json("[[1,2,3]]").is_err());
        assert!(StaticRegionDetector::from_json("{}").is_err());
    }
}
