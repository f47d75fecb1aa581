//! Face recognition capabilities and the two-step pipeline front half.
//!
//! The actual detector, chip normalizer, and descriptor extractor are
//! external (a dlib-style backend, a vendor SDK, a test stub); this
//! module defines the capability traits the node consumes and the
//! [`FaceNormalizer`] composition that turns a raw camera frame into a
//! normalized face chip -- or nothing, when no face is in view.
//!
//! Descriptor extraction is CPU-heavy and may legally run off the
//! controller's thread; the decision engine offloads it to a blocking
//! worker, which is why every capability here is `Send + Sync`.

pub mod matcher;

pub use matcher::DescriptorMatcher;

use crate::error::Result;
use crate::types::{Descriptor, Rectangle};

/// One camera image, treated as opaque pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Raw pixel bytes in the camera's native layout.
    pub data: Vec<u8>,
}

impl Frame {
    /// Wraps raw pixel data.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }
}

/// A face chip cropped and aligned for descriptor extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFrame {
    /// Raw chip bytes in the recognizer's expected layout.
    pub data: Vec<u8>,
}

/// Finds faces in a frame.
pub trait Detector: Send + Sync {
    /// Bounding rectangles of every detected face; empty when none.
    fn find_faces(&self, frame: &Frame) -> Vec<Rectangle>;
}

/// Crops and aligns one detected face.
pub trait Normalizer: Send + Sync {
    /// Produces the normalized chip for the face at `rectangle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`](crate::Error::Recognition) when
    /// the crop cannot be normalized.
    fn normalize(&self, frame: &Frame, rectangle: Rectangle) -> Result<NormalizedFrame>;
}

/// Extracts and compares face descriptors.
pub trait Recognizer: Send + Sync {
    /// Computes the descriptor of a normalized face chip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`](crate::Error::Recognition) when
    /// extraction fails.
    fn extract_descriptor(&self, chip: &NormalizedFrame) -> Result<Descriptor>;

    /// Whether two descriptors belong to the same person. Must behave
    /// as a pure boolean function; implementations are expected to be
    /// symmetric.
    fn similar(&self, a: &Descriptor, b: &Descriptor) -> bool;
}

/// Detector + normalizer composition: frame in, face chip out.
pub struct FaceNormalizer {
    detector: std::sync::Arc<dyn Detector>,
    normalizer: std::sync::Arc<dyn Normalizer>,
}

impl FaceNormalizer {
    /// Composes a detector and a normalizer.
    pub fn new(
        detector: std::sync::Arc<dyn Detector>,
        normalizer: std::sync::Arc<dyn Normalizer>,
    ) -> Self {
        Self {
            detector,
            normalizer,
        }
    }

    /// Normalizes the most prominent face in the frame, or `None` when
    /// no face is detected. When several faces are found, the one with
    /// the largest rectangle area wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`](crate::Error::Recognition) when a
    /// face was found but its crop cannot be normalized.
    pub fn normalize(&self, frame: &Frame) -> Result<Option<NormalizedFrame>> {
        match largest_rectangle(self.detector.find_faces(frame)) {
            Some(rectangle) => self.normalizer.normalize(frame, rectangle).map(Some),
            None => Ok(None),
        }
    }
}

fn largest_rectangle(rectangles: Vec<Rectangle>) -> Option<Rectangle> {
    rectangles.into_iter().max_by_key(Rectangle::area)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct FixedDetector(Vec<Rectangle>);

    impl Detector for FixedDetector {
        fn find_faces(&self, _frame: &Frame) -> Vec<Rectangle> {
            self.0.clone()
        }
    }

    struct EchoNormalizer;

    impl Normalizer for EchoNormalizer {
        fn normalize(&self, _frame: &Frame, rectangle: Rectangle) -> Result<NormalizedFrame> {
            Ok(NormalizedFrame {
                data: vec![rectangle.width as u8],
            })
        }
    }

    fn blank_frame() -> Frame {
        Frame::new(64, 48, vec![0; 64 * 48])
    }

    #[test]
    fn no_faces_means_no_chip() {
        let pipeline = FaceNormalizer::new(Arc::new(FixedDetector(vec![])), Arc::new(EchoNormalizer));
        assert_eq!(pipeline.normalize(&blank_frame()).unwrap(), None);
    }

    #[test]
    fn largest_face_wins() {
        let pipeline = FaceNormalizer::new(
            Arc::new(FixedDetector(vec![
                Rectangle::new(0, 0, 10, 10),
                Rectangle::new(0, 0, 30, 30),
                Rectangle::new(0, 0, 20, 20),
            ])),
            Arc::new(EchoNormalizer),
        );
        let chip = pipeline.normalize(&blank_frame()).unwrap().unwrap();
        assert_eq!(chip.data, vec![30]);
    }
}
