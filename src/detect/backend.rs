use anyhow::Result;
use image::RgbImage;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// Implementations run one model over one frame and return NMS-filtered
/// detections in the frame's pixel space. The pipeline owns one backend per
/// role (panel, fault, module) and invokes them strictly sequentially, so
/// `infer` may hold mutable per-call scratch state without locking.
pub trait DetectorBackend: Send {
    /// Backend identifier, used in logs and the run summary.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Coordinates must already be scaled to the input image; confidence and
    /// IoU filtering are the implementation's concern, not the caller's.
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
