use anyhow::Result;
use image::RgbImage;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectorRole};
use crate::geometry::Rect;

/// Stub backend for tests and `stub://` sources.
///
/// Either replays a canned detection list, or derives a deterministic layout
/// from the frame content: the same frame always yields the same boxes, so
/// pipeline output stays reproducible without model weights.
pub struct StubBackend {
    name: &'static str,
    role: DetectorRole,
    canned: Option<Vec<Detection>>,
}

impl StubBackend {
    /// Deterministic synthetic detections for `role`.
    pub fn for_role(role: DetectorRole) -> Self {
        Self {
            name: "stub",
            role,
            canned: None,
        }
    }

    /// Replay the same detections on every frame.
    pub fn fixed(role: DetectorRole, detections: Vec<Detection>) -> Self {
        Self {
            name: "stub-fixed",
            role,
            canned: Some(detections),
        }
    }

    fn synthesize(&self, image: &RgbImage) -> Vec<Detection> {
        let digest: [u8; 32] = Sha256::digest(image.as_raw()).into();
        let (w, h) = (image.width() as f32, image.height() as f32);
        // Two side-by-side "panels" with a small margin; modules quarter each
        // panel; a fault lands in the left panel on roughly half of frames.
        let margin_x = w * 0.05;
        let margin_y = h * 0.1;
        let mid = w / 2.0;
        let panels = [
            rect(margin_x, margin_y, mid - margin_x, h - margin_y),
            rect(mid + margin_x, margin_y, w - margin_x, h - margin_y),
        ];
        let score = |byte: u8| 0.5 + (byte as f32 / 255.0) * 0.49;

        match self.role {
            DetectorRole::Panel => panels
                .iter()
                .zip(digest)
                .map(|(r, b)| Detection::new(*r, score(b), 0))
                .collect(),
            DetectorRole::Module => panels
                .iter()
                .flat_map(|p| {
                    let (cx, cy) = p.midpoint();
                    [
                        rect(p.x1 + 1.0, p.y1 + 1.0, cx - 1.0, cy - 1.0),
                        rect(cx + 1.0, p.y1 + 1.0, p.x2 - 1.0, cy - 1.0),
                        rect(p.x1 + 1.0, cy + 1.0, cx - 1.0, p.y2 - 1.0),
                        rect(cx + 1.0, cy + 1.0, p.x2 - 1.0, p.y2 - 1.0),
                    ]
                })
                .zip(digest)
                .map(|(r, b)| Detection::new(r, score(b), 0))
                .collect(),
            DetectorRole::Fault => {
                if digest[0] % 2 == 0 {
                    let p = panels[0];
                    let (cx, cy) = p.midpoint();
                    let fault = rect(cx - w * 0.04, cy - h * 0.04, cx + w * 0.04, cy + h * 0.04);
                    vec![Detection::new(fault, score(digest[1]), 0)]
                } else {
                    vec![]
                }
            }
        }
    }
}

fn rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Rect {
    // Clamped so the layout stays ordered and non-negative at any frame size.
    let x1 = x1.max(0.0);
    let y1 = y1.max(0.0);
    Rect {
        x1,
        y1,
        x2: x2.max(x1),
        y2: y2.max(y1),
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        match &self.canned {
            Some(detections) => Ok(detections.clone()),
            None => Ok(self.synthesize(image)),
        }
    }
}
