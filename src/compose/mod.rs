//! Layered annotation rendering.
//!
//! Turns one frame's correlation result into three raster layers. Every
//! layer starts from an independent copy of the base frame, so drawing on
//! one can never bleed into another. Compositing is a pure function of the
//! base image and the correlation: the same inputs always produce
//! pixel-identical layers.

mod style;

pub use style::LayerStyle;

use image::RgbImage;

use crate::correlate::Correlation;
use crate::detect::ClassNames;
use crate::render::Renderer;

/// The three annotated layers for one frame, each the same size as the
/// source frame.
#[derive(Clone, Debug)]
pub struct FrameLayers {
    /// Every panel outlined — the "all panels located" view.
    pub panel_layer: RgbImage,
    /// Panels plus their contained sub-modules.
    pub module_layer: RgbImage,
    /// Defective panels filled, faults outlined and labelled with
    /// confidence. Intact panels are absent here.
    pub anomaly_layer: RgbImage,
}

/// Renders correlation results into [`FrameLayers`].
pub struct LayerCompositor<R: Renderer> {
    renderer: R,
    style: LayerStyle,
    panel_classes: ClassNames,
    show_scores: bool,
}

impl<R: Renderer> LayerCompositor<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            style: LayerStyle::default(),
            panel_classes: ClassNames::default(),
            show_scores: false,
        }
    }

    pub fn with_style(mut self, style: LayerStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_panel_classes(mut self, classes: ClassNames) -> Self {
        self.panel_classes = classes;
        self
    }

    /// Append the raw score to panel labels.
    pub fn with_show_scores(mut self, show: bool) -> Self {
        self.show_scores = show;
        self
    }

    pub fn compose(&self, base: &RgbImage, correlation: &Correlation) -> FrameLayers {
        FrameLayers {
            panel_layer: self.panel_layer(base, correlation),
            module_layer: self.module_layer(base, correlation),
            anomaly_layer: self.anomaly_layer(base, correlation),
        }
    }

    fn panel_layer(&self, base: &RgbImage, correlation: &Correlation) -> RgbImage {
        let mut layer = base.clone();
        for record in &correlation.panels {
            let panel = &record.panel;
            self.renderer.stroke_rect(
                &mut layer,
                &panel.rect,
                self.style.panel_color,
                self.style.panel_thickness,
            );
            let label = if self.show_scores {
                format!(
                    "{} {:.2}",
                    self.panel_classes.name(panel.class_id),
                    panel.score
                )
            } else {
                self.panel_classes.name(panel.class_id)
            };
            self.renderer.draw_label(
                &mut layer,
                label_anchor_above(panel.rect.x1, panel.rect.y1),
                &label,
                self.style.label_color,
            );
        }
        layer
    }

    fn module_layer(&self, base: &RgbImage, correlation: &Correlation) -> RgbImage {
        let mut layer = base.clone();
        for record in &correlation.panels {
            self.renderer.stroke_rect(
                &mut layer,
                &record.panel.rect,
                self.style.panel_color,
                self.style.panel_thickness,
            );
            for module in &record.contained_modules {
                self.renderer.stroke_rect(
                    &mut layer,
                    &module.rect,
                    self.style.module_color,
                    self.style.module_thickness,
                );
            }
        }
        layer
    }

    fn anomaly_layer(&self, base: &RgbImage, correlation: &Correlation) -> RgbImage {
        let mut layer = base.clone();
        for record in &correlation.panels {
            // Intact panels stay unmarked: only defects are called out.
            if !record.is_defective() {
                continue;
            }
            self.renderer.fill_rect(
                &mut layer,
                &record.panel.rect,
                self.style.defect_fill_color,
            );
            for fault in &record.contained_faults {
                self.renderer.stroke_rect(
                    &mut layer,
                    &fault.rect,
                    self.style.fault_color,
                    self.style.fault_thickness,
                );
                self.renderer.draw_label(
                    &mut layer,
                    (fault.rect.x1 as i32 - 30, fault.rect.y1 as i32 - 1),
                    &confidence_label(fault.score),
                    self.style.label_color,
                );
            }
        }
        layer
    }
}

/// Percentage label for a fault confidence: `round(score * 10000) / 100`,
/// always two decimals (`0.875` -> `"87.50%"`).
pub fn confidence_label(score: f32) -> String {
    format!("{:.2}%", (score as f64 * 10000.0).round() / 100.0)
}

fn label_anchor_above(x1: f32, y1: f32) -> (i32, i32) {
    (x1 as i32, y1 as i32 - 26)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use image::Rgb;

    use super::*;
    use crate::correlate::{CorrelationEngine, DetectionSet};
    use crate::detect::Detection;
    use crate::geometry::Rect;
    use crate::render::RasterRenderer;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Detection {
        Detection::new(Rect::new(x1, y1, x2, y2).unwrap(), score, 0)
    }

    fn correlate(
        panels: Vec<Detection>,
        modules: Vec<Detection>,
        faults: Vec<Detection>,
    ) -> Correlation {
        CorrelationEngine::correlate(
            &DetectionSet::from_raw(panels),
            &DetectionSet::from_raw(modules),
            &DetectionSet::from_raw(faults),
        )
    }

    fn base() -> RgbImage {
        RgbImage::from_pixel(200, 150, Rgb([20, 20, 20]))
    }

    /// Records draw calls instead of rasterizing, for asserting on label
    /// text and call structure.
    #[derive(Default)]
    struct RecordingRenderer {
        calls: RefCell<Vec<String>>,
    }

    impl Renderer for RecordingRenderer {
        fn stroke_rect(&self, _: &mut RgbImage, rect: &Rect, _: Rgb<u8>, thickness: u32) {
            self.calls
                .borrow_mut()
                .push(format!("stroke {},{} t{}", rect.x1, rect.y1, thickness));
        }

        fn fill_rect(&self, _: &mut RgbImage, rect: &Rect, _: Rgb<u8>) {
            self.calls
                .borrow_mut()
                .push(format!("fill {},{}", rect.x1, rect.y1));
        }

        fn draw_label(&self, _: &mut RgbImage, _: (i32, i32), text: &str, _: Rgb<u8>) {
            self.calls.borrow_mut().push(format!("label {text}"));
        }
    }

    #[test]
    fn confidence_label_rounds_to_two_decimals() {
        assert_eq!(confidence_label(0.875), "87.50%");
        assert_eq!(confidence_label(0.8765), "87.65%");
        assert_eq!(confidence_label(1.0), "100.00%");
        assert_eq!(confidence_label(0.0), "0.00%");
        // Rounds, never truncates.
        assert_eq!(confidence_label(0.87656), "87.66%");
    }

    #[test]
    fn clean_panel_leaves_anomaly_layer_untouched() {
        let corr = correlate(
            vec![det(0.0, 0.0, 100.0, 100.0, 0.9)],
            vec![det(10.0, 10.0, 20.0, 20.0, 0.8)],
            vec![],
        );
        let compositor = LayerCompositor::new(RasterRenderer::without_font());
        let layers = compositor.compose(&base(), &corr);

        assert_eq!(layers.anomaly_layer.as_raw(), base().as_raw());
        // Panel layer did change.
        assert_ne!(layers.panel_layer.as_raw(), base().as_raw());
    }

    #[test]
    fn defective_panel_is_filled_and_fault_labelled() {
        let corr = correlate(
            vec![det(0.0, 0.0, 100.0, 100.0, 0.9)],
            vec![],
            vec![det(40.0, 40.0, 60.0, 60.0, 0.875)],
        );
        let renderer = RecordingRenderer::default();
        let compositor = LayerCompositor::new(renderer);
        let _ = compositor.anomaly_layer(&base(), &corr);

        let calls = compositor.renderer.calls.borrow();
        assert_eq!(
            *calls,
            vec![
                "fill 0,0".to_string(),
                "stroke 40,40 t5".to_string(),
                "label 87.50%".to_string(),
            ]
        );
    }

    #[test]
    fn uncorrelated_modules_are_not_drawn() {
        // Module midpoint outside the panel: it must not appear on the
        // module layer, so the layer matches one with no modules at all.
        let with_stray = correlate(
            vec![det(0.0, 0.0, 100.0, 100.0, 0.9)],
            vec![det(150.0, 100.0, 180.0, 140.0, 0.8)],
            vec![],
        );
        let without = correlate(vec![det(0.0, 0.0, 100.0, 100.0, 0.9)], vec![], vec![]);

        let compositor = LayerCompositor::new(RasterRenderer::without_font());
        let stray_layer = compositor.compose(&base(), &with_stray).module_layer;
        let clean_layer = compositor.compose(&base(), &without).module_layer;

        assert_eq!(stray_layer.as_raw(), clean_layer.as_raw());
    }

    #[test]
    fn compositing_is_deterministic() {
        let corr = correlate(
            vec![det(0.0, 0.0, 100.0, 100.0, 0.9), det(110.0, 0.0, 190.0, 100.0, 0.9)],
            vec![det(10.0, 10.0, 20.0, 20.0, 0.8)],
            vec![det(40.0, 40.0, 60.0, 60.0, 0.7)],
        );
        let compositor = LayerCompositor::new(RasterRenderer::without_font());

        let first = compositor.compose(&base(), &corr);
        let second = compositor.compose(&base(), &corr);

        assert_eq!(first.panel_layer.as_raw(), second.panel_layer.as_raw());
        assert_eq!(first.module_layer.as_raw(), second.module_layer.as_raw());
        assert_eq!(first.anomaly_layer.as_raw(), second.anomaly_layer.as_raw());
    }

    #[test]
    fn layers_are_independent_copies() {
        let corr = correlate(
            vec![det(0.0, 0.0, 100.0, 100.0, 0.9)],
            vec![det(10.0, 10.0, 20.0, 20.0, 0.8)],
            vec![det(40.0, 40.0, 60.0, 60.0, 0.7)],
        );
        let compositor = LayerCompositor::new(RasterRenderer::without_font());
        let layers = compositor.compose(&base(), &corr);

        // The defect fill exists only on the anomaly layer; module strokes
        // only on the module layer.
        assert_eq!(*layers.anomaly_layer.get_pixel(50, 50), Rgb([255, 0, 0]));
        assert_ne!(*layers.panel_layer.get_pixel(50, 50), Rgb([255, 0, 0]));
        assert_eq!(*layers.module_layer.get_pixel(10, 15), Rgb([0, 0, 255]));
        assert_ne!(*layers.panel_layer.get_pixel(10, 15), Rgb([0, 0, 255]));
    }
}
