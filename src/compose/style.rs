use image::Rgb;

/// Layer palette and stroke widths.
///
/// Colors mirror the reference annotation scheme (OpenCV BGR constants
/// converted to RGB): panels green, modules blue, defective-panel fill red,
/// fault boxes cyan, confidence labels blue.
#[derive(Clone, Copy, Debug)]
pub struct LayerStyle {
    pub panel_color: Rgb<u8>,
    pub module_color: Rgb<u8>,
    pub defect_fill_color: Rgb<u8>,
    pub fault_color: Rgb<u8>,
    pub label_color: Rgb<u8>,
    pub panel_thickness: u32,
    pub module_thickness: u32,
    pub fault_thickness: u32,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            panel_color: Rgb([0, 255, 0]),
            module_color: Rgb([0, 0, 255]),
            defect_fill_color: Rgb([255, 0, 0]),
            fault_color: Rgb([0, 255, 255]),
            label_color: Rgb([0, 0, 255]),
            panel_thickness: 5,
            module_thickness: 2,
            fault_thickness: 5,
        }
    }
}

impl LayerStyle {
    pub fn with_line_thickness(mut self, thickness: u32) -> Self {
        self.panel_thickness = thickness;
        self.fault_thickness = thickness;
        self
    }
}
