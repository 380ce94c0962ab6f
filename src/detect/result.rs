use serde::Serialize;

use crate::geometry::Rect;

/// One detector output: a bounding box, confidence score, and class id.
///
/// Boxes arrive already NMS-filtered and in the pixel space of the frame the
/// detector ran on. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub rect: Rect,
    /// Confidence in `[0, 1]`.
    pub score: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn new(rect: Rect, score: f32, class_id: u32) -> Self {
        Self {
            rect,
            score,
            class_id,
        }
    }
}

/// Which of the three detectors produced a set of boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorRole {
    /// Full panel arrays.
    Panel,
    /// Individual sub-modules inside a panel.
    Module,
    /// Faults / thermal anomalies.
    Fault,
}

impl DetectorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorRole::Panel => "panel",
            DetectorRole::Module => "module",
            DetectorRole::Fault => "fault",
        }
    }
}

/// Class-name lookup for one detector role.
///
/// Falls back to `class <id>` when a model ships more classes than the
/// configured name list.
#[derive(Clone, Debug, Default)]
pub struct ClassNames(Vec<String>);

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn name(&self, class_id: u32) -> String {
        self.0
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class {class_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_fall_back_to_numeric_label() {
        let names = ClassNames::new(vec!["panel".into()]);
        assert_eq!(names.name(0), "panel");
        assert_eq!(names.name(7), "class 7");
    }
}
