//! Panel / module / fault correlation.
//!
//! Takes the three per-frame detection sets and assigns every module and
//! fault to the first panel whose box strictly contains its midpoint. The
//! panel scan order is the canonical (sorted) panel order, which makes the
//! tie-break deterministic when panel boxes overlap.

use crate::correlate::DetectionSet;
use crate::detect::Detection;

/// One panel detection plus the module and fault detections whose midpoints
/// fall inside it. Rebuilt fresh per frame; panels carry no identity across
/// frames.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelRecord {
    pub panel: Detection,
    pub contained_modules: DetectionSet,
    pub contained_faults: DetectionSet,
}

impl PanelRecord {
    fn new(panel: Detection) -> Self {
        Self {
            panel,
            contained_modules: DetectionSet::empty(),
            contained_faults: DetectionSet::empty(),
        }
    }

    pub fn is_defective(&self) -> bool {
        !self.contained_faults.is_empty()
    }
}

/// Correlation result for one frame.
///
/// `panels` preserves the panel set's canonical order — it is the iteration
/// order for all downstream rendering. Uncorrelated detections are kept for
/// diagnostics only; they appear in no panel record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Correlation {
    pub panels: Vec<PanelRecord>,
    pub uncorrelated_modules: Vec<Detection>,
    pub uncorrelated_faults: Vec<Detection>,
}

impl Correlation {
    pub fn defective_panel_count(&self) -> usize {
        self.panels.iter().filter(|p| p.is_defective()).count()
    }

    pub fn uncorrelated_count(&self) -> usize {
        self.uncorrelated_modules.len() + self.uncorrelated_faults.len()
    }
}

/// Matches module and fault detections against panel detections.
pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Build the ordered panel records for one frame.
    ///
    /// The output length always equals the panel count — a panel containing
    /// nothing is an intact panel, not an error.
    pub fn correlate(
        panels: &DetectionSet,
        modules: &DetectionSet,
        faults: &DetectionSet,
    ) -> Correlation {
        let mut records: Vec<PanelRecord> = panels
            .iter()
            .cloned()
            .map(PanelRecord::new)
            .collect();

        let uncorrelated_modules = assign_role(&mut records, modules, SubCollection::Modules);
        let uncorrelated_faults = assign_role(&mut records, faults, SubCollection::Faults);

        if !uncorrelated_modules.is_empty() || !uncorrelated_faults.is_empty() {
            log::debug!(
                "uncorrelated detections: {} modules, {} faults",
                uncorrelated_modules.len(),
                uncorrelated_faults.len()
            );
        }

        Correlation {
            panels: records,
            uncorrelated_modules,
            uncorrelated_faults,
        }
    }
}

/// Which per-panel sub-collection an assignment pass fills.
#[derive(Clone, Copy)]
enum SubCollection {
    Modules,
    Faults,
}

/// One assignment pass for one detector role.
///
/// Scans panel records in canonical order and stops at the first panel whose
/// box strictly contains the detection midpoint. Returns the detections no
/// panel contained.
fn assign_role(
    records: &mut [PanelRecord],
    detections: &DetectionSet,
    target: SubCollection,
) -> Vec<Detection> {
    let mut uncorrelated = Vec::new();

    for detection in detections {
        let (mx, my) = detection.rect.midpoint();
        let home = records
            .iter_mut()
            .find(|rec| rec.panel.rect.contains_point(mx, my));
        match home {
            Some(rec) => {
                let subset = match target {
                    SubCollection::Modules => &mut rec.contained_modules,
                    SubCollection::Faults => &mut rec.contained_faults,
                };
                subset.push(detection.clone());
            }
            None => uncorrelated.push(detection.clone()),
        }
    }

    uncorrelated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(Rect::new(x1, y1, x2, y2).unwrap(), 0.9, 0)
    }

    fn set(detections: Vec<Detection>) -> DetectionSet {
        DetectionSet::from_raw(detections)
    }

    #[test]
    fn module_lands_in_containing_panel() {
        let corr = CorrelationEngine::correlate(
            &set(vec![det(0.0, 0.0, 100.0, 100.0)]),
            &set(vec![det(10.0, 10.0, 20.0, 20.0)]),
            &set(vec![]),
        );

        assert_eq!(corr.panels.len(), 1);
        assert_eq!(corr.panels[0].contained_modules.len(), 1);
        assert!(corr.panels[0].contained_faults.is_empty());
        assert!(!corr.panels[0].is_defective());
        assert_eq!(corr.uncorrelated_count(), 0);
    }

    #[test]
    fn overlapping_panels_first_match_wins() {
        // Both panels contain the module midpoint (25, 25); the first panel
        // in canonical order must win.
        let corr = CorrelationEngine::correlate(
            &set(vec![
                det(10.0, 10.0, 60.0, 60.0),
                det(0.0, 0.0, 50.0, 50.0),
            ]),
            &set(vec![det(20.0, 20.0, 30.0, 30.0)]),
            &set(vec![]),
        );

        // Canonical order sorts (0,0,50,50) first.
        assert_eq!(corr.panels[0].panel.rect.x1, 0.0);
        assert_eq!(corr.panels[0].contained_modules.len(), 1);
        assert_eq!(corr.panels[1].contained_modules.len(), 0);
    }

    #[test]
    fn midpoint_on_panel_edge_is_uncorrelated() {
        // Fault (90,40,110,60) has midpoint (100, 50), exactly on the panel's
        // right edge. Strict containment excludes it.
        let corr = CorrelationEngine::correlate(
            &set(vec![det(0.0, 0.0, 100.0, 100.0)]),
            &set(vec![]),
            &set(vec![det(90.0, 40.0, 110.0, 60.0)]),
        );

        assert!(corr.panels[0].contained_faults.is_empty());
        assert_eq!(corr.uncorrelated_faults.len(), 1);
    }

    #[test]
    fn fault_inside_panel_marks_it_defective() {
        let corr = CorrelationEngine::correlate(
            &set(vec![det(0.0, 0.0, 100.0, 100.0)]),
            &set(vec![]),
            &set(vec![det(40.0, 40.0, 60.0, 60.0)]),
        );

        assert_eq!(corr.panels[0].contained_faults.len(), 1);
        assert!(corr.panels[0].is_defective());
        assert_eq!(corr.defective_panel_count(), 1);
    }

    #[test]
    fn empty_panel_set_leaves_everything_uncorrelated() {
        let corr = CorrelationEngine::correlate(
            &set(vec![]),
            &set(vec![det(10.0, 10.0, 20.0, 20.0)]),
            &set(vec![det(40.0, 40.0, 60.0, 60.0)]),
        );

        assert!(corr.panels.is_empty());
        assert_eq!(corr.uncorrelated_modules.len(), 1);
        assert_eq!(corr.uncorrelated_faults.len(), 1);
    }

    #[test]
    fn contained_sets_preserve_source_order() {
        let corr = CorrelationEngine::correlate(
            &set(vec![det(0.0, 0.0, 100.0, 100.0)]),
            &set(vec![
                det(30.0, 30.0, 40.0, 40.0),
                det(10.0, 10.0, 20.0, 20.0),
                det(50.0, 50.0, 60.0, 60.0),
            ]),
            &set(vec![]),
        );

        let xs: Vec<f32> = corr.panels[0]
            .contained_modules
            .iter()
            .map(|d| d.rect.x1)
            .collect();
        assert_eq!(xs, vec![10.0, 30.0, 50.0]);
    }

    #[test]
    fn each_detection_lands_in_at_most_one_panel() {
        let corr = CorrelationEngine::correlate(
            &set(vec![
                det(0.0, 0.0, 50.0, 50.0),
                det(40.0, 0.0, 100.0, 50.0),
            ]),
            &set(vec![det(42.0, 10.0, 48.0, 20.0)]),
            &set(vec![]),
        );

        let assigned: usize = corr
            .panels
            .iter()
            .map(|p| p.contained_modules.len())
            .sum();
        assert_eq!(assigned + corr.uncorrelated_modules.len(), 1);
        assert_eq!(assigned, 1);
    }
}
