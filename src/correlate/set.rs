use crate::detect::Detection;

/// Ordered output of one detector pass over one frame.
///
/// Sorted ascending by the lexicographic box key `(x1, y1, x2, y2)` so that
/// downstream iteration order is deterministic across runs; overlay rendering
/// order is visually observable, so this is a contract, not a nicety. The
/// sort is stable: near-identical boxes keep their detector-emission order.
/// No deduplication happens here — that is an NMS concern upstream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    /// Sort a raw detector pass into canonical order.
    pub fn from_raw(mut detections: Vec<Detection>) -> Self {
        detections.sort_by(|a, b| {
            let (ka, kb) = (a.rect.ord_key(), b.rect.ord_key());
            ka.iter()
                .zip(kb.iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { detections }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Used by the correlation engine to build per-panel subsets in
    /// assignment order. Assignment iterates a sorted set, so the subset
    /// stays sorted too.
    pub(crate) fn push(&mut self, detection: Detection) {
        self.detections.push(detection);
    }

    /// Restartable iteration; the same instance always yields the same order.
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}
