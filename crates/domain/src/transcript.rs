use serde::{Deserialize, Serialize};

/// One utterance from the speech-to-text stage.
///
/// Within a transcript, segments are sorted by `start_sec` and
/// non-overlapping (gaps between segments are allowed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

impl TranscriptSegment {
    pub fn new(start_sec: f64, end_sec: f64, text: impl Into<String>) -> Self {
        Self {
            start_sec,
            end_sec,
            text: text.into(),
            speaker: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// Sort segments and fix up any overlap an adapter produced: adjacent
/// segments with identical text are merged, and overlaps are split at
/// their midpoint. This is the normalization pass every STT adapter's
/// output is run through before it reaches the orchestrator.
pub fn normalize_segments(mut segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    segments.retain(|s| s.end_sec > s.start_sec);
    segments.sort_by(|a, b| a.start_sec.partial_cmp(&b.start_sec).unwrap());

    let mut out: Vec<TranscriptSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(prev) = out.last_mut() {
            if prev.text == seg.text && seg.start_sec <= prev.end_sec {
                // Identical adjacent text: merge into one span.
                prev.end_sec = prev.end_sec.max(seg.end_sec);
                continue;
            }
            if seg.start_sec < prev.end_sec {
                // Overlap: split at the midpoint so segments stay ordered
                // and non-overlapping.
                let mid = (prev.end_sec + seg.start_sec) / 2.0;
                let mid = mid.max(prev.start_sec).min(seg.end_sec);
                prev.end_sec = mid;
                let mut seg = seg;
                seg.start_sec = mid;
                if seg.end_sec > seg.start_sec {
                    out.push(seg);
                }
                continue;
            }
        }
        out.push(seg);
    }
    out
}
