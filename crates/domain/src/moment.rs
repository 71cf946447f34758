use serde::{Deserialize, Serialize};

/// A `[start, end]` interval the relevance analyzer deems worth
/// visualizing with keyframes, along with a short reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelevantMoment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub reason: String,
    /// Set by an analyzer that wants this moment kept even though it's
    /// shorter than `min_span_sec` — an explicit override of the usual
    /// minimum-span trim in `normalize_moments`.
    #[serde(default)]
    pub keep_even_if_short: bool,
}

impl RelevantMoment {
    pub fn new(start_sec: f64, end_sec: f64, reason: impl Into<String>) -> Self {
        Self {
            start_sec,
            end_sec,
            reason: reason.into(),
            keep_even_if_short: false,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// Sort, clamp to `[0, duration]`, drop spans shorter than `min_span_sec`,
/// and merge moments whose gap is smaller than `merge_gap_sec`. If nothing
/// survives, callers are expected to fall back to a single whole-video
/// moment — that fallback is the orchestrator's call, not this function's,
/// since an empty result here is itself meaningful information.
pub fn normalize_moments(
    moments: Vec<RelevantMoment>,
    duration_sec: f64,
    merge_gap_sec: f64,
    min_span_sec: f64,
) -> Vec<RelevantMoment> {
    let mut clamped: Vec<RelevantMoment> = moments
        .into_iter()
        .filter_map(|mut m| {
            m.start_sec = m.start_sec.max(0.0).min(duration_sec);
            m.end_sec = m.end_sec.max(0.0).min(duration_sec);
            if m.end_sec > m.start_sec {
                Some(m)
            } else {
                None
            }
        })
        .collect();

    clamped.sort_by(|a, b| a.start_sec.partial_cmp(&b.start_sec).unwrap());

    let mut merged: Vec<RelevantMoment> = Vec::with_capacity(clamped.len());
    for m in clamped.drain(..) {
        if let Some(prev) = merged.last_mut() {
            if m.start_sec - prev.end_sec < merge_gap_sec {
                prev.end_sec = prev.end_sec.max(m.end_sec);
                if !prev.reason.contains(&m.reason) {
                    prev.reason = format!("{}; {}", prev.reason, m.reason);
                }
                continue;
            }
        }
        merged.push(m);
    }

    merged.retain(|m| m.duration() >= min_span_sec || m.keep_even_if_short);
    merged
}

/// Frames requested per second of moment duration when allocating the
/// `max_keyframes` budget. Chosen so a 10s moment asks for one frame and
/// a 60s moment asks for six before the proportional cap trims it down.
/// Exposed so callers can halve it for the extract-keyframes retry.
pub const DEFAULT_DENSITY_PER_SEC: f64 = 0.1;

/// Turns a list of normalized moments into an ordered, deduplicated list
/// of timestamps to hand to a frame extractor, honoring the proportional
/// allocation and density halving described for the extract-keyframes
/// stage: each moment is entitled to `ceil(duration * density)` frames,
/// but the grand total is capped at `max_keyframes` and redistributed
/// proportionally to moment length when the naive request would exceed
/// it. Every moment that survives normalization gets at least one frame
/// when the budget allows it.
pub fn sample_keyframe_timestamps(
    moments: &[RelevantMoment],
    max_keyframes: usize,
    density_per_sec: f64,
) -> Vec<f64> {
    if moments.is_empty() || max_keyframes == 0 {
        return Vec::new();
    }

    let total_duration: f64 = moments.iter().map(|m| m.duration()).sum();
    if total_duration <= 0.0 {
        return Vec::new();
    }

    let density = if density_per_sec > 0.0 {
        density_per_sec
    } else {
        DEFAULT_DENSITY_PER_SEC
    };

    let raw_requests: Vec<usize> = moments
        .iter()
        .map(|m| (m.duration() * density).ceil().max(1.0) as usize)
        .collect();
    let raw_total: usize = raw_requests.iter().sum();

    let allocations: Vec<usize> = if raw_total <= max_keyframes {
        raw_requests
    } else {
        moments
            .iter()
            .map(|m| {
                let share = (m.duration() / total_duration) * max_keyframes as f64;
                (share.floor() as usize).max(1)
            })
            .collect()
    };

    // Floor/ceil rounding above can over- or under-shoot the cap by a few
    // frames; trim from the largest allocations first, then top up from
    // the longest moments, so the final total never exceeds the budget.
    let mut allocations = allocations;
    let mut total: usize = allocations.iter().sum();
    while total > max_keyframes {
        let (idx, _) = allocations
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .unwrap();
        if allocations[idx] <= 1 {
            break;
        }
        allocations[idx] -= 1;
        total -= 1;
    }

    let mut timestamps = Vec::new();
    for (moment, count) in moments.iter().zip(allocations.iter()) {
        let count = *count;
        if count == 0 {
            continue;
        }
        let span = moment.duration();
        for i in 0..count {
            // Evenly spaced within the moment, centered in each sub-interval
            // so a single-frame allocation doesn't land exactly on the edge.
            let frac = (i as f64 + 0.5) / count as f64;
            timestamps.push(moment.start_sec + span * frac);
        }
    }

    timestamps.sort_by(|a, b| a.partial_cmp(b).unwrap());
    timestamps.truncate(max_keyframes);
    timestamps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_video_bounds() {
        let moments = vec![RelevantMoment::new(-5.0, 200.0, "whole")];
        let out = normalize_moments(moments, 100.0, 10.0, 5.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_sec, 0.0);
        assert_eq!(out[0].end_sec, 100.0);
    }

    #[test]
    fn merges_moments_within_gap() {
        let moments = vec![
            RelevantMoment::new(0.0, 10.0, "a"),
            RelevantMoment::new(15.0, 25.0, "b"), // gap of 5s < merge_gap 10s
        ];
        let out = normalize_moments(moments, 100.0, 10.0, 5.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_sec, 0.0);
        assert_eq!(out[0].end_sec, 25.0);
    }

    #[test]
    fn keeps_moments_beyond_gap_separate() {
        let moments = vec![
            RelevantMoment::new(0.0, 10.0, "a"),
            RelevantMoment::new(30.0, 40.0, "b"), // gap of 20s > merge_gap 10s
        ];
        let out = normalize_moments(moments, 100.0, 10.0, 5.0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn drops_sub_minimum_spans() {
        let moments = vec![RelevantMoment::new(0.0, 2.0, "blip")];
        let out = normalize_moments(moments, 100.0, 10.0, 5.0);
        assert!(out.is_empty());
    }

    #[test]
    fn keep_even_if_short_overrides_the_minimum_span_trim() {
        let mut moments = vec![RelevantMoment::new(0.0, 2.0, "blip")];
        moments[0].keep_even_if_short = true;
        let out = normalize_moments(moments, 100.0, 10.0, 5.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].reason, "blip");
    }

    #[test]
    fn output_is_sorted_even_if_input_is_not() {
        let moments = vec![
            RelevantMoment::new(50.0, 60.0, "late"),
            RelevantMoment::new(0.0, 10.0, "early"),
        ];
        let out = normalize_moments(moments, 100.0, 1.0, 5.0);
        assert_eq!(out[0].reason, "early");
        assert_eq!(out[1].reason, "late");
    }

    #[test]
    fn sampling_respects_global_cap_across_moments() {
        let moments = vec![
            RelevantMoment::new(0.0, 100.0, "a"),
            RelevantMoment::new(200.0, 300.0, "b"),
        ];
        let ts = sample_keyframe_timestamps(&moments, 5, 0.1);
        assert!(ts.len() <= 5);
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn sampling_allocates_proportionally_to_duration() {
        let moments = vec![
            RelevantMoment::new(0.0, 10.0, "short"),
            RelevantMoment::new(20.0, 120.0, "long"),
        ];
        let ts = sample_keyframe_timestamps(&moments, 10, 0.1);
        let short_count = ts.iter().filter(|&&t| t < 10.0).count();
        let long_count = ts.iter().filter(|&&t| t >= 20.0).count();
        assert!(long_count > short_count);
    }

    #[test]
    fn every_surviving_moment_gets_at_least_one_frame_when_budget_allows() {
        let moments = vec![
            RelevantMoment::new(0.0, 5.0, "a"),
            RelevantMoment::new(10.0, 15.0, "b"),
            RelevantMoment::new(20.0, 25.0, "c"),
        ];
        let ts = sample_keyframe_timestamps(&moments, 3, 0.1);
        assert_eq!(ts.len(), 3);
    }

    #[test]
    fn empty_moments_yield_no_timestamps() {
        assert!(sample_keyframe_timestamps(&[], 10, 0.1).is_empty());
    }

    #[test]
    fn zero_budget_yields_no_timestamps() {
        let moments = vec![RelevantMoment::new(0.0, 10.0, "a")];
        assert!(sample_keyframe_timestamps(&moments, 0, 0.1).is_empty());
    }
}
