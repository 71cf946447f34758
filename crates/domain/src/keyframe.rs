use serde::{Deserialize, Serialize};

/// One still frame extracted from a relevant moment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    pub timestamp_sec: f64,
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub json_sidecar: Option<String>,
}

impl Keyframe {
    pub fn new(timestamp_sec: f64, path: impl Into<String>) -> Self {
        Self {
            timestamp_sec,
            path: path.into(),
            label: None,
            json_sidecar: None,
        }
    }
}

/// Builds the `frame_<n>_t<seconds>s.jpg` filename the FrameExtractor uses,
/// encoding the timestamp to millisecond precision so it round-trips.
pub fn frame_filename(index: usize, timestamp_sec: f64) -> String {
    format!("frame_{index}_t{}s.jpg", format_timestamp(timestamp_sec))
}

/// Formats a timestamp with millisecond precision, trimming a trailing
/// `.000` so whole-second frames keep a clean name.
fn format_timestamp(timestamp_sec: f64) -> String {
    let millis = (timestamp_sec * 1000.0).round() as i64;
    let whole = millis / 1000;
    let frac = millis % 1000;
    if frac == 0 {
        whole.to_string()
    } else {
        format!("{whole}.{frac:03}")
    }
}

/// Recovers the timestamp encoded in a `frame_<n>_t<seconds>s.jpg`-shaped
/// filename, used to verify the round-trip invariant and to recover
/// timestamps from filenames alone when a sidecar is missing.
pub fn parse_frame_timestamp(filename: &str) -> Option<f64> {
    let t_pos = filename.rfind('t')?;
    let rest = &filename[t_pos + 1..];
    let s_pos = rest.find('s')?;
    rest[..s_pos].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_second_filename_has_no_fraction() {
        let name = frame_filename(0, 12.0);
        assert_eq!(name, "frame_0_t12s.jpg");
    }

    #[test]
    fn fractional_second_filename_keeps_millis() {
        let name = frame_filename(3, 12.345);
        assert_eq!(name, "frame_3_t12.345s.jpg");
    }

    #[test]
    fn timestamp_round_trips_within_100ms() {
        for ts in [0.0, 1.2005, 59.999, 120.0, 3601.251] {
            let name = frame_filename(1, ts);
            let parsed = parse_frame_timestamp(&name).unwrap();
            assert!((parsed - ts).abs() < 0.1, "ts={ts} parsed={parsed}");
        }
    }

    #[test]
    fn parse_rejects_unrelated_filenames() {
        assert_eq!(parse_frame_timestamp("thumbnail.jpg"), None);
    }
}
