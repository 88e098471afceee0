//! Video duration probing via ffprobe

use std::path::Path;
use std::process::Command;

use log::warn;

/// External duration lookup, injected so tests can substitute a
/// deterministic implementation.
pub trait DurationProbe: Send + Sync {
    /// Duration of the file in fractional seconds, or None when the file
    /// cannot be probed. Never fails the caller.
    fn probe_seconds(&self, path: &Path) -> Option<f64>;
}

/// Probes through the `ffprobe` binary on PATH
pub struct Ffprobe;

impl DurationProbe for Ffprobe {
    fn probe_seconds(&self, path: &Path) -> Option<f64> {
        let output = Command::new("ffprobe")
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(path)
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("Could not run ffprobe for {}: {}", path.display(), e);
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.trim().parse::<f64>() {
            Ok(seconds) => Some(seconds),
            Err(_) => {
                warn!("ffprobe returned no duration for {}", path.display());
                None
            }
        }
    }
}

/// Formats fractional seconds as zero-padded `HH:MM:SS`. Fractions are
/// truncated, never rounded up.
pub fn duration_label(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Deterministic probe for tests
#[cfg(test)]
pub struct FixedProbe(pub Option<f64>);

#[cfg(test)]
impl DurationProbe for FixedProbe {
    fn probe_seconds(&self, _path: &Path) -> Option<f64> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_label_floors_fractional_seconds() {
        assert_eq!(duration_label(5425.7), "01:30:25");
        assert_eq!(duration_label(59.999), "00:00:59");
    }

    #[test]
    fn duration_label_handles_boundaries() {
        assert_eq!(duration_label(0.0), "00:00:00");
        assert_eq!(duration_label(3600.0), "01:00:00");
        assert_eq!(duration_label(90000.0), "25:00:00");
    }

    #[test]
    fn ffprobe_returns_none_for_non_media_input() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"definitely not a video").unwrap();

        // ffprobe either fails on the file or is missing entirely
        assert_eq!(Ffprobe.probe_seconds(tmp.path()), None);
    }
}
