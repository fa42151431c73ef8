//! Typed error taxonomy.
//!
//! Two families live in one enum: hardware faults, which a caller can
//! retry/report/sleep-and-recover from, and programmer errors, which signal
//! a bug in the caller and should not be swallowed.

/// The single error type returned by every fallible ChromaWave operation.
#[derive(Debug, thiserror::Error)]
pub enum ChromaError {
    // ---- hardware faults (recoverable) ----
    #[error("operation attempted on closed device {model}")]
    DeviceClosed { model: String },

    #[error("HAL init failed for {model}: {reason}")]
    InitError { model: String, reason: String },

    #[error("busy-wait on {model} exceeded {timeout_ms}ms")]
    BusyTimeout { model: String, timeout_ms: u32 },

    #[error("SPI transfer failed on {model}: {reason}")]
    SpiError { model: String, reason: String },

    #[error("busy-wait on {model} was cancelled")]
    Cancelled { model: String },

    // ---- programmer errors (fail loudly) ----
    #[error("unknown model {requested:?}{}", suggestion_suffix(.suggestions))]
    ModelNotFound {
        requested: String,
        suggestions: Vec<String>,
    },

    #[error("framebuffer format {actual} does not match display format {expected}")]
    FormatMismatch { expected: String, actual: String },

    #[error("invalid dimension {width}x{height} (must be in (0, 4096] on each axis)")]
    InvalidDimension { width: i64, height: i64 },

    #[error("target framebuffer is {actual_w}x{actual_h}, expected {expected_w}x{expected_h}")]
    DimensionMismatch {
        expected_w: u16,
        expected_h: u16,
        actual_w: u16,
        actual_h: u16,
    },

    #[error("palette {format} has no entry named {name:?}")]
    UnknownPaletteEntry { format: String, name: String },

    #[error("palette index {index} is out of range for {format} (len {len})")]
    PaletteIndexOutOfRange {
        format: String,
        index: usize,
        len: usize,
    },

    #[error("bytecode interpreter hit unknown opcode 0x{opcode:02X}")]
    BadBytecode { opcode: u8 },

    #[error("{operation} requires pixel format {required}, display is {actual}")]
    UnsupportedFormat {
        operation: String,
        required: String,
        actual: String,
    },
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

impl ChromaError {
    /// True for the hardware-fault family: the caller may retry,
    /// report, or sleep the device. False for programmer errors, which
    /// indicate a bug and should not be caught-and-ignored.
    pub fn is_hardware_fault(&self) -> bool {
        matches!(
            self,
            ChromaError::DeviceClosed { .. }
                | ChromaError::InitError { .. }
                | ChromaError::BusyTimeout { .. }
                | ChromaError::SpiError { .. }
                | ChromaError::Cancelled { .. }
        )
    }
}

/// Levenshtein edit distance, used by the model registry to offer
/// suggestions on an unknown model name.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut cur = vec![0usize; m + 1];
    for i in 1..=n {
        cur[0] = i;
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[m]
}

/// Top-N closest names by Levenshtein distance, used for `ModelNotFound`
/// suggestions. Ties broken by registry order (stable sort).
pub(crate) fn suggest(requested: &str, candidates: &[&str], max: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = candidates
        .iter()
        .map(|&c| (levenshtein(requested, c), c))
        .collect();
    scored.sort_by_key(|&(dist, _)| dist);
    scored
        .into_iter()
        .take(max)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_identical() {
        assert_eq!(levenshtein("epd_2in13_v4", "epd_2in13_v4"), 0);
    }

    #[test]
    fn levenshtein_substring() {
        // "epd_2in13" -> "epd_2in13_v4" needs 3 insertions
        assert_eq!(levenshtein("epd_2in13", "epd_2in13_v4"), 3);
    }

    #[test]
    fn suggest_picks_closest() {
        let candidates = ["epd_2in13_v4", "epd_2in13_v2", "epd_7in5_v2"];
        let s = suggest("epd_2in13", &candidates, 3);
        assert_eq!(s.len(), 3);
        assert!(s.contains(&"epd_2in13_v4".to_string()));
        assert!(s.contains(&"epd_2in13_v2".to_string()));
    }
}
