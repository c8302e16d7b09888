use tracing::{debug, warn};

use crate::core::config::{CharacterSet, CorrectionTable, NormalizeOptions};
use crate::core::model::Detection;

pub fn normalize(detections: &[Detection], opts: &NormalizeOptions) -> Vec<Detection> {
    if detections.is_empty() {
        return Vec::new();
    }
    let results = drop_malformed(detections);
    let results = filter_by_confidence(results, opts.min_confidence);
    let results = filter_by_length(results, opts.min_length, opts.max_length);
    let results = filter_by_chars(results, &opts.allowed_characters);
    if opts.enable_correction {
        correct_characters(results, &opts.correction_table)
    } else {
        results
    }
}

fn drop_malformed(detections: &[Detection]) -> Vec<Detection> {
    let mut valid = Vec::with_capacity(detections.len());
    for detection in detections {
        if detection.confidence.is_nan() {
            warn!(text = %detection.text, "dropping detection with NaN confidence");
            continue;
        }
        if detection.bbox.is_degenerate() {
            warn!(text = %detection.text, "dropping detection with degenerate bbox");
            continue;
        }
        let mut detection = detection.clone();
        if !(0.0..=1.0).contains(&detection.confidence) {
            warn!(
                text = %detection.text,
                confidence = detection.confidence,
                "clamping out-of-range confidence"
            );
            detection.confidence = detection.confidence.clamp(0.0, 1.0);
        }
        valid.push(detection);
    }
    valid
}

fn filter_by_confidence(detections: Vec<Detection>, min_confidence: f32) -> Vec<Detection> {
    let before = detections.len();
    let kept: Vec<Detection> = detections
        .into_iter()
        .filter(|d| d.confidence >= min_confidence)
        .collect();
    debug!(before, after = kept.len(), "confidence filter");
    kept
}

fn filter_by_length(detections: Vec<Detection>, min_length: usize, max_length: usize) -> Vec<Detection> {
    let before = detections.len();
    let kept: Vec<Detection> = detections
        .into_iter()
        .filter(|d| {
            let length = d.text.trim().chars().count();
            (min_length..=max_length).contains(&length)
        })
        .collect();
    debug!(before, after = kept.len(), "length filter");
    kept
}

fn filter_by_chars(detections: Vec<Detection>, allowed: &CharacterSet) -> Vec<Detection> {
    let before = detections.len();
    let mut kept = Vec::with_capacity(detections.len());
    for mut detection in detections {
        let filtered: String = detection.text.chars().filter(|c| allowed.contains(*c)).collect();
        if filtered.is_empty() {
            debug!(text = %detection.text, "dropping detection with no allowed characters");
            continue;
        }
        if filtered != detection.text {
            debug!(from = %detection.text, to = %filtered, "stripped disallowed characters");
            detection.text = filtered;
        }
        kept.push(detection);
    }
    debug!(before, after = kept.len(), "character filter");
    kept
}

fn correct_characters(detections: Vec<Detection>, table: &CorrectionTable) -> Vec<Detection> {
    if table.is_empty() {
        return detections;
    }
    detections
        .into_iter()
        .map(|mut detection| {
            let corrected = apply_corrections(&detection.text, table);
            if corrected != detection.text {
                debug!(from = %detection.text, to = %corrected, "character correction");
                detection.text = corrected;
            }
            detection
        })
        .collect()
}

// Substitutions only apply where the code layout expects a digit: the tail
// of a letter-prefixed code, or a character sitting between two digits.
pub fn apply_corrections(text: &str, table: &CorrectionTable) -> String {
    let chars: Vec<char> = text.chars().collect();
    if let Some(prefix_len) = code_prefix_len(&chars) {
        let mut out = chars;
        for c in out.iter_mut().skip(prefix_len) {
            if let Some(substitute) = table.substitute(*c) {
                *c = substitute;
            }
        }
        return out.into_iter().collect();
    }
    if is_upper_alnum_code(&chars) {
        let mut out = chars.clone();
        for i in 1..chars.len().saturating_sub(1) {
            if chars[i - 1].is_ascii_digit() && chars[i + 1].is_ascii_digit() {
                if let Some(substitute) = table.substitute(chars[i]) {
                    out[i] = substitute;
                }
            }
        }
        return out.into_iter().collect();
    }
    text.to_string()
}

fn code_prefix_len(chars: &[char]) -> Option<usize> {
    if chars.len() < 7 {
        return None;
    }
    if !chars[..2].iter().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    if chars[2..].iter().all(|c| c.is_ascii_alphanumeric()) {
        Some(2)
    } else {
        None
    }
}

fn is_upper_alnum_code(chars: &[char]) -> bool {
    chars.len() >= 3
        && chars
            .iter()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
