use crate::foundation::error::ReelResult;

/// Greedily wrap `text` into lines no wider than `max_width`.
///
/// Words are split on whitespace and never broken; a single word whose
/// measured width alone exceeds `max_width` occupies its own line. `measure`
/// returns the rendered width in pixels of a candidate line.
///
/// Parley's own line breaker splits over-long words mid-word, which the
/// caption contract forbids, so wrapping happens here and the shaper only
/// ever sees single lines.
pub fn wrap_caption(
    text: &str,
    max_width: f32,
    measure: &mut dyn FnMut(&str) -> ReelResult<f32>,
) -> ReelResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            // A lone word always gets a line, even when it overflows.
            current.push_str(word);
            continue;
        }

        let candidate_len = current.len() + 1 + word.len();
        let mut candidate = String::with_capacity(candidate_len);
        candidate.push_str(&current);
        candidate.push(' ');
        candidate.push_str(word);

        if measure(&candidate)? <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    Ok(lines)
}
