use crate::ChunkWindow;

/// Smallest accepted window length; shorter requests are coerced up.
pub const MIN_WINDOW_SECS: u64 = 10;

/// Divide `[0, total_ms)` into fixed-length windows.
///
/// `window_ms = max(10, window_secs) * 1000`; count is
/// `ceil(total_ms / window_ms)`; the final window is clipped to `total_ms`.
pub fn plan_windows(total_ms: u64, window_secs: u64) -> Vec<ChunkWindow> {
    let window_ms = window_secs.max(MIN_WINDOW_SECS) * 1000;
    let count = total_ms.div_ceil(window_ms) as usize;

    (0..count)
        .map(|index| {
            let start_ms = index as u64 * window_ms;
            let end_ms = (start_ms + window_ms).min(total_ms);
            ChunkWindow {
                index,
                start_ms,
                end_ms,
            }
        })
        .collect()
}

/// `HH:MM:SS` for a millisecond offset.
pub fn format_clock(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// The human-readable time-range label prefixed to each segment.
pub fn format_range_label(window: &ChunkWindow) -> String {
    format!(
        "[{} → {}]",
        format_clock(window.start_ms),
        format_clock(window.end_ms)
    )
}
