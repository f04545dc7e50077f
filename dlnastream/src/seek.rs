//! Start-position math for `/stream/{id}`, per §4.5's "Start position".

use dlnautil::ONE_SECOND_TICKS;

/// Bitrate assumption used to turn a byte offset into a tick estimate when
/// no other information is available: 8 Mbit/s.
const ESTIMATED_BITRATE_BPS: i64 = 8_000_000;
const SEEK_RANGE_THRESHOLD_BYTES: i64 = 1024 * 1024;
const RESUME_MIN_TICKS: i64 = 2 * 60 * ONE_SECOND_TICKS;
const RESUME_TIE_BREAK_TICKS: i64 = 60 * ONE_SECOND_TICKS;

/// Parses a `Range: bytes=N-...` header value, returning the starting byte
/// offset `N`. A malformed or absent range is ignored per §7, not an error.
fn range_start_byte(range_header: Option<&str>) -> Option<i64> {
    let value = range_header?;
    let spec = value.strip_prefix("bytes=")?;
    let start = spec.split('-').next()?;
    start.trim().parse::<i64>().ok()
}

/// Computes the position to start streaming from, combining a range-based
/// seek estimate with the upstream resume position, per §4.5.
///
/// `total_ticks` and `total_bytes` are the item's known duration and an
/// estimate of its encoded size; both zero means the computation can't
/// reason about proportion and falls back to 0 (or the raw resume ticks).
pub fn compute_start_position(
    range_header: Option<&str>,
    total_ticks: i64,
    resume_position_ticks: i64,
    already_played: bool,
) -> i64 {
    let range_seek_ticks = range_start_byte(range_header).and_then(|start_byte| {
        (start_byte > SEEK_RANGE_THRESHOLD_BYTES && total_ticks > 0).then(|| {
            let estimated_total_bytes = estimated_total_bytes(total_ticks);
            let fraction = (start_byte as f64 / estimated_total_bytes as f64).min(1.0);
            (total_ticks as f64 * fraction) as i64
        })
    });

    let resume_is_eligible = !already_played && resume_position_ticks > RESUME_MIN_TICKS;

    match (range_seek_ticks, resume_is_eligible) {
        (Some(seek_ticks), true) => {
            if (seek_ticks - resume_position_ticks).abs() > RESUME_TIE_BREAK_TICKS {
                seek_ticks
            } else {
                resume_position_ticks
            }
        }
        (Some(seek_ticks), false) => seek_ticks,
        (None, true) => resume_position_ticks,
        (None, false) => 0,
    }
}

fn estimated_total_bytes(total_ticks: i64) -> i64 {
    let duration_seconds = total_ticks as f64 / ONE_SECOND_TICKS as f64;
    ((duration_seconds * ESTIMATED_BITRATE_BPS as f64) / 8.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_HOUR_TICKS: i64 = 60 * 60 * ONE_SECOND_TICKS;

    #[test]
    fn no_range_and_no_resume_starts_at_zero() {
        assert_eq!(compute_start_position(None, ONE_HOUR_TICKS, 0, false), 0);
    }

    #[test]
    fn small_range_offset_is_not_treated_as_a_seek() {
        assert_eq!(
            compute_start_position(Some("bytes=512-"), ONE_HOUR_TICKS, 0, false),
            0
        );
    }

    #[test]
    fn large_range_offset_computes_a_proportional_seek() {
        let estimated_total = estimated_total_bytes(ONE_HOUR_TICKS);
        let start_byte = estimated_total / 2;
        let position = compute_start_position(
            Some(&format!("bytes={start_byte}-")),
            ONE_HOUR_TICKS,
            0,
            false,
        );
        let expected = ONE_HOUR_TICKS / 2;
        assert!((position - expected).abs() < ONE_SECOND_TICKS * 2);
    }

    #[test]
    fn resume_position_wins_when_no_range_seek_present() {
        let resume = 10 * 60 * ONE_SECOND_TICKS;
        assert_eq!(compute_start_position(None, ONE_HOUR_TICKS, resume, false), resume);
    }

    #[test]
    fn already_played_items_ignore_resume_position() {
        let resume = 10 * 60 * ONE_SECOND_TICKS;
        assert_eq!(compute_start_position(None, ONE_HOUR_TICKS, resume, true), 0);
    }

    #[test]
    fn resume_under_two_minutes_is_not_eligible() {
        let resume = 90 * ONE_SECOND_TICKS;
        assert_eq!(compute_start_position(None, ONE_HOUR_TICKS, resume, false), 0);
    }

    #[test]
    fn range_seek_close_to_resume_prefers_resume() {
        let resume = 30 * 60 * ONE_SECOND_TICKS;
        let estimated_total = estimated_total_bytes(ONE_HOUR_TICKS);
        let start_byte = (estimated_total as f64 * 0.5) as i64; // ~30 min
        let position = compute_start_position(
            Some(&format!("bytes={start_byte}-")),
            ONE_HOUR_TICKS,
            resume,
            false,
        );
        assert_eq!(position, resume);
    }

    #[test]
    fn range_seek_far_from_resume_wins_over_resume() {
        let resume = 5 * 60 * ONE_SECOND_TICKS;
        let estimated_total = estimated_total_bytes(ONE_HOUR_TICKS);
        let start_byte = (estimated_total as f64 * 0.8) as i64; // ~48 min
        let position = compute_start_position(
            Some(&format!("bytes={start_byte}-")),
            ONE_HOUR_TICKS,
            resume,
            false,
        );
        assert!(position > resume);
    }

    #[test]
    fn malformed_range_header_is_ignored() {
        assert_eq!(
            compute_start_position(Some("not-a-range"), ONE_HOUR_TICKS, 0, false),
            0
        );
    }
}
