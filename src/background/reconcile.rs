//! Interval reconciliation.
//!
//! Spans whose clip failed to resolve are handed to a neighbouring resolved
//! clip: a run of absent segments is absorbed by the next resolved segment,
//! and a trailing run extends the last one. The output is contiguous, fully
//! resolved and covers the same span as the input.

use super::BackgroundSegment;
use crate::error::{ReelError, Result};
use crate::timeline::TimeInterval;
use tracing::debug;

/// Replace bounds that cannot be placed on the timeline.
///
/// A non-finite start becomes `cursor` (the end of the previous interval);
/// a non-finite or inverted end collapses onto the start.
fn normalize(interval: TimeInterval, cursor: f64) -> TimeInterval {
    let start = if interval.start.is_finite() {
        interval.start
    } else {
        cursor
    };
    let end = if interval.end.is_finite() && interval.end >= start {
        interval.end
    } else {
        start
    };
    TimeInterval::new(start, end)
}

/// Merge absent-URL segments into their resolved neighbours.
///
/// Pure and total: never fails, never reorders. When no segment resolved at
/// all the result is empty.
pub fn reconcile_intervals(segments: Vec<BackgroundSegment>) -> Vec<BackgroundSegment> {
    let input_len = segments.len();
    let mut merged: Vec<BackgroundSegment> = Vec::with_capacity(input_len);
    let mut pending: Option<TimeInterval> = None;
    let mut cursor = 0.0;

    for segment in segments {
        let interval = normalize(segment.interval, cursor);
        cursor = interval.end;

        let Some(url) = segment.video_url else {
            pending = Some(match pending {
                Some(run) => run.hull(&interval),
                None => interval,
            });
            continue;
        };

        let start = match (merged.last(), pending) {
            (Some(last), _) => last.interval.end,
            (None, Some(run)) => run.start.min(interval.start),
            (None, None) => interval.start,
        };
        let mut end = interval.end.max(start);
        if let Some(run) = pending.take() {
            end = end.max(run.end);
        }

        merged.push(BackgroundSegment::resolved(TimeInterval::new(start, end), url));
    }

    if let Some(run) = pending {
        if let Some(last) = merged.last_mut() {
            last.interval.end = last.interval.end.max(run.end);
        }
    }

    debug!(
        "Reconciled {} background segments into {}",
        input_len,
        merged.len()
    );
    merged
}

/// Whether every segment failed to resolve (including an empty list).
pub fn is_total_resolution_failure(segments: &[BackgroundSegment]) -> bool {
    segments.iter().all(|s| !s.is_resolved())
}

/// Check that intervals tile the timeline: well-formed, ordered, without
/// overlaps or uncovered time, and spanning `[0, audio_duration]` when a
/// duration is given. Comparisons allow `tolerance` seconds of slack.
pub fn validate_coverage(
    intervals: &[TimeInterval],
    audio_duration: Option<f64>,
    tolerance: f64,
) -> Result<()> {
    for (idx, interval) in intervals.iter().enumerate() {
        if !interval.is_well_formed() {
            return Err(ReelError::InvalidInput(format!(
                "interval {} {} is malformed",
                idx, interval
            )));
        }
    }

    for (idx, pair) in intervals.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start < prev.start {
            return Err(ReelError::InvalidInput(format!(
                "interval {} {} starts before interval {} {}",
                idx + 1,
                next,
                idx,
                prev
            )));
        }
        if next.start < prev.end - tolerance {
            return Err(ReelError::InvalidInput(format!(
                "interval {} {} overlaps interval {} {}",
                idx + 1,
                next,
                idx,
                prev
            )));
        }
        if next.start > prev.end + tolerance {
            return Err(ReelError::InvalidInput(format!(
                "uncovered time between {:.3}s and {:.3}s",
                prev.end, next.start
            )));
        }
    }

    if let Some(duration) = audio_duration {
        let (Some(first), Some(last)) = (intervals.first(), intervals.last()) else {
            if duration > tolerance {
                return Err(ReelError::InvalidInput(format!(
                    "no intervals cover the {:.3}s audio track",
                    duration
                )));
            }
            return Ok(());
        };
        if first.start > tolerance {
            return Err(ReelError::InvalidInput(format!(
                "uncovered time between 0.000s and {:.3}s",
                first.start
            )));
        }
        if (last.end - duration).abs() > tolerance {
            return Err(ReelError::InvalidInput(format!(
                "intervals end at {:.3}s but the audio track is {:.3}s long",
                last.end, duration
            )));
        }
    }

    Ok(())
}

/// [`validate_coverage`] over background segments.
pub fn validate_segments(
    segments: &[BackgroundSegment],
    audio_duration: Option<f64>,
    tolerance: f64,
) -> Result<()> {
    let intervals: Vec<TimeInterval> = segments.iter().map(|s| s.interval).collect();
    validate_coverage(&intervals, audio_duration, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, url: Option<&str>) -> BackgroundSegment {
        BackgroundSegment {
            interval: TimeInterval::new(start, end),
            video_url: url.map(str::to_string),
        }
    }

    fn assert_tiles(out: &[BackgroundSegment], start: f64, end: f64) {
        assert!(!out.is_empty());
        assert_eq!(out.first().unwrap().interval.start, start);
        assert_eq!(out.last().unwrap().interval.end, end);
        for pair in out.windows(2) {
            assert_eq!(pair[0].interval.end, pair[1].interval.start);
        }
        assert!(out.iter().all(|s| s.is_resolved()));
    }

    #[test]
    fn test_leading_and_trailing_runs() {
        let input = vec![
            seg(0.0, 5.0, None),
            seg(5.0, 10.0, Some("urlA")),
            seg(10.0, 12.0, None),
            seg(12.0, 15.0, None),
        ];

        let out = reconcile_intervals(input);

        assert_eq!(out, vec![seg(0.0, 15.0, Some("urlA"))]);
    }

    #[test]
    fn test_all_absent_is_empty() {
        let out = reconcile_intervals(vec![seg(0.0, 3.0, None)]);
        assert!(out.is_empty());
        assert!(reconcile_intervals(Vec::new()).is_empty());
    }

    #[test]
    fn test_interior_run_merges_forward() {
        let input = vec![
            seg(0.0, 4.0, Some("a")),
            seg(4.0, 6.0, None),
            seg(6.0, 7.0, None),
            seg(7.0, 10.0, Some("b")),
        ];

        let out = reconcile_intervals(input);

        assert_eq!(out, vec![seg(0.0, 4.0, Some("a")), seg(4.0, 10.0, Some("b"))]);
    }

    #[test]
    fn test_fully_resolved_is_unchanged() {
        let input = vec![
            seg(0.0, 2.5, Some("a")),
            seg(2.5, 2.5, Some("b")),
            seg(2.5, 9.0, Some("c")),
        ];
        assert_eq!(reconcile_intervals(input.clone()), input);
    }

    #[test]
    fn test_degenerate_absent_is_absorbed() {
        let input = vec![
            seg(0.0, 3.0, Some("a")),
            seg(3.0, 3.0, None),
            seg(3.0, 6.0, Some("b")),
            seg(6.0, 6.0, None),
        ];

        let out = reconcile_intervals(input);

        assert_eq!(out, vec![seg(0.0, 3.0, Some("a")), seg(3.0, 6.0, Some("b"))]);
    }

    #[test]
    fn test_gaps_and_overlaps_are_repaired() {
        let input = vec![
            seg(0.0, 4.0, Some("a")),
            seg(5.0, 8.0, Some("b")),
            seg(7.0, 12.0, Some("c")),
        ];

        let out = reconcile_intervals(input);

        assert_eq!(
            out,
            vec![
                seg(0.0, 4.0, Some("a")),
                seg(4.0, 8.0, Some("b")),
                seg(8.0, 12.0, Some("c")),
            ]
        );
    }

    #[test]
    fn test_malformed_bounds_are_normalized() {
        let input = vec![
            seg(0.0, 2.0, Some("a")),
            seg(f64::NAN, 4.0, None),
            seg(4.0, 3.0, Some("b")),
            seg(5.0, f64::INFINITY, None),
        ];

        let out = reconcile_intervals(input);

        assert_tiles(&out, 0.0, 5.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].video_url.as_deref(), Some("b"));
    }

    #[test]
    fn test_absent_run_longer_than_resolved_clip() {
        let input = vec![seg(0.0, 12.0, None), seg(5.0, 10.0, Some("a"))];
        let out = reconcile_intervals(input);
        assert_eq!(out, vec![seg(0.0, 12.0, Some("a"))]);
    }

    /// Every absent/resolved pattern up to eight segments, over contiguous
    /// intervals that include zero-width ones.
    #[test]
    fn test_exhaustive_patterns_tile_and_are_idempotent() {
        let widths = [1.5, 0.0, 2.0, 3.25, 0.0, 1.0, 4.0, 0.5];

        for n in 1..=widths.len() {
            let mut bounds = vec![0.0];
            for w in &widths[..n] {
                bounds.push(bounds.last().unwrap() + w);
            }
            let total = *bounds.last().unwrap();

            for mask in 0u32..(1 << n) {
                let input: Vec<BackgroundSegment> = (0..n)
                    .map(|i| {
                        let url = (mask >> i) & 1 == 1;
                        let name = format!("clip{}", i);
                        seg(bounds[i], bounds[i + 1], url.then_some(name.as_str()))
                    })
                    .collect();

                let out = reconcile_intervals(input.clone());

                if mask == 0 {
                    assert!(out.is_empty());
                    assert!(is_total_resolution_failure(&input));
                    continue;
                }

                assert_tiles(&out, 0.0, total);
                assert_eq!(out.len(), mask.count_ones() as usize);

                let expected_urls: Vec<Option<String>> = input
                    .iter()
                    .filter(|s| s.is_resolved())
                    .map(|s| s.video_url.clone())
                    .collect();
                let urls: Vec<Option<String>> = out.iter().map(|s| s.video_url.clone()).collect();
                assert_eq!(urls, expected_urls);

                for pair in out.windows(2) {
                    assert!(pair[0].interval.start <= pair[1].interval.start);
                }

                assert_eq!(reconcile_intervals(out.clone()), out);

                if mask == (1 << n) - 1 {
                    assert_eq!(out, input);
                }

                assert!(validate_segments(&out, Some(total), 1e-9).is_ok());
            }
        }
    }

    #[test]
    fn test_validate_coverage_accepts_tiling() {
        let intervals = vec![TimeInterval::new(0.0, 2.0), TimeInterval::new(2.0, 5.0)];
        assert!(validate_coverage(&intervals, Some(5.0), 0.01).is_ok());
        assert!(validate_coverage(&intervals, None, 0.0).is_ok());
        assert!(validate_coverage(&[], Some(0.0), 0.01).is_ok());
    }

    #[test]
    fn test_validate_coverage_rejects_violations() {
        let cases: Vec<(Vec<TimeInterval>, Option<f64>)> = vec![
            (vec![TimeInterval::new(0.0, 2.0), TimeInterval::new(3.0, 5.0)], Some(5.0)),
            (vec![TimeInterval::new(0.0, 3.0), TimeInterval::new(2.0, 5.0)], Some(5.0)),
            (vec![TimeInterval::new(2.0, 3.0), TimeInterval::new(0.0, 2.0)], None),
            (vec![TimeInterval::new(1.0, 5.0)], Some(5.0)),
            (vec![TimeInterval::new(0.0, 4.0)], Some(5.0)),
            (vec![TimeInterval::new(0.0, f64::NAN)], None),
            (vec![TimeInterval::new(3.0, 1.0)], None),
            (vec![], Some(5.0)),
        ];

        for (intervals, duration) in cases {
            let err = validate_coverage(&intervals, duration, 0.01).unwrap_err();
            assert!(matches!(err, ReelError::InvalidInput(_)), "{:?}", intervals);
        }
    }
}
