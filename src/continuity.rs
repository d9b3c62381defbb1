//! Temporal continuity analysis
//!
//! Decides which frames of a video keep their detections: a frame is valid
//! when it lies inside a run of at least `threshold` consecutive frame
//! indices that all carry a detection. Missing indices break a run.

use std::collections::BTreeSet;

use crate::types::{FrameIndex, Segment, Threshold};

/// Computes valid frame sets for a fixed run-length threshold
#[derive(Debug, Clone, Copy)]
pub struct ContinuityAnalyzer {
    threshold: Threshold,
}

impl ContinuityAnalyzer {
    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Frames belonging to a detection run of at least `threshold` frames
    pub fn valid_frames<'a, I>(&self, sequence: I) -> BTreeSet<FrameIndex>
    where
        I: IntoIterator<Item = (&'a FrameIndex, &'a bool)>,
    {
        compute_valid_frames(sequence, self.threshold)
    }
}

/// Compute the set of frames that belong to a run of at least `threshold`
/// stride-1 consecutive detection-present indices.
///
/// Runs of exactly `threshold` frames and longer runs are included in full.
/// An index absent from `sequence` ends the current run, exactly like an
/// index mapped to `false`.
pub fn compute_valid_frames<'a, I>(sequence: I, threshold: Threshold) -> BTreeSet<FrameIndex>
where
    I: IntoIterator<Item = (&'a FrameIndex, &'a bool)>,
{
    let mut detected: Vec<FrameIndex> = sequence
        .into_iter()
        .filter(|&(_, &has_detection)| has_detection)
        .map(|(&index, _)| index)
        .collect();

    let threshold = threshold.get();
    let mut valid = BTreeSet::new();
    if detected.len() < threshold {
        return valid;
    }

    detected.sort_unstable();
    detected.dedup();

    let mut run_start = 0;
    for i in 1..=detected.len() {
        let continues = i < detected.len() && detected[i - 1].checked_add(1) == Some(detected[i]);
        if continues {
            continue;
        }
        if i - run_start >= threshold {
            valid.extend(&detected[run_start..i]);
        }
        run_start = i;
    }

    valid
}

/// Split frames into maximal stride-1 segments, in ascending order
pub fn segments<'a, I>(frames: I) -> Vec<Segment>
where
    I: IntoIterator<Item = &'a FrameIndex>,
{
    let mut sorted: Vec<FrameIndex> = frames.into_iter().copied().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut result = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return result;
    };

    let (mut start, mut end) = (first, first);
    for frame in iter {
        if frame == end + 1 {
            end = frame;
        } else {
            result.push(Segment {
                start,
                end,
                len: (end - start + 1) as usize,
            });
            start = frame;
            end = frame;
        }
    }
    result.push(Segment {
        start,
        end,
        len: (end - start + 1) as usize,
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sequence;
    use std::collections::HashMap;

    fn threshold(n: usize) -> Threshold {
        Threshold::new(n).unwrap()
    }

    fn detections(frames: impl IntoIterator<Item = FrameIndex>) -> Sequence {
        frames.into_iter().map(|f| (f, true)).collect()
    }

    // Re-scan forward from every detection as a potential run start.
    fn rescan_reference(sequence: &Sequence, n: usize) -> BTreeSet<FrameIndex> {
        let detected: Vec<FrameIndex> = sequence
            .iter()
            .filter(|&(_, &v)| v)
            .map(|(&k, _)| k)
            .collect();
        let mut valid = BTreeSet::new();
        if detected.len() < n {
            return valid;
        }
        for i in 0..detected.len() {
            let mut count = 1;
            if count >= n {
                valid.insert(detected[i]);
            }
            for j in i + 1..detected.len() {
                if detected[j] != detected[j - 1] + 1 {
                    break;
                }
                count += 1;
                if count >= n {
                    valid.extend(&detected[i..=j]);
                }
            }
        }
        valid
    }

    #[test]
    fn test_empty_sequence() {
        let sequence = Sequence::new();
        assert!(compute_valid_frames(&sequence, threshold(1)).is_empty());
    }

    #[test]
    fn test_full_run_above_threshold() {
        let sequence = detections(1..=35);
        let valid = compute_valid_frames(&sequence, threshold(30));
        assert_eq!(valid, (1..=35).collect());
    }

    #[test]
    fn test_short_run_is_dropped() {
        let mut sequence: Sequence = (0..100).map(|f| (f, false)).collect();
        for f in [5, 6, 7] {
            sequence.insert(f, true);
        }
        assert!(compute_valid_frames(&sequence, threshold(30)).is_empty());
    }

    #[test]
    fn test_missing_frame_breaks_run() {
        let sequence = detections((1..=29).chain(31..=60));
        let valid = compute_valid_frames(&sequence, threshold(30));
        assert_eq!(valid, (31..=60).collect());
    }

    #[test]
    fn test_exact_threshold_and_one_below() {
        let n = 5;
        assert_eq!(
            compute_valid_frames(&detections(10..15), threshold(n)).len(),
            n
        );
        assert!(compute_valid_frames(&detections(10..14), threshold(n)).is_empty());
    }

    #[test]
    fn test_two_disjoint_blocks() {
        let n = 4;
        let mut sequence = detections((0..4).chain(10..16));
        sequence.insert(5, false);
        let valid = compute_valid_frames(&sequence, threshold(n));
        assert_eq!(valid.len(), 2 * n + 2);
        assert_eq!(valid, (0..4).chain(10..16).collect());
    }

    #[test]
    fn test_false_frame_splits_block() {
        let n = 4;
        // Halves of 4 and 5 frames, both kept.
        let mut sequence = detections(0..10);
        sequence.insert(4, false);
        let valid = compute_valid_frames(&sequence, threshold(n));
        assert_eq!(valid, (0..4).chain(5..10).collect());

        // Halves of 2 and 7 frames, only the long half kept.
        let mut sequence = detections(0..10);
        sequence.insert(2, false);
        let valid = compute_valid_frames(&sequence, threshold(n));
        assert_eq!(valid, (3..10).collect());
    }

    #[test]
    fn test_sparse_count_below_threshold_short_circuits() {
        let sequence = detections([1, 100, 1000]);
        assert!(compute_valid_frames(&sequence, threshold(4)).is_empty());
    }

    #[test]
    fn test_threshold_one_keeps_every_detection() {
        let mut sequence = detections([3, 9, 27]);
        sequence.insert(4, false);
        let valid = compute_valid_frames(&sequence, threshold(1));
        assert_eq!(valid, [3, 9, 27].into_iter().collect());
    }

    #[test]
    fn test_result_is_subset_of_detections() {
        let sequence: Sequence = (0..200).map(|f| (f, f % 7 != 0)).collect();
        let valid = compute_valid_frames(&sequence, threshold(5));
        assert!(!valid.is_empty());
        assert!(valid.iter().all(|f| sequence[f]));
    }

    #[test]
    fn test_accepts_hash_map_and_is_idempotent() {
        let map: HashMap<FrameIndex, bool> = (0..50).map(|f| (f, f % 11 != 0)).collect();
        let first = compute_valid_frames(&map, threshold(6));
        let second = compute_valid_frames(&map, threshold(6));
        assert_eq!(first, second);
        assert_eq!(
            first,
            compute_valid_frames(&map.into_iter().collect::<Sequence>(), threshold(6))
        );
    }

    #[test]
    fn test_indices_near_upper_bound() {
        let sequence = detections((u64::MAX - 2)..=u64::MAX);
        let valid = compute_valid_frames(&sequence, threshold(3));
        assert_eq!(valid.len(), 3);
    }

    #[test]
    fn test_matches_rescan_reference() {
        // Deterministic pseudo-random patterns with runs and gaps.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..50 {
            let mut sequence = Sequence::new();
            for frame in 0..300u64 {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                match state % 10 {
                    0 => {}
                    1 | 2 => {
                        sequence.insert(frame, false);
                    }
                    _ => {
                        sequence.insert(frame, true);
                    }
                }
            }
            for n in [1, 2, 3, 5, 8] {
                assert_eq!(
                    compute_valid_frames(&sequence, threshold(n)),
                    rescan_reference(&sequence, n)
                );
            }
        }
    }

    #[test]
    fn test_analyzer_uses_its_threshold() {
        let analyzer = ContinuityAnalyzer::new(threshold(3));
        assert_eq!(analyzer.threshold().get(), 3);
        let sequence = detections((0..3).chain(5..7));
        assert_eq!(analyzer.valid_frames(&sequence), (0..3).collect());
    }

    #[test]
    fn test_segments() {
        let frames: BTreeSet<FrameIndex> = (1..=3).chain(7..=7).chain(10..=12).collect();
        let segs = segments(&frames);
        assert_eq!(
            segs,
            vec![
                Segment { start: 1, end: 3, len: 3 },
                Segment { start: 7, end: 7, len: 1 },
                Segment { start: 10, end: 12, len: 3 },
            ]
        );
        assert!(segments(&BTreeSet::new()).is_empty());
    }
}
