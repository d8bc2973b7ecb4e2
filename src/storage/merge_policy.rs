use crate::storage::segment::{Segment, SegmentId};

/// A published segment together with how many of its documents are still live
#[derive(Debug, Clone, Copy)]
pub struct SegmentStats {
    pub segment: Segment,
    pub live_docs: u32,
}

/// Policy for deciding when and which segments a commit folds together
pub trait MergePolicy: Send + Sync {
    fn should_merge(&self, segments: &[SegmentStats]) -> bool;

    /// Segments whose live documents move into one new segment
    fn select_segments_to_merge(&self, segments: &[SegmentStats]) -> Vec<SegmentId>;
}

/// Keeps the segment count at or below `max_segments` by merging the
/// smallest segments first. Segments without live documents are always
/// dropped.
#[derive(Debug, Clone)]
pub struct TieredMergePolicy {
    pub max_segments: usize,
    pub max_segment_bytes: u64,
    pub min_segments_to_merge: usize,
    pub max_segments_to_merge: usize,
}

impl Default for TieredMergePolicy {
    fn default() -> Self {
        TieredMergePolicy {
            max_segments: 10,
            max_segment_bytes: 512 * 1024 * 1024,
            min_segments_to_merge: 2,
            max_segments_to_merge: 10,
        }
    }
}

impl TieredMergePolicy {
    pub fn new(max_segments: usize) -> Self {
        TieredMergePolicy {
            max_segments: max_segments.max(1),
            ..TieredMergePolicy::default()
        }
    }
}

impl MergePolicy for TieredMergePolicy {
    fn should_merge(&self, segments: &[SegmentStats]) -> bool {
        segments.len() > self.max_segments || segments.iter().any(|s| s.live_docs == 0)
    }

    fn select_segments_to_merge(&self, segments: &[SegmentStats]) -> Vec<SegmentId> {
        let (dead, mut live): (Vec<SegmentStats>, Vec<SegmentStats>) =
            segments.iter().copied().partition(|s| s.live_docs == 0);
        let mut selected: Vec<SegmentId> = dead.iter().map(|s| s.segment.id).collect();

        if live.len() <= self.max_segments {
            return selected;
        }

        live.sort_by_key(|s| s.segment.size_bytes);
        let mut picked = Vec::new();
        let mut merged_bytes = 0;
        for stats in live {
            // already large enough to stand alone
            if stats.segment.size_bytes > self.max_segment_bytes / 2 {
                continue;
            }
            if merged_bytes + stats.segment.size_bytes > self.max_segment_bytes {
                break;
            }

            picked.push(stats.segment.id);
            merged_bytes += stats.segment.size_bytes;
            if picked.len() >= self.max_segments_to_merge {
                break;
            }
        }

        if picked.len() >= self.min_segments_to_merge {
            selected.extend(picked);
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(size_bytes: u64, live_docs: u32) -> SegmentStats {
        SegmentStats {
            segment: Segment {
                id: SegmentId::new(),
                doc_count: live_docs.max(1),
                size_bytes,
            },
            live_docs,
        }
    }

    #[test]
    fn dead_segments_are_always_dropped() {
        let policy = TieredMergePolicy::default();
        let segments = vec![stats(100, 0), stats(200, 3)];

        assert!(policy.should_merge(&segments));
        assert_eq!(policy.select_segments_to_merge(&segments), vec![segments[0].segment.id]);
    }

    #[test]
    fn smallest_segments_merge_past_the_limit() {
        let policy = TieredMergePolicy::new(3);
        let segments = vec![stats(400, 1), stats(100, 1), stats(300, 1), stats(200, 1)];

        assert!(policy.should_merge(&segments));
        let selected = policy.select_segments_to_merge(&segments);
        assert_eq!(selected.len(), 4);
        assert_eq!(selected[0], segments[1].segment.id);
    }

    #[test]
    fn oversized_segments_stay_put() {
        let policy = TieredMergePolicy {
            max_segments: 1,
            max_segment_bytes: 1000,
            ..TieredMergePolicy::default()
        };
        let segments = vec![stats(900, 1), stats(10, 1), stats(20, 1)];

        let selected = policy.select_segments_to_merge(&segments);
        assert_eq!(selected, vec![segments[1].segment.id, segments[2].segment.id]);
    }

    #[test]
    fn under_the_limit_nothing_merges() {
        let policy = TieredMergePolicy::default();
        let segments = vec![stats(100, 1), stats(200, 2)];
        assert!(!policy.should_merge(&segments));
        assert!(policy.select_segments_to_merge(&segments).is_empty());
    }
}
