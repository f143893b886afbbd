use crate::models::MatchResult;
use serde::Serialize;

/// Ranked set of scored matches for one session.
///
/// Qualified matches always precede non-qualified ones; within each
/// partition items are ordered by score descending, then semantic score
/// descending, then arrival order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankedResults {
    items: Vec<MatchResult>,
    #[serde(skip)]
    qualified_len: usize,
}

impl RankedResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            qualified_len: 0,
        }
    }

    /// Insert a match at its ordered position and return the 1-based rank
    pub fn insert(&mut self, result: MatchResult) -> usize {
        let (start, end) = if result.qualified {
            (0, self.qualified_len)
        } else {
            (self.qualified_len, self.items.len())
        };

        let score = result.score;
        let semantic = result.semantic_score();
        let offset = self.items[start..end].partition_point(|existing| {
            existing.score > score
                || (existing.score == score && existing.semantic_score() >= semantic)
        });
        let index = start + offset;

        if result.qualified {
            self.qualified_len += 1;
        }
        self.items.insert(index, result);
        index + 1
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn qualified_count(&self) -> usize {
        self.qualified_len
    }

    pub fn qualified(&self) -> &[MatchResult] {
        &self.items[..self.qualified_len]
    }

    pub fn non_qualified(&self) -> &[MatchResult] {
        &self.items[self.qualified_len..]
    }

    pub fn as_slice(&self) -> &[MatchResult] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchResult> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<MatchResult> {
        self.items
    }

    /// Check that no non-qualified item precedes a qualified one and each
    /// partition is sorted
    pub fn is_partitioned(&self) -> bool {
        let qualified_prefix = self.items[..self.qualified_len].iter().all(|m| m.qualified)
            && self.items[self.qualified_len..].iter().all(|m| !m.qualified);
        let ordered = |slice: &[MatchResult]| {
            slice.windows(2).all(|w| {
                w[0].score > w[1].score
                    || (w[0].score == w[1].score && w[0].semantic_score() >= w[1].semantic_score())
            })
        };
        qualified_prefix && ordered(self.qualified()) && ordered(self.non_qualified())
    }
}

impl<'a> IntoIterator for &'a RankedResults {
    type Item = &'a MatchResult;
    type IntoIter = std::slice::Iter<'a, MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
