//! Grouping primitives: 1-D coordinate clustering and a disjoint-set forest.

/// Gap between left edges that starts a new width-normalization column.
pub const COLUMN_GAP: f32 = 50.0;
/// Gap between left edges that starts a new reading-order column.
pub const READING_COLUMN_GAP: f32 = 100.0;

/// Assign group ids to `values`: after sorting ascending, a new group starts
/// whenever the difference to the predecessor exceeds `gap`.
///
/// The returned ids are aligned with the input order.
pub fn cluster_coordinates(values: &[f32], gap: f32) -> Vec<u32> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut groups = vec![0u32; values.len()];
    let mut group = 0u32;
    let mut prev: Option<f32> = None;
    for idx in order {
        let value = values[idx];
        if let Some(p) = prev {
            if value - p > gap {
                group += 1;
            }
        }
        groups[idx] = group;
        prev = Some(value);
    }
    groups
}

/// Union-find over `0..n` with path halving and union by size.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`. Returns false when already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }

    /// Members of every set, each sorted ascending, sets ordered by their
    /// smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let n = self.parent.len();
        let mut by_root: Vec<Option<usize>> = vec![None; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = self.find(i);
            match by_root[root] {
                Some(g) => groups[g].push(i),
                None => {
                    by_root[root] = Some(groups.len());
                    groups.push(vec![i]);
                }
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_coordinates() {
        let values = [300.0, 72.0, 80.0, 400.0, 75.0];
        assert_eq!(cluster_coordinates(&values, COLUMN_GAP), vec![1, 0, 0, 2, 0]);
        assert_eq!(cluster_coordinates(&values, READING_COLUMN_GAP), vec![1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_cluster_gap_is_exclusive() {
        assert_eq!(cluster_coordinates(&[0.0, 10.0, 20.5], 10.0), vec![0, 0, 1]);
        assert!(cluster_coordinates(&[], 10.0).is_empty());
    }

    #[test]
    fn test_union_find_groups() {
        let mut uf = UnionFind::new(5);
        assert!(uf.union(3, 1));
        assert!(uf.union(4, 3));
        assert!(!uf.union(1, 4));
        assert_eq!(uf.groups(), vec![vec![0], vec![1, 3, 4], vec![2]]);
    }
}
