/// Disjoint-set forest over the integer ids `0..len`.
///
/// Path compression in [`UnionFind::find`] and union by size in [`UnionFind::union`] keep
/// both operations amortized near constant time.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    /// Creates `len` singleton sets.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    /// Returns the root of the set containing `id`, compressing the path on the way.
    pub fn find(&mut self, mut id: usize) -> usize {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[id] != root {
            let next = self.parent[id];
            self.parent[id] = root;
            id = next;
        }

        root
    }

    /// Merges the sets containing `a` and `b` and returns the root of the result.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }

        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        big
    }

    /// Groups all ids by set.
    ///
    /// Groups are ordered by their smallest id and each group is sorted ascending, so the
    /// result does not depend on the order in which unions were applied.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut label = vec![usize::MAX; self.parent.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for id in 0..self.parent.len() {
            let root = self.find(id);
            if label[root] == usize::MAX {
                label[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[label[root]].push(id);
        }
        groups
    }
}
