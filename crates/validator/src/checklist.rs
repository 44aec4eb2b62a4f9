/// Visited-set keyed by dense node index.
///
/// Backed by a growable word vector; `clear` zeroes the words but keeps the
/// allocation so one checklist can be reused across traversals.

use jitval_tril::NodeId;

#[derive(Debug, Clone, Default)]
pub struct NodeChecklist {
    words: Vec<u64>,
}

impl NodeChecklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for `nodes` node indices.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            words: vec![0; nodes.div_ceil(64)],
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        let (w, b) = split(node);
        self.words.get(w).is_some_and(|word| (word >> b) & 1 == 1)
    }

    /// Returns `true` if `node` was not already present.
    pub fn add(&mut self, node: NodeId) -> bool {
        let (w, b) = split(node);
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        let mask = 1_u64 << b;
        let fresh = self.words[w] & mask == 0;
        self.words[w] |= mask;
        fresh
    }

    pub fn remove(&mut self, node: NodeId) {
        let (w, b) = split(node);
        if let Some(word) = self.words.get_mut(w) {
            *word &= !(1_u64 << b);
        }
    }

    pub fn clear(&mut self) {
        for w in &mut self.words {
            *w = 0;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }
}

fn split(node: NodeId) -> (usize, u32) {
    (node.index() / 64, node.0 % 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_contains_remove() {
        let mut c = NodeChecklist::new();
        assert!(!c.contains(NodeId(3)));
        assert!(c.add(NodeId(3)));
        assert!(!c.add(NodeId(3)));
        assert!(c.contains(NodeId(3)));
        c.remove(NodeId(3));
        assert!(!c.contains(NodeId(3)));
        assert!(c.is_empty());
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut c = NodeChecklist::with_capacity(10);
        c.add(NodeId(1000));
        assert!(c.contains(NodeId(1000)));
        assert!(!c.contains(NodeId(999)));
        assert!(!c.contains(NodeId(5000)));
    }

    #[test]
    fn test_clear_keeps_nothing() {
        let mut c = NodeChecklist::new();
        for i in [0, 63, 64, 127, 128] {
            c.add(NodeId(i));
        }
        c.clear();
        for i in [0, 63, 64, 127, 128] {
            assert!(!c.contains(NodeId(i)));
        }
        assert!(c.is_empty());
    }
}
