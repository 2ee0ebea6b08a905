//! Beat priority resolution.
//!
//! Reduces a nested tree of beat indices to one flat list ordered from most to
//! least indispensable. Each flattening pass removes one level of nesting:
//! the first beat of every sibling group comes first, then (optionally) the
//! pickup directly before each of those beats, then whatever remains, always
//! drawing from the longest remaining groups first. Ties are broken by sibling
//! order.

use super::structure::MetricStructure;
use serde::Serialize;
use std::collections::VecDeque;

/// A tree of beat indices shaped like the [`MetricStructure`] it came from.
///
/// Serializes as nested arrays of integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BeatTree {
    Beat(usize),
    Group(Vec<BeatTree>),
}

impl BeatTree {
    /// Nesting depth: 0 for a beat, 1 for a flat group of beats.
    pub fn depth(&self) -> usize {
        match self {
            BeatTree::Beat(_) => 0,
            BeatTree::Group(children) => {
                1 + children.iter().map(BeatTree::depth).max().unwrap_or(0)
            }
        }
    }

    /// All beat indices in tree order.
    pub fn beats(&self) -> Vec<usize> {
        let mut beats = Vec::new();
        self.collect_beats(&mut beats);
        beats
    }

    fn collect_beats(&self, out: &mut Vec<usize>) {
        match self {
            BeatTree::Beat(beat) => out.push(*beat),
            BeatTree::Group(children) => {
                for child in children {
                    child.collect_beats(out);
                }
            }
        }
    }

    /// Number of beats in the tree.
    pub fn len(&self) -> usize {
        match self {
            BeatTree::Beat(_) => 1,
            BeatTree::Group(children) => children.iter().map(BeatTree::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_children(self) -> VecDeque<BeatTree> {
        match self {
            BeatTree::Group(children) => children.into(),
            beat @ BeatTree::Beat(_) => VecDeque::from([beat]),
        }
    }
}

/// Wraps beats in single-element groups until every beat sits at the depth
/// of the deepest one.
///
/// A shallow branch is padded at its beats, not above them, so a flat group
/// next to a nested sibling behaves like a group of single-beat groups.
pub fn normalize_depth(tree: &BeatTree) -> BeatTree {
    pad_to_depth(tree, tree.depth())
}

fn pad_to_depth(tree: &BeatTree, depth: usize) -> BeatTree {
    match tree {
        BeatTree::Beat(beat) => {
            let mut padded = BeatTree::Beat(*beat);
            for _ in 0..depth {
                padded = BeatTree::Group(vec![padded]);
            }
            padded
        }
        BeatTree::Group(children) => BeatTree::Group(
            children
                .iter()
                .map(|child| pad_to_depth(child, depth.saturating_sub(1)))
                .collect(),
        ),
    }
}

/// Unravels one level of nesting from a list of sibling groups.
///
/// 1. The first element of every group, in sibling order.
/// 2. With `upbeats_before_group_length`, the next element of every group
///    that still has one (the pickup to the beat just taken).
/// 3. Repeatedly, the first element of every group whose remaining length
///    equals the current maximum, in sibling order.
///
/// A bare beat among the siblings is treated as a group holding only itself.
pub fn flatten_beat_groups(sub_groups: Vec<BeatTree>, upbeats_before_group_length: bool) -> Vec<BeatTree> {
    let mut queues: Vec<VecDeque<BeatTree>> = sub_groups.into_iter().map(BeatTree::into_children).collect();
    let mut out = Vec::with_capacity(queues.iter().map(VecDeque::len).sum());

    for queue in &mut queues {
        out.extend(queue.pop_front());
    }

    if upbeats_before_group_length {
        for queue in &mut queues {
            out.extend(queue.pop_front());
        }
    }

    loop {
        let longest = queues.iter().map(VecDeque::len).max().unwrap_or(0);
        if longest == 0 {
            break;
        }
        for queue in queues.iter_mut().filter(|queue| queue.len() == longest) {
            out.extend(queue.pop_front());
        }
    }

    out
}

/// Resolves a nested beat tree to its backward beat priority list.
///
/// The tree is depth-normalized, then flattened one level per pass until only
/// beats remain.
pub fn backward_beat_priorities(tree: &BeatTree, upbeats_before_group_length: bool) -> Vec<usize> {
    let mut level = Vec::from(normalize_depth(tree).into_children());
    let mut pass = 0;
    while level.iter().any(|node| node.depth() > 0) {
        level = flatten_beat_groups(level, upbeats_before_group_length);
        pass += 1;
        tracing::trace!(pass, remaining_groups = level.len(), "flattened beat groups");
    }
    level.iter().flat_map(BeatTree::beats).collect()
}

impl MetricStructure {
    /// Beat indices from most to least indispensable, numbered backward from
    /// the downbeat as in [`get_nested_beat_groups`](Self::get_nested_beat_groups).
    pub fn get_backward_beat_priorities(&self, upbeats_before_group_length: bool) -> Vec<usize> {
        backward_beat_priorities(&self.get_nested_beat_groups(), upbeats_before_group_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BeatTree::{Beat, Group};

    fn run(beats: &[usize]) -> BeatTree {
        Group(beats.iter().copied().map(Beat).collect())
    }

    #[test]
    fn test_depth() {
        assert_eq!(Beat(0).depth(), 0);
        assert_eq!(run(&[0, 1]).depth(), 1);
        assert_eq!(Group(vec![run(&[0, 1]), Group(vec![run(&[2])])]).depth(), 3);
    }

    #[test]
    fn test_normalize_depth_wraps_shallow_beats() {
        let tree = Group(vec![run(&[0, 1, 2]), Group(vec![run(&[3, 4]), run(&[5, 6])])]);
        let normalized = normalize_depth(&tree);
        assert_eq!(
            normalized,
            Group(vec![
                Group(vec![run(&[0]), run(&[1]), run(&[2])]),
                Group(vec![run(&[3, 4]), run(&[5, 6])]),
            ])
        );
        assert_eq!(normalized.beats(), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_normalize_depth_leaves_uniform_trees_alone() {
        let tree = Group(vec![run(&[0, 1]), run(&[2, 3])]);
        assert_eq!(normalize_depth(&tree), tree);
    }

    #[test]
    fn test_flatten_with_upbeats_first() {
        let groups = vec![run(&[0, 1, 2]), run(&[3, 4])];
        let flattened = flatten_beat_groups(groups, true);
        assert_eq!(flattened, vec![Beat(0), Beat(3), Beat(1), Beat(4), Beat(2)]);
    }

    #[test]
    fn test_flatten_literal_barlow_order() {
        let groups = vec![run(&[0, 1, 2]), run(&[3, 4])];
        let flattened = flatten_beat_groups(groups, false);
        assert_eq!(flattened, vec![Beat(0), Beat(3), Beat(1), Beat(2), Beat(4)]);
    }

    #[test]
    fn test_flatten_equal_lengths_alternate_in_sibling_order() {
        let groups = vec![run(&[0, 1, 2]), run(&[3, 4, 5]), run(&[6, 7, 8])];
        let flattened = flatten_beat_groups(groups, false);
        let beats: Vec<usize> = flattened.iter().flat_map(BeatTree::beats).collect();
        assert_eq!(beats, vec![0, 3, 6, 1, 4, 7, 2, 5, 8]);
    }

    #[test]
    fn test_flatten_consumes_one_level() {
        let groups = vec![
            Group(vec![run(&[0, 1]), run(&[2, 3])]),
            Group(vec![run(&[4, 5]), run(&[6, 7])]),
        ];
        let flattened = flatten_beat_groups(groups, true);
        assert_eq!(
            flattened,
            vec![run(&[0, 1]), run(&[4, 5]), run(&[2, 3]), run(&[6, 7])]
        );
    }

    #[test]
    fn test_backward_priorities_are_a_permutation() {
        let structure = MetricStructure::from_string("(2+3+2)*3", false).unwrap();
        let mut priorities = structure.get_backward_beat_priorities(true);
        assert_eq!(priorities[0], 0);
        priorities.sort_unstable();
        assert_eq!(priorities, (0..21).collect::<Vec<_>>());
    }

    #[test]
    fn test_backward_priorities_for_nested_sum() {
        let structure = MetricStructure::from_string("(2+2)+3", false).unwrap();
        assert_eq!(structure.get_backward_beat_priorities(true), vec![0, 3, 1, 5, 2, 4, 6]);

        let flat = MetricStructure::from_string("2+2+3", false).unwrap();
        assert_eq!(flat.get_backward_beat_priorities(true), vec![0, 3, 5, 1, 4, 6, 2]);
    }
}
