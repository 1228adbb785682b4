use std::collections::{HashSet, VecDeque};

use conquest_core::CellIndex;

/// FIFO of frontier candidates backed by a membership set.
///
/// The grid's frontier flag is authoritative. The set holds candidates that
/// may have gone stale since they were queued, for instance when another
/// entity's claim settled them, and stale members are pruned lazily as they
/// reach the head. The queue fixes the order in which cells are expanded
/// from. A cell is never queued twice.
#[derive(Clone, Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CellIndex>,
    members: HashSet<CellIndex>,
}

impl Frontier {
    /// Appends `cell` unless it is already a member. Returns whether it was added.
    pub fn push(&mut self, cell: CellIndex) -> bool {
        if !self.members.insert(cell) {
            return false;
        }
        self.queue.push_back(cell);
        true
    }

    /// Removes `cell` from the set. Its queue entry becomes stale and is
    /// discarded once it reaches the head.
    pub fn remove(&mut self, cell: CellIndex) -> bool {
        self.members.remove(&cell)
    }

    /// Whether `cell` is a member of the frontier set.
    #[must_use]
    pub fn contains(&self, cell: CellIndex) -> bool {
        self.members.contains(&cell)
    }

    /// Number of cells in the frontier set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the frontier set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Frontier cells in ascending index order.
    #[must_use]
    pub fn cells(&self) -> Vec<CellIndex> {
        let mut cells: Vec<CellIndex> = self.members.iter().copied().collect();
        cells.sort_unstable();
        cells
    }

    pub(crate) fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn front(&self) -> Option<CellIndex> {
        self.queue.front().copied()
    }

    pub(crate) fn drop_front(&mut self) {
        if let Some(cell) = self.queue.pop_front() {
            let _ = self.members.remove(&cell);
        }
    }

    /// Moves the head to the tail, keeping it a member.
    pub(crate) fn rotate_front(&mut self) {
        if let Some(cell) = self.queue.pop_front() {
            self.queue.push_back(cell);
        }
    }

    /// Keeps only members satisfying `keep`, preserving queue order. Returns
    /// the number of members removed.
    pub(crate) fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(CellIndex) -> bool,
    {
        let before = self.members.len();
        self.members.retain(|cell| keep(*cell));
        let members = &self.members;
        self.queue.retain(|cell| members.contains(cell));
        before - self.members.len()
    }

    /// Rebuilds an empty queue from the set in ascending index order so every
    /// client recovers identically. Returns the number of cells queued.
    pub(crate) fn refill(&mut self) -> usize {
        if !self.queue.is_empty() {
            return 0;
        }
        self.queue.extend(self.cells());
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_ignores_duplicates() {
        let mut frontier = Frontier::default();
        assert!(frontier.push(CellIndex::new(4)));
        assert!(!frontier.push(CellIndex::new(4)));
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.front(), Some(CellIndex::new(4)));
    }

    #[test]
    fn removed_cells_linger_in_the_queue_until_dropped() {
        let mut frontier = Frontier::default();
        let _ = frontier.push(CellIndex::new(1));
        let _ = frontier.push(CellIndex::new(2));
        assert!(frontier.remove(CellIndex::new(1)));
        assert!(!frontier.contains(CellIndex::new(1)));
        assert_eq!(frontier.front(), Some(CellIndex::new(1)));

        frontier.drop_front();
        assert_eq!(frontier.front(), Some(CellIndex::new(2)));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn rotation_requeues_the_head_at_the_tail() {
        let mut frontier = Frontier::default();
        for cell in [6, 18, 2] {
            let _ = frontier.push(CellIndex::new(cell));
        }

        frontier.rotate_front();

        assert_eq!(
            frontier.queue.iter().copied().collect::<Vec<_>>(),
            vec![CellIndex::new(18), CellIndex::new(2), CellIndex::new(6)]
        );
        assert!(frontier.contains(CellIndex::new(6)));
        assert_eq!(frontier.len(), 3);
    }

    #[test]
    fn retain_prunes_members_and_their_queue_entries() {
        let mut frontier = Frontier::default();
        for cell in [5, 1, 8, 4] {
            let _ = frontier.push(CellIndex::new(cell));
        }

        assert_eq!(frontier.retain(|cell| cell.get() % 2 == 0), 2);

        assert_eq!(frontier.cells(), vec![CellIndex::new(4), CellIndex::new(8)]);
        assert_eq!(
            frontier.queue.iter().copied().collect::<Vec<_>>(),
            vec![CellIndex::new(8), CellIndex::new(4)]
        );
    }

    #[test]
    fn refill_restores_members_in_index_order() {
        let mut frontier = Frontier::default();
        for cell in [9, 3, 6] {
            let _ = frontier.push(CellIndex::new(cell));
        }
        frontier.queue.clear();

        assert_eq!(frontier.refill(), 3);
        assert_eq!(
            frontier.queue.iter().copied().collect::<Vec<_>>(),
            vec![CellIndex::new(3), CellIndex::new(6), CellIndex::new(9)]
        );
        assert_eq!(frontier.refill(), 0, "non-empty queues are left alone");
    }
}
