//! Positional ordering of gallery entries.

use crate::error::EditError;

/// Anything that carries a display position.
pub trait Ordered {
    fn order_index(&self) -> u32;
    fn set_order_index(&mut self, order_index: u32);
}

/// Moves the item at `source` to `dest` and renumbers every item by position.
///
/// `dest` is interpreted against the list with the moved item already removed,
/// which is the usual single drag-and-drop semantics.
pub fn reorder<T: Ordered + Clone>(
    items: &[T],
    source: usize,
    dest: usize,
) -> Result<Vec<T>, EditError> {
    let len = items.len();
    for index in [source, dest] {
        if index >= len {
            return Err(EditError::IndexOutOfRange { index, len });
        }
    }

    let mut reordered = items.to_vec();
    let moved = reordered.remove(source);
    reordered.insert(dest, moved);
    reindex(&mut reordered);
    Ok(reordered)
}

/// Assigns `0..n` in slice order.
pub fn reindex<T: Ordered>(items: &mut [T]) {
    for (position, item) in items.iter_mut().enumerate() {
        item.set_order_index(position as u32);
    }
}

/// Items in render order. Ties keep their relative input order.
pub fn sorted_for_display<T: Ordered>(items: &[T]) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| item.order_index());
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Tile {
        name: &'static str,
        order: u32,
    }

    impl Ordered for Tile {
        fn order_index(&self) -> u32 {
            self.order
        }

        fn set_order_index(&mut self, order_index: u32) {
            self.order = order_index;
        }
    }

    fn tiles(layout: &[(&'static str, u32)]) -> Vec<Tile> {
        layout.iter().map(|&(name, order)| Tile { name, order }).collect()
    }

    #[test]
    fn moving_first_to_last() {
        let list = tiles(&[("A", 0), ("B", 1), ("C", 2)]);
        let moved = reorder(&list, 0, 2).expect("reorder");
        assert_eq!(moved, tiles(&[("B", 0), ("C", 1), ("A", 2)]));
    }

    #[test]
    fn moving_last_to_first() {
        let list = tiles(&[("A", 0), ("B", 1), ("C", 2), ("D", 3)]);
        let moved = reorder(&list, 3, 0).expect("reorder");
        assert_eq!(moved, tiles(&[("D", 0), ("A", 1), ("B", 2), ("C", 3)]));
    }

    #[test]
    fn same_position_only_renumbers() {
        let list = tiles(&[("A", 4), ("B", 9)]);
        let moved = reorder(&list, 1, 1).expect("reorder");
        assert_eq!(moved, tiles(&[("A", 0), ("B", 1)]));
    }

    #[test]
    fn every_move_is_a_contiguous_permutation() {
        let list = tiles(&[("A", 0), ("B", 5), ("C", 5), ("D", 7), ("E", 20)]);
        for source in 0..list.len() {
            for dest in 0..list.len() {
                let moved = reorder(&list, source, dest).expect("reorder");
                let mut names: Vec<_> = moved.iter().map(|t| t.name).collect();
                assert_eq!(moved[dest].name, list[source].name);
                for (position, tile) in moved.iter().enumerate() {
                    assert_eq!(tile.order, position as u32);
                }
                names.sort_unstable();
                assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
            }
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        let list = tiles(&[("A", 0), ("B", 1)]);
        assert_eq!(
            reorder(&list, 2, 0),
            Err(EditError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            reorder(&list, 0, 5),
            Err(EditError::IndexOutOfRange { index: 5, len: 2 })
        );
        let empty: Vec<Tile> = Vec::new();
        assert!(reorder(&empty, 0, 0).is_err());
    }

    #[test]
    fn display_sort_is_stable() {
        let list = tiles(&[("late", 3), ("first", 1), ("tie-a", 2), ("tie-b", 2)]);
        let names: Vec<_> = sorted_for_display(&list).iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["first", "tie-a", "tie-b", "late"]);
    }
}
