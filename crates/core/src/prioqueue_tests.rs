use super::*;

fn int_queue() -> PrioQueue<i64> {
    PrioQueue::new(Box::new(|a, b| a < b))
}

#[test]
fn pop_on_empty_returns_none() {
    let mut q = int_queue();
    assert_eq!(q.pop(), None);
    assert_eq!(q.peek(), None);
    assert!(q.is_empty());
}

#[test]
fn pop_returns_values_in_order() {
    let mut q = int_queue();
    for value in [5, 1, 4, 2, 3] {
        q.push(value);
    }

    assert_eq!(q.len(), 5);
    assert_eq!(q.peek(), Some(&1));

    let mut drained = Vec::new();
    while let Some(v) = q.pop() {
        drained.push(v);
    }

    assert_eq!(drained, vec![1, 2, 3, 4, 5]);
}

#[test]
fn clear_empties_queue_and_invalidates_handles() {
    let mut q = int_queue();
    let handle = q.push(1);
    q.push(2);

    q.clear();

    assert!(q.is_empty());
    assert_eq!(q.update(&handle), Err(StaleHandle));
}

#[test]
fn update_moves_value_toward_root() {
    let mut q = int_queue();
    q.push(10);
    q.push(20);
    let handle = q.push(30);

    *q.get_mut(&handle).unwrap() = 5;
    q.update(&handle).unwrap();

    assert_eq!(q.pop(), Some(5));
    assert_eq!(q.pop(), Some(10));
}

#[test]
fn update_moves_value_toward_leaves() {
    let mut q = int_queue();
    let handle = q.push(1);
    q.push(10);
    q.push(20);

    *q.get_mut(&handle).unwrap() = 50;
    q.update(&handle).unwrap();

    assert_eq!(q.pop(), Some(10));
    assert_eq!(q.pop(), Some(20));
    assert_eq!(q.pop(), Some(50));
}

#[test]
fn remove_returns_value_and_invalidates_handle() {
    let mut q = int_queue();
    q.push(1);
    let handle = q.push(2);
    q.push(3);

    assert_eq!(q.remove(handle.clone()), Ok(2));
    assert_eq!(q.remove(handle), Err(StaleHandle));

    assert_eq!(q.pop(), Some(1));
    assert_eq!(q.pop(), Some(3));
    assert_eq!(q.pop(), None);
}

#[test]
fn remove_root_keeps_heap_consistent() {
    let mut q = int_queue();
    let handle = q.push(1);
    q.push(3);
    q.push(2);

    assert_eq!(q.remove(handle), Ok(1));
    assert_eq!(q.pop(), Some(2));
    assert_eq!(q.pop(), Some(3));
}

#[test]
fn pop_invalidates_handle() {
    let mut q = int_queue();
    let handle = q.push(1);

    assert_eq!(q.pop(), Some(1));
    assert_eq!(q.update(&handle), Err(StaleHandle));
}

#[test]
fn get_reads_value_through_handle() {
    let mut q = int_queue();
    let handle = q.push(7);

    assert_eq!(q.get(&handle), Some(&7));
}

#[test]
fn equal_values_all_drain() {
    let mut q = int_queue();
    for _ in 0..4 {
        q.push(9);
    }

    let mut count = 0;
    while q.pop().is_some() {
        count += 1;
    }
    assert_eq!(count, 4);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn drains_sorted_after_random_pushes(values in proptest::collection::vec(-1000i64..1000, 0..50)) {
            let mut q = int_queue();
            for v in &values {
                q.push(*v);
            }

            let mut drained = Vec::new();
            while let Some(v) = q.pop() {
                drained.push(v);
            }

            let mut expected = values.clone();
            expected.sort_unstable();
            prop_assert_eq!(drained, expected);
        }

        #[test]
        fn drains_sorted_after_removals(
            values in proptest::collection::vec(-1000i64..1000, 1..40),
            removals in proptest::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let mut q = int_queue();
            let mut handles = Vec::new();
            for v in &values {
                handles.push((q.push(*v), *v));
            }

            let mut expected: Vec<i64> = values.clone();
            let mut removed = std::collections::HashSet::new();
            for idx in &removals {
                let pick = idx.index(handles.len());
                if removed.insert(pick) {
                    let (handle, value) = handles[pick].clone();
                    prop_assert_eq!(q.remove(handle), Ok(value));
                    let pos = expected.iter().position(|v| *v == value).unwrap();
                    expected.remove(pos);
                }
            }

            let mut drained = Vec::new();
            while let Some(v) = q.pop() {
                drained.push(v);
            }

            expected.sort_unstable();
            prop_assert_eq!(drained, expected);
        }
    }
}
