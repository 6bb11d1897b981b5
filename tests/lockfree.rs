use sorted_sets::test::adt::set;
use sorted_sets::{LockFreeList, LockFreeTree, OrderedSet};

#[test]
fn smoke() {
    let list = LockFreeList::new();
    list.add(2);
    list.add(1);
    list.add(2);
    list.remove(&2);
    assert_eq!(list.debug_dump(), "[1, 2]");

    let tree = LockFreeTree::new();
    tree.add(2);
    tree.add(1);
    tree.add(3);
    tree.remove(&2);
    assert_eq!(tree.debug_dump(), "[1, 3]");
    assert!(!tree.contains(&2));
    tree.add(2);
    assert_eq!(tree.debug_dump(), "[1, 2, 3]");
}

#[test]
fn list_stress_sequential() {
    const STEPS: usize = 4096;
    set::stress_sequential::<u8, LockFreeList<u8>>(STEPS, true);
}

#[test]
fn tree_stress_sequential() {
    const STEPS: usize = 4096;
    set::stress_sequential::<i32, LockFreeTree<i32>>(STEPS, false);
    set::stress_sequential::<u8, LockFreeTree<u8>>(STEPS, false);
}

#[test]
fn list_stress_concurrent() {
    const THREADS: usize = 16;
    const STEPS: usize = 4096 * 4;
    set::stress_concurrent::<u8, LockFreeList<u8>>(THREADS, STEPS);
}

#[test]
fn owned_keys_concurrent() {
    const THREADS: usize = 16;
    const STEPS: usize = 4096;
    set::owned_keys_concurrent::<LockFreeList<i32>>(THREADS, STEPS);
    set::owned_keys_concurrent::<LockFreeTree<i32>>(THREADS, STEPS);
}

#[test]
fn no_loss_concurrent() {
    set::no_loss_concurrent::<LockFreeList<i32>>(16, 256);
    set::no_loss_concurrent::<LockFreeTree<i32>>(16, 256);
}

#[test]
fn list_duplicates_concurrent() {
    set::duplicates_concurrent::<LockFreeList<i32>>(8, 64);
}

#[test]
fn snapshot_consistent() {
    const THREADS: usize = 8;
    const STEPS: usize = 4096 * 4;
    set::snapshot_consistent::<LockFreeList<i32>>(THREADS, STEPS);
    set::snapshot_consistent::<LockFreeTree<i32>>(THREADS, STEPS);
}
