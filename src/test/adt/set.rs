//! Testing utilities for ordered set types.

use core::fmt::Debug;
use core::iter;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::{Acquire, Release};
use std::sync::Barrier;
use std::thread::scope;

use rand::prelude::*;

use crate::test::RandGen;
use crate::OrderedSet;

fn remove_one<T: Ord>(counts: &mut BTreeMap<T, usize>, key: &T) {
    if let Some(count) = counts.get_mut(key) {
        *count -= 1;
        if *count == 0 {
            let _ = counts.remove(key);
        }
    }
}

fn assert_sorted<T: Debug + Ord>(keys: &[T]) {
    assert!(
        keys.windows(2).all(|k| k[0] <= k[1]),
        "keys out of order: {keys:?}"
    );
}

/// Runs many operations in a single thread and tests if it works like an ordered multiset, using a
/// `BTreeMap` of key counts as reference.
///
/// Without `duplicates`, a key that is already present is not added again.
pub fn stress_sequential<T, S>(steps: usize, duplicates: bool)
where
    T: Clone + Debug + Ord + RandGen,
    S: Default + OrderedSet<T>,
{
    enum Ops {
        Add,
        ContainsSome,
        ContainsNone,
        RemoveSome,
        RemoveNone,
        Snapshot,
    }
    const OPS: [Ops; 6] = [
        Ops::Add,
        Ops::ContainsSome,
        Ops::ContainsNone,
        Ops::RemoveSome,
        Ops::RemoveNone,
        Ops::Snapshot,
    ];

    let mut rng = thread_rng();
    let set = S::default();
    let mut counts = BTreeMap::<T, usize>::new();

    for i in 0..steps {
        let op = OPS.choose(&mut rng).unwrap();

        match op {
            Ops::Add => {
                let key = T::rand_gen(&mut rng);
                if !duplicates && counts.contains_key(&key) {
                    continue;
                }

                println!("iteration {i}: add({key:?})");

                set.add(key.clone());
                *counts.entry(key).or_insert(0) += 1;
            }
            Ops::ContainsSome => {
                let Some(key) = counts.keys().choose(&mut rng) else {
                    continue;
                };

                println!("iteration {i}: contains({key:?}) (existing)");

                assert!(set.contains(key));
            }
            Ops::ContainsNone => {
                let key = T::rand_gen(&mut rng);
                let expected = counts.contains_key(&key);
                let non = if expected { "" } else { "non-" };

                println!("iteration {i}: contains({key:?}) ({non}existing)");

                assert_eq!(set.contains(&key), expected);
            }
            Ops::RemoveSome => {
                let Some(key) = counts.keys().choose(&mut rng).cloned() else {
                    continue;
                };

                println!("iteration {i}: remove({key:?}) (existing)");

                set.remove(&key);
                remove_one(&mut counts, &key);
            }
            Ops::RemoveNone => {
                let key = T::rand_gen(&mut rng);

                println!("iteration {i}: remove({key:?})");

                set.remove(&key);
                remove_one(&mut counts, &key);
            }
            Ops::Snapshot => {
                println!("iteration {i}: snapshot");

                let expected = counts
                    .iter()
                    .flat_map(|(key, &count)| iter::repeat(key.clone()).take(count))
                    .collect::<Vec<_>>();
                assert_eq!(set.snapshot(), expected);
            }
        }
    }
}

/// Randomly runs many operations concurrently over a shared key range, then checks that the
/// remaining keys are sorted and can all be removed again.
///
/// Equal keys are added by many threads, so the set must tolerate duplicates.
pub fn stress_concurrent<T, S>(threads: usize, steps: usize)
where
    T: Clone + Debug + Ord + RandGen,
    S: Default + Sync + OrderedSet<T>,
{
    enum Ops {
        Add,
        Remove,
        Contains,
    }
    const OPS: [Ops; 3] = [Ops::Add, Ops::Remove, Ops::Contains];

    let set = S::default();

    scope(|s| {
        for _ in 0..threads {
            let _ = s.spawn(|| {
                let mut rng = thread_rng();
                for _ in 0..steps {
                    let op = OPS.choose(&mut rng).unwrap();
                    let key = T::rand_gen(&mut rng);

                    match op {
                        Ops::Add => set.add(key),
                        Ops::Remove => set.remove(&key),
                        Ops::Contains => {
                            let _ = set.contains(&key);
                        }
                    }
                }
            });
        }
    });

    let keys = set.snapshot();
    assert_sorted(&keys);
    for key in &keys {
        assert!(set.contains(key), "{key:?} listed but not found");
        set.remove(key);
    }
    assert!(set.snapshot().is_empty());
}

/// Randomly runs many operations concurrently where thread `t` owns the keys `k` with
/// `k % threads == t` and adds a key only while it is absent, so keys stay unique.
///
/// Since nobody else touches its keys, every thread can check `contains` against its own record.
/// At the end the set must hold exactly the union of the records.
pub fn owned_keys_concurrent<S>(threads: usize, steps: usize)
where
    S: Default + Sync + OrderedSet<i32>,
{
    const KEYS_PER_THREAD: i32 = 64;

    let set = S::default();
    let stride = threads as i32;

    let records = scope(|s| {
        let handles = (0..stride)
            .map(|t| {
                let set = &set;
                s.spawn(move || {
                    let mut rng = thread_rng();
                    let mut present = BTreeSet::new();
                    for _ in 0..steps {
                        let key = rng.gen_range(0..KEYS_PER_THREAD) * stride + t;
                        assert_eq!(set.contains(&key), present.contains(&key), "key {key}");

                        if present.contains(&key) {
                            set.remove(&key);
                            let _ = present.remove(&key);
                        } else {
                            set.add(key);
                            let _ = present.insert(key);
                        }
                        assert_eq!(set.contains(&key), present.contains(&key), "key {key}");
                    }
                    present
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect::<BTreeSet<_>>()
    });

    assert_eq!(set.snapshot(), records.into_iter().collect::<Vec<_>>());
}

/// Every thread adds its own disjoint block of `per_thread` keys in random order, waits for all
/// the others, then removes the same keys in another random order. Nothing may be left behind.
pub fn no_loss_concurrent<S>(threads: usize, per_thread: usize)
where
    S: Default + Sync + OrderedSet<i32>,
{
    let set = S::default();
    let barrier = Barrier::new(threads);

    scope(|s| {
        for t in 0..threads {
            let set = &set;
            let barrier = &barrier;
            let _ = s.spawn(move || {
                let mut rng = thread_rng();
                let mut keys = (0..per_thread)
                    .map(|i| (i * threads + t) as i32)
                    .collect::<Vec<_>>();

                keys.shuffle(&mut rng);
                for &key in &keys {
                    set.add(key);
                }

                let _ = barrier.wait();

                keys.shuffle(&mut rng);
                for key in &keys {
                    set.remove(key);
                }
            });
        }
    });

    assert_eq!(set.debug_dump(), "[]");
}

/// Every thread adds each of the keys `0..keys` once, so each key ends up stored `threads` times.
/// Then every thread removes each key once, which must remove every copy.
pub fn duplicates_concurrent<S>(threads: usize, keys: i32)
where
    S: Default + Sync + OrderedSet<i32>,
{
    let set = S::default();

    scope(|s| {
        for _ in 0..threads {
            let _ = s.spawn(|| {
                let mut order = (0..keys).collect::<Vec<_>>();
                order.shuffle(&mut thread_rng());
                for key in order {
                    set.add(key);
                }
            });
        }
    });

    let expected = (0..keys)
        .flat_map(|key| iter::repeat(key).take(threads))
        .collect::<Vec<_>>();
    assert_eq!(set.snapshot(), expected);

    scope(|s| {
        for _ in 0..threads {
            let _ = s.spawn(|| {
                let mut order = (0..keys).collect::<Vec<_>>();
                order.shuffle(&mut thread_rng());
                for key in &order {
                    set.remove(key);
                }
            });
        }
    });

    assert_eq!(set.debug_dump(), "[]");
}

/// Checks snapshots taken while other threads add and remove odd keys: each snapshot must be
/// sorted and must contain every pre-filled even key, which nobody touches.
pub fn snapshot_consistent<S>(threads: usize, steps: usize)
where
    S: Default + Sync + OrderedSet<i32>,
{
    let set = S::default();

    // pre-fill with even numbers, in an order that keeps a tree shallow
    let mut evens = (0..100).map(|i| 2 * i).collect::<Vec<i32>>();
    evens.shuffle(&mut thread_rng());
    for &key in &evens {
        set.add(key);
    }
    let evens = evens.into_iter().collect::<HashSet<_>>();

    let done = AtomicUsize::new(0);
    let stride = threads as i32;
    scope(|s| {
        // add or remove odd numbers, each thread in its own residue class
        for t in 0..stride {
            let set = &set;
            let done = &done;
            let _ = s.spawn(move || {
                let mut rng = thread_rng();
                let mut present = HashSet::new();
                for _ in 0..steps {
                    let key = 2 * (rng.gen_range(0..16) * stride + t) + 1;
                    if present.remove(&key) {
                        set.remove(&key);
                    } else {
                        set.add(key);
                        let _ = present.insert(key);
                    }
                }
                let _ = done.fetch_add(1, Release);
            });
        }

        let _ = s.spawn(|| {
            while done.load(Acquire) < threads {
                let snapshot = set.snapshot();
                assert_sorted(&snapshot);
                let snapshot = snapshot.into_iter().collect::<HashSet<_>>();
                assert!(evens.is_subset(&snapshot));
            }
        });
    });
}
