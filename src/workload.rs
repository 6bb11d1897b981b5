//! Phased add-then-remove workload over any [`OrderedSet`].
//!
//! Every worker adds its share of the keys, all workers meet at a barrier, then every worker
//! removes its share of the removal order. With a key set of `0..items` and both orders being
//! permutations of it, a correct set ends empty.

use core::fmt;
use core::str::FromStr;
use std::panic;
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::{
    busy_wait, CoarseList, CoarseTree, Config, FineList, FineTree, LockFreeList, LockFreeTree,
    OrderedSet,
};

/// Error type for invalid workload parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    /// The thread count is zero.
    #[error("thread count must be at least 1")]
    NoThreads,

    /// The item count is zero.
    #[error("item count must be at least 1")]
    NoItems,

    /// The items cannot be split evenly among the threads.
    #[error("item count {items} is not divisible by thread count {threads}")]
    Indivisible {
        /// Item count.
        items: usize,
        /// Thread count.
        threads: usize,
    },

    /// Keys are `i32`, so the item count must fit in one.
    #[error("item count {0} exceeds the key range")]
    TooManyItems(usize),

    /// The work data does not have one entry per item.
    #[error("work data holds {actual} keys per phase, expected {expected}")]
    DataLength {
        /// Item count of the parameters.
        expected: usize,
        /// Length of the shorter of the two key sequences.
        actual: usize,
    },

    /// A data structure name was not recognized.
    #[error("unknown data structure `{0}`, expected one of cgl, cgt, fgl, fgt, lfl, lft")]
    UnknownVariant(String),
}

/// Packs the run parameters into one seed, 16 bits apart: `items`, then `threads`, then the work
/// time in microseconds.
pub fn compute_seed(threads: usize, items: usize, work_time: Duration) -> u64 {
    let mut seed = items as u64;
    seed <<= 16;
    seed |= threads as u64;
    seed <<= 16;
    seed |= work_time.as_micros() as u64;
    seed
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    /// Number of worker threads.
    pub threads: usize,
    /// Number of keys added (and removed) in total.
    pub items: usize,
    /// Busy-wait before every operation, outside the set.
    pub work_time: Duration,
    /// Seed of the key orders.
    pub seed: u64,
    /// Whether the added keys may repeat.
    pub duplicates: bool,
}

impl Params {
    /// Creates parameters seeded with [`compute_seed`].
    pub fn new(threads: usize, items: usize, work_time: Duration, duplicates: bool) -> Self {
        Self {
            threads,
            items,
            work_time,
            seed: compute_seed(threads, items, work_time),
            duplicates,
        }
    }

    /// Replaces the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks that the keys can be split evenly among at least one thread.
    pub fn validate(&self) -> Result<(), WorkloadError> {
        if self.threads == 0 {
            return Err(WorkloadError::NoThreads);
        }
        if self.items == 0 {
            return Err(WorkloadError::NoItems);
        }
        if self.items % self.threads != 0 {
            return Err(WorkloadError::Indivisible {
                items: self.items,
                threads: self.threads,
            });
        }
        if i32::try_from(self.items).is_err() {
            return Err(WorkloadError::TooManyItems(self.items));
        }
        Ok(())
    }

    /// Number of keys each worker adds and removes.
    pub fn per_thread(&self) -> usize {
        self.items / self.threads
    }
}

/// The keys to add and to remove, in order. Worker `i` handles the `i`-th equal slice of each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkData {
    /// Keys added in the first phase.
    pub to_add: Vec<i32>,
    /// Keys removed in the second phase; the same multiset as `to_add`.
    pub to_remove: Vec<i32>,
}

impl WorkData {
    /// Generates the key orders for `params`, deterministically from its seed.
    ///
    /// Without duplicates, both orders are permutations of `0..items`. With duplicates, the keys
    /// are arbitrary `i32`s and the removal order is a permutation of them.
    pub fn generate(params: &Params) -> Result<Self, WorkloadError> {
        params.validate()?;

        let to_add = if params.duplicates {
            let mut rng = StdRng::seed_from_u64(params.seed);
            (0..params.items).map(|_| rng.gen::<i32>()).collect()
        } else {
            let mut keys = (0..params.items as i32).collect::<Vec<_>>();
            keys.shuffle(&mut StdRng::seed_from_u64(params.seed));
            keys
        };

        let mut to_remove = if params.duplicates {
            to_add.clone()
        } else {
            (0..params.items as i32).collect()
        };
        to_remove.shuffle(&mut StdRng::seed_from_u64(params.seed.wrapping_add(1)));

        Ok(Self { to_add, to_remove })
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Wall-clock time from the first spawn to the last join.
    pub elapsed: Duration,
    /// Dump before the first phase, in debug mode.
    pub before_add: Option<String>,
    /// Dump between the phases, in debug mode.
    pub after_add: Option<String>,
    /// Dump after the second phase; `[]` for a correct set.
    pub after_remove: String,
}

/// Runs both phases of the workload on `set`.
///
/// In debug mode, worker 0 records the dump between the phases while the others wait at a second
/// barrier. A panicking worker is propagated to the caller once every worker has been joined.
pub fn run<S>(
    set: &S,
    params: &Params,
    data: &WorkData,
    debug: bool,
) -> Result<Report, WorkloadError>
where
    S: OrderedSet<i32> + Sync,
{
    params.validate()?;
    let actual = data.to_add.len().min(data.to_remove.len());
    if data.to_add.len() != params.items || data.to_remove.len() != params.items {
        return Err(WorkloadError::DataLength {
            expected: params.items,
            actual,
        });
    }

    let per_thread = params.per_thread();
    let barrier = Barrier::new(params.threads);
    let work_time = params.work_time;

    info!(
        threads = params.threads,
        items = params.items,
        seed = params.seed,
        "workload started"
    );
    let start = Instant::now();

    let joined = thread::scope(|s| {
        let handles = (0..params.threads)
            .map(|id| {
                let barrier = &barrier;
                let range = id * per_thread..(id + 1) * per_thread;
                s.spawn(move || {
                    for &key in &data.to_add[range.clone()] {
                        busy_wait(work_time);
                        set.add(key);
                    }

                    let _ = barrier.wait();
                    let mut dump = None;
                    if debug {
                        if id == 0 {
                            dump = Some(set.debug_dump());
                        }
                        let _ = barrier.wait();
                    }

                    for key in &data.to_remove[range] {
                        busy_wait(work_time);
                        set.remove(key);
                    }
                    dump
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    });

    let elapsed = start.elapsed();
    let mut after_add = None;
    for result in joined {
        match result {
            Ok(dump) => after_add = after_add.or(dump),
            Err(payload) => panic::resume_unwind(payload),
        }
    }
    info!(elapsed_ms = elapsed.as_millis() as u64, "workload finished");

    Ok(Report {
        elapsed,
        before_add: None,
        after_add,
        after_remove: set.debug_dump(),
    })
}

/// The six set implementations, named as on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// [`CoarseList`].
    Cgl,
    /// [`CoarseTree`].
    Cgt,
    /// [`FineList`].
    Fgl,
    /// [`FineTree`].
    Fgt,
    /// [`LockFreeList`].
    Lfl,
    /// [`LockFreeTree`].
    Lft,
}

impl Variant {
    /// Every variant, in command-line order.
    pub const ALL: [Self; 6] = [
        Self::Cgl,
        Self::Cgt,
        Self::Fgl,
        Self::Fgt,
        Self::Lfl,
        Self::Lft,
    ];

    /// Short name of the variant.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cgl => "cgl",
            Self::Cgt => "cgt",
            Self::Fgl => "fgl",
            Self::Fgt => "fgt",
            Self::Lfl => "lfl",
            Self::Lft => "lft",
        }
    }

    /// Whether the variant may be fed duplicate keys. Only the lock-free tree may not.
    pub fn duplicates(self) -> bool {
        self != Self::Lft
    }

    /// The parameters this variant actually runs with: `params`, without duplicates for a variant
    /// that cannot take them.
    pub fn params(self, params: &Params) -> Params {
        Params {
            duplicates: params.duplicates && self.duplicates(),
            ..params.clone()
        }
    }

    /// Builds a fresh set of this variant with `config` and runs the workload on it.
    ///
    /// Duplicate keys are generated only if both `params.duplicates` and
    /// [`Variant::duplicates`] allow them.
    pub fn execute(
        self,
        config: Config,
        params: &Params,
        debug: bool,
    ) -> Result<Report, WorkloadError> {
        let params = self.params(params);
        let data = WorkData::generate(&params)?;

        match self {
            Self::Cgl => {
                let set: CoarseList<i32> = CoarseList::with_config(config);
                execute(&set, &params, &data, debug)
            }
            Self::Cgt => {
                let set: CoarseTree<i32> = CoarseTree::with_config(config);
                execute(&set, &params, &data, debug)
            }
            Self::Fgl => {
                let set: FineList<i32> = FineList::with_config(config);
                execute(&set, &params, &data, debug)
            }
            Self::Fgt => {
                let set: FineTree<i32> = FineTree::with_config(config);
                execute(&set, &params, &data, debug)
            }
            Self::Lfl => execute(&LockFreeList::with_config(config), &params, &data, debug),
            Self::Lft => execute(&LockFreeTree::with_config(config), &params, &data, debug),
        }
    }
}

fn execute<S>(
    set: &S,
    params: &Params,
    data: &WorkData,
    debug: bool,
) -> Result<Report, WorkloadError>
where
    S: OrderedSet<i32> + Sync,
{
    let before_add = debug.then(|| set.debug_dump());
    let report = run(set, params, data, debug)?;
    Ok(Report {
        before_add,
        ..report
    })
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = WorkloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.name() == s)
            .ok_or_else(|| WorkloadError::UnknownVariant(s.to_owned()))
    }
}
