use std::hash::Hash;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

use super::partition::{self, Partition};

/// Seed used by a freshly created view until `set_random_number_generator_seed` is called
pub const DEFAULT_SEED: u64 = 0;

/// An orderable, shuffle-able and foldable view over `n` stored instances.
///
/// The view never touches the instances themselves. It maintains the full order (a permutation
/// of the storage indices `0..n`), the training and test index sequences derived from the
/// current partition, and the random number generator used for shuffling.
#[derive(Debug, Clone)]
pub struct AccessView {
    full_order: Vec<usize>,
    training: Vec<usize>,
    test: Vec<usize>,
    partition: Partition,
    rng: StdRng,
}

impl AccessView {
    /// Create a merged view over `n` instances in insertion order
    pub fn new(n: usize) -> Self {
        let full_order: Vec<usize> = (0..n).collect();
        AccessView {
            training: full_order.clone(),
            test: Vec::new(),
            full_order,
            partition: Partition::None,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
        }
    }

    pub fn size(&self) -> usize {
        self.full_order.len()
    }

    pub fn full_order(&self) -> &[usize] {
        &self.full_order
    }

    pub fn training_indices(&self) -> &[usize] {
        &self.training
    }

    pub fn test_indices(&self) -> &[usize] {
        &self.test
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn number_of_folds(&self) -> usize {
        self.partition.number_of_folds()
    }

    /// Index of the test fold, 0 when not split into folds
    pub fn test_fold(&self) -> usize {
        match self.partition {
            Partition::Folds { test_fold, .. } => test_fold,
            _ => 0,
        }
    }

    /// Number of instances in fold `k`, 0 if there is no such fold
    pub fn fold_dimension(&self, k: usize) -> usize {
        match self.partition {
            Partition::Folds { ref membership, .. } => membership.get(k).map_or(0, Vec::len),
            _ => 0,
        }
    }

    /// Called by the owning dataset after an instance was appended to the store
    pub fn grow(&mut self) {
        let i = self.full_order.len();
        self.full_order.push(i);
        self.merge();
    }

    /// Called by the owning dataset after the store was emptied
    pub fn reset(&mut self) {
        self.full_order.clear();
        self.merge();
    }

    /// Remove any partition. Everything becomes training data, the full order is kept.
    pub fn merge(&mut self) {
        self.partition = Partition::None;
        self.training = self.full_order.clone();
        self.test.clear();
    }

    /// Return to insertion order and merge
    pub fn restore(&mut self) {
        for (i, x) in self.full_order.iter_mut().enumerate() {
            *x = i;
        }
        self.merge();
    }

    pub fn split_in_folds(&mut self, n_folds: usize) -> Result<()> {
        if partition::is_merge_request(n_folds) {
            self.merge();
            return Ok(());
        }

        let membership = partition::contiguous_folds(self.size(), n_folds)?;
        self.set_partition(Partition::Folds {
            test_fold: 0,
            membership,
        });
        Ok(())
    }

    /// Split into folds balanced over the classes `key_of(storage_index)`.
    ///
    /// On a degenerate split the view is merged before the error is returned. Invalid fold
    /// counts leave the view untouched.
    pub fn split_in_stratified_folds<K, F>(&mut self, n_folds: usize, key_of: F) -> Result<()>
    where
        K: Eq + Hash,
        F: Fn(usize) -> K,
    {
        if partition::is_merge_request(n_folds) {
            self.merge();
            return Ok(());
        }

        partition::check_fold_count(self.size(), n_folds)?;
        let keys: Vec<K> = self.full_order.iter().map(|&i| key_of(i)).collect();

        match partition::stratified_folds(&keys, n_folds) {
            Ok(membership) => {
                self.set_partition(Partition::Folds {
                    test_fold: 0,
                    membership,
                });
                Ok(())
            }
            Err(e @ Error::DegenerateSplit { .. }) => {
                error!("{}", e);
                self.merge();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Use the first `percent` % of the full order as test set
    pub fn split_test_fold_percent(&mut self, percent: u32) -> Result<()> {
        let test_count = partition::percent_test_count(self.size(), percent)?;
        if percent == 0 {
            self.merge();
            return Ok(());
        }
        self.set_partition(Partition::Percent { test_count });
        Ok(())
    }

    /// Select the test fold. Only meaningful when split into folds; otherwise a no-op.
    ///
    /// The training set is rebuilt in canonical fold order, so a previous training set shuffle
    /// is lost.
    pub fn set_test_fold(&mut self, k: usize) -> Result<()> {
        match self.partition {
            Partition::Folds {
                ref mut test_fold,
                ref membership,
            } => {
                if k >= membership.len() {
                    return Err(Error::InvalidArgument(format!(
                        "test fold {} out of range ({} folds)",
                        k,
                        membership.len()
                    )));
                }
                *test_fold = k;
            }
            _ => return Ok(()),
        }
        self.rebuild();
        Ok(())
    }

    /// Draw a new random full order.
    ///
    /// An active partition is kept as it is. Because partitions refer to positions in the full
    /// order, instances move between training and test sets. Merge before shuffling and split
    /// again afterwards to get a clean repartition.
    pub fn random_shuffle_dataset(&mut self) {
        let n = self.full_order.len();
        self.full_order.clear();
        self.full_order.extend(0..n);
        self.full_order.shuffle(&mut self.rng);
        self.rebuild();
    }

    /// Permute the training indices. The test indices are not affected.
    pub fn random_shuffle_training_set(&mut self) {
        if self.training.is_empty() {
            return;
        }
        self.training.shuffle(&mut self.rng);
    }

    pub fn set_random_number_generator_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn set_partition(&mut self, partition: Partition) {
        self.partition = partition;
        self.rebuild();
    }

    /// Derive training and test indices from the partition and the full order
    fn rebuild(&mut self) {
        let order = &self.full_order;
        self.training.clear();
        self.test.clear();

        match self.partition {
            Partition::None => self.training.extend_from_slice(order),
            Partition::Percent { test_count } => {
                self.test.extend_from_slice(&order[..test_count]);
                self.training.extend_from_slice(&order[test_count..]);
            }
            Partition::Folds {
                test_fold,
                ref membership,
            } => {
                for (k, fold) in membership.iter().enumerate() {
                    let target = if k == test_fold {
                        &mut self.test
                    } else {
                        &mut self.training
                    };
                    target.extend(fold.iter().map(|&p| order[p]));
                }
            }
        }
    }
}
