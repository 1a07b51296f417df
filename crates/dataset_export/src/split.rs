use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Serialize;

use crate::config::{SplitName, SplitRatios};

/// Guards `floor(n * ratio)` against ratios like 0.7 landing just below an integer.
const RATIO_EPSILON: f64 = 1e-9;

/// Image ids partitioned into train/val/test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSplit {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
}

impl DatasetSplit {
    pub fn get(&self, name: SplitName) -> &[String] {
        match name {
            SplitName::Train => &self.train,
            SplitName::Val => &self.val,
            SplitName::Test => &self.test,
        }
    }

    /// Every split in train, val, test order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (SplitName, &[String])> {
        [SplitName::Train, SplitName::Val, SplitName::Test]
            .into_iter()
            .map(|name| (name, self.get(name)))
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }
}

fn count(n: usize, ratio: f64) -> usize {
    ((n as f64 * ratio + RATIO_EPSILON).floor() as usize).min(n)
}

/// Shuffle `ids` with `rng` and cut them by `ratios`.
///
/// Ids are sorted first so the result depends only on the id set and the
/// random source. `train = floor(n * train)`, `val = floor(n * val)`; the
/// remainder goes to test when a test ratio is set and to val otherwise.
pub fn split_dataset<R: Rng + ?Sized>(
    mut ids: Vec<String>,
    ratios: &SplitRatios,
    rng: &mut R,
) -> DatasetSplit {
    ids.sort();
    ids.shuffle(rng);

    let n = ids.len();
    let train_count = count(n, ratios.train);
    let val_count = count(n, ratios.val).min(n - train_count);

    let mut rest = ids.split_off(train_count);
    let train = ids;
    let remainder = rest.split_off(val_count);
    let mut val = rest;

    let test = if ratios.test > 0.0 {
        remainder
    } else {
        val.extend(remainder);
        Vec::new()
    };

    DatasetSplit { train, val, test }
}

/// [`split_dataset`] with a seeded generator, or the thread generator without a seed.
pub fn seeded_split(ids: Vec<String>, ratios: &SplitRatios, seed: Option<u64>) -> DatasetSplit {
    match seed {
        Some(seed) => split_dataset(ids, ratios, &mut StdRng::seed_from_u64(seed)),
        None => split_dataset(ids, ratios, &mut rand::thread_rng()),
    }
}
