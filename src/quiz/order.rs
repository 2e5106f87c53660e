use rand::seq::SliceRandom;
use rand::thread_rng;

/// Source of presentation orderings for questions and options.
pub trait Permute: Send + Sync {
    /// Returns a permutation of `0..len`.
    fn permutation(&self, len: usize) -> Vec<usize>;

    /// Reorders `items` according to `permutation(items.len())`.
    fn apply<T>(&self, items: Vec<T>) -> Vec<T>
    where
        Self: Sized,
    {
        let order = self.permutation(items.len());
        debug_assert_eq!(order.len(), items.len(), "permutation length mismatch");
        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect()
    }
}

/// Uniform shuffle backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOrder;

impl Permute for RandomOrder {
    fn permutation(&self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut thread_rng());
        order
    }
}
