use crate::api::{Combiner, Reducer};
use anyhow::Result;
use std::fmt::Display;
use std::hash::Hash;
use std::marker::PhantomData;

/// Pass-through combiner: the grouped handoff receives exactly what the
/// mapper emitted.
pub struct NoCombiner<K, V>(PhantomData<fn() -> (K, V)>);

impl<K, V> Default for NoCombiner<K, V> {
    fn default() -> Self {
        NoCombiner(PhantomData)
    }
}

impl<K, V> Combiner for NoCombiner<K, V> {
    type Key = K;
    type Value = V;

    fn combine(&self, _key: &K, values: Vec<V>) -> Vec<V> {
        values
    }
}

/// Folds per-key count contributions into a single partial sum. Summation
/// is commutative and associative, so applying this any number of times
/// between emission and reduction leaves final counts unchanged.
pub struct SumCombiner<K>(PhantomData<fn() -> K>);

impl<K> Default for SumCombiner<K> {
    fn default() -> Self {
        SumCombiner(PhantomData)
    }
}

impl<K> Combiner for SumCombiner<K> {
    type Key = K;
    type Value = u64;

    fn combine(&self, _key: &K, values: Vec<u64>) -> Vec<u64> {
        vec![values.into_iter().sum()]
    }
}

/// Stock count reducer: sums the values of a key group and emits one
/// `<key>\t<count>` output record.
pub struct SumReducer<K>(PhantomData<fn() -> K>);

impl<K> Default for SumReducer<K> {
    fn default() -> Self {
        SumReducer(PhantomData)
    }
}

impl<K> Reducer for SumReducer<K>
where
    K: Display + Send + Hash + Eq + Ord + Clone + 'static,
{
    type Key = K;
    type ValueIn = u64;

    fn do_reduce<I, F>(&mut self, key: &K, values: I, emit: &mut F) -> Result<()>
    where
        I: IntoIterator<Item = u64>,
        F: FnMut(String),
    {
        let total: u64 = values.into_iter().sum();
        emit(format!("{}\t{}", key, total));
        Ok(())
    }
}

/// Tallies the distinct values of a key group and emits one
/// `<value>\t<occurrences>` record per value, in value order. Used by the
/// bucket pipelines to report per-address request counts inside each
/// bucket's output file.
pub struct ValueTallyReducer<K>(PhantomData<fn() -> K>);

impl<K> Default for ValueTallyReducer<K> {
    fn default() -> Self {
        ValueTallyReducer(PhantomData)
    }
}

impl<K> Reducer for ValueTallyReducer<K>
where
    K: Send + Hash + Eq + Ord + Clone + 'static,
{
    type Key = K;
    type ValueIn = String;

    fn do_reduce<I, F>(&mut self, _key: &K, values: I, emit: &mut F) -> Result<()>
    where
        I: IntoIterator<Item = String>,
        F: FnMut(String),
    {
        let mut tallies: std::collections::BTreeMap<String, u64> = std::collections::BTreeMap::new();
        for value in values {
            *tallies.entry(value).or_insert(0) += 1;
        }
        for (value, count) in tallies {
            emit(format!("{}\t{}", value, count));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_combiner_is_safe_under_regrouping() {
        let combiner = SumCombiner::<String>::default();
        let key = "X".to_string();

        // Partial sums merged in any grouping equal direct summation.
        let once = combiner.combine(&key, vec![2, 3]);
        let merged = combiner.combine(&key, [once.clone(), vec![1]].concat());
        let direct = combiner.combine(&key, vec![2, 3, 1]);
        assert_eq!(merged, vec![6]);
        assert_eq!(direct, vec![6]);

        // Re-applying to already-combined output changes nothing.
        assert_eq!(combiner.combine(&key, merged), vec![6]);
    }

    #[test]
    fn sum_reducer_emits_tab_separated_count() {
        let mut reducer = SumReducer::<String>::default();
        let mut lines = Vec::new();
        reducer
            .do_reduce(&"1.2.3.4".to_string(), vec![1, 1, 4], &mut |l| lines.push(l))
            .unwrap();
        assert_eq!(lines, vec!["1.2.3.4\t6".to_string()]);
    }

    #[test]
    fn no_combiner_keeps_values() {
        let combiner = NoCombiner::<String, u64>::default();
        assert_eq!(combiner.combine(&"k".into(), vec![1, 1, 1]), vec![1, 1, 1]);
    }

    #[test]
    fn value_tally_counts_each_distinct_value() {
        use crate::domain::Month;

        let mut reducer = ValueTallyReducer::<Month>::default();
        let values = vec!["10.0.0.1", "10.0.0.2", "10.0.0.1"]
            .into_iter()
            .map(String::from);
        let mut lines = Vec::new();
        reducer
            .do_reduce(&Month::Apr, values, &mut |l| lines.push(l))
            .unwrap();
        assert_eq!(lines, vec!["10.0.0.1\t2".to_string(), "10.0.0.2\t1".to_string()]);
    }
}
