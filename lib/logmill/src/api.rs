use anyhow::Result;
use std::hash::Hash;

// ========== Core pipeline traits: the contract with the execution engine ==========

pub trait Mapper {
    type Input: Send + 'static;
    type Key: Send + Hash + Eq + Ord + Clone + 'static;
    type Value: Send + 'static;

    fn do_map<I, F>(&self, input: I, emit: &mut F)
    where
        I: IntoIterator<Item = Self::Input>,
        F: FnMut(Self::Key, Self::Value);
}

/// One reducer instance is built per reduce task and owns any resources it
/// acquires (a store handle, buffers). `setup` runs once before the first
/// key group, `cleanup` once after the last, on every exit path including
/// failure. A failed task is abandoned as a whole, never resumed mid-key.
pub trait Reducer {
    type Key: Send + Hash + Eq + Ord + Clone + 'static;
    type ValueIn: Send + 'static;

    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    fn do_reduce<I, F>(&mut self, key: &Self::Key, values: I, emit: &mut F) -> Result<()>
    where
        I: IntoIterator<Item = Self::ValueIn>,
        F: FnMut(String);

    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Local pre-aggregation applied to one map task's output before the
/// grouped handoff. The engine may run it zero, one, or several times;
/// implementations must keep final aggregates unchanged either way.
pub trait Combiner {
    type Key;
    type Value;

    fn combine(&self, key: &Self::Key, values: Vec<Self::Value>) -> Vec<Self::Value>;
}

/// Deterministic routing of a key to one of `num_partitions` buckets.
/// Every mapper instance must compute the same bucket for the same key.
pub trait Partitioner<K> {
    fn partition(&self, key: &K, num_partitions: usize) -> usize;
}
