use crate::api::Partitioner;
use crate::domain::BucketDomain;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Hash routing for free-form keys (addresses, words, literals).
pub struct HashPartitioner;

impl<K: Hash> Partitioner<K> for HashPartitioner {
    fn partition(&self, key: &K, num_partitions: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % num_partitions
    }
}

/// Fixed-table routing for bounded domains: one bucket per domain member,
/// `Jan -> 0 .. Dec -> 11`, `00 -> 0 .. 23 -> 23`. The reduce task count
/// must equal the domain size; anything else is a wiring bug in the
/// driver, caught immediately.
pub struct DomainPartitioner<K>(PhantomData<fn() -> K>);

impl<K> Default for DomainPartitioner<K> {
    fn default() -> Self {
        DomainPartitioner(PhantomData)
    }
}

impl<K: BucketDomain> Partitioner<K> for DomainPartitioner<K> {
    fn partition(&self, key: &K, num_partitions: usize) -> usize {
        assert_eq!(
            num_partitions,
            K::SIZE,
            "partition count must match the key domain size"
        );
        key.bucket()
    }
}
