use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use anyhow::{Result, Context};

/// One fjall partition and the keyspace it lives in
pub struct FjallWrapper {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallWrapper {
    pub fn with_partition<P: AsRef<Path>>(path: P, partition: &str) -> Result<Self> {
        let keyspace = Config::new(path)
            .open()
            .context("Failed to open Fjall keyspace")?;

        let partition = keyspace
            .open_partition(partition, PartitionCreateOptions::default())
            .context(format!("Failed to open partition '{}'", partition))?;

        Ok(Self {
            keyspace,
            partition,
        })
    }

    /// Another partition of the same keyspace
    ///
    /// A keyspace directory can only be opened once per process, so sibling
    /// namespaces are reached through this rather than `with_partition`.
    pub fn sibling(&self, partition: &str) -> Result<Self> {
        let handle = self
            .keyspace
            .open_partition(partition, PartitionCreateOptions::default())
            .context(format!("Failed to open partition '{}'", partition))?;

        Ok(Self {
            keyspace: self.keyspace.clone(),
            partition: handle,
        })
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.partition.insert(key, value)
            .context("Failed to put value in DB")?;
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let res = self.partition
            .get(key)
            .context("Failed to get value from DB")?;
        Ok(res.map(|slice| slice.to_vec()))
    }

    /// Iterate over all key/value pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_ {
        self.partition.iter().map(|item| {
            let (key, value) = item.context("Failed to read entry from DB")?;
            Ok((key.to_vec(), value.to_vec()))
        })
    }

    /// Durably persist everything written so far
    pub fn flush(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist keyspace")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kv_operations() {
        let temp_dir = TempDir::new().unwrap();
        let db = FjallWrapper::with_partition(temp_dir.path(), "test").unwrap();

        db.put(b"b", b"2").unwrap();
        db.put(b"a", b"1").unwrap();
        assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));

        let keys: Vec<Vec<u8>> = db.iter().map(|r| r.unwrap().0).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);

        db.flush().unwrap();
    }

    #[test]
    fn test_sibling_partitions_are_separate() {
        let temp_dir = TempDir::new().unwrap();
        let first = FjallWrapper::with_partition(temp_dir.path(), "first").unwrap();
        let second = first.sibling("second").unwrap();

        first.put(b"k", b"1").unwrap();
        second.put(b"k", b"2").unwrap();
        assert_eq!(first.get(b"k").unwrap(), Some(b"1".to_vec()));
        assert_eq!(second.get(b"k").unwrap(), Some(b"2".to_vec()));
        assert_eq!(second.iter().count(), 1);
    }
}
