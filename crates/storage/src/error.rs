//! Storage errors

use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Borsh coding error: {0}")]
    Coding(#[from] std::io::Error),
    #[error("Inconsistent state: {0}")]
    Inconsistent(&'static str),
}

/// Result of a storage call
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test_error {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{Key, MockStore, StorageRead, StorageWrite};

    #[test]
    fn test_undecodable_value() {
        let mut storage = MockStore::default();
        let key = Key::from_seg(&"balance");
        storage.write_bytes(&key, [1_u8]).unwrap();
        let err = storage.read::<u64>(&key).unwrap_err();
        assert_matches!(&err, Error::Coding(_));
        assert!(err.to_string().starts_with("Borsh coding error"));
    }
}
