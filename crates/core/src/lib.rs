//! The core public types shared by every Terra Classic ledger crate.

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod address;
pub mod chain;
pub mod coin;
pub mod dec;
pub mod event;
pub mod key;
pub mod storage;
pub mod uint;

/// Borsh binary encoding (re-exported) from official crate.
pub mod borsh {
    pub use borsh::*;
}

pub use {data_encoding, sha2};

/// Encode a value with borsh
pub fn encode<T>(value: &T) -> Vec<u8>
where
    T: borsh::BorshSerialize,
{
    borsh::to_vec(value).expect("Encoding to a vector shouldn't fail")
}

/// Decode a borsh encoded value
pub fn decode<T>(bytes: impl AsRef<[u8]>) -> std::io::Result<T>
where
    T: borsh::BorshDeserialize,
{
    T::try_from_slice(bytes.as_ref())
}

/// Compute the sha256 digest of some bytes
pub fn sha256(bytes: impl AsRef<[u8]>) -> [u8; 32] {
    use sha2::Digest;
    sha2::Sha256::digest(bytes.as_ref()).into()
}
