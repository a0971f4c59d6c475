//! Treasury tax proceeds, accumulated over an epoch and archived under the
//! epoch number at its last block

use terra_core::chain::Epoch;
use terra_core::coin::Coins;
use terra_core::storage::Key;
use terra_storage::{StorageRead, StorageWrite};

use crate::{Error, Result};

const TREASURY_SEG: &str = "treasury";
const TAX_PROCEEDS_SEG: &str = "tax_proceeds";
const EPOCH_TAX_PROCEEDS_SEG: &str = "epoch_tax_proceeds";

/// Obtain the storage key of the current epoch's tax proceeds
pub fn tax_proceeds_key() -> Key {
    Key::from_seg(&TREASURY_SEG).push(&TAX_PROCEEDS_SEG)
}

/// Obtain the storage key of an archived epoch's tax proceeds
pub fn epoch_tax_proceeds_key(epoch: Epoch) -> Key {
    Key::from_seg(&TREASURY_SEG)
        .push(&EPOCH_TAX_PROCEEDS_SEG)
        .push(&epoch)
}

/// The tax collected so far in the current epoch
pub fn read_tax_proceeds<S>(storage: &S) -> Result<Coins>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&tax_proceeds_key())?.unwrap_or_default())
}

/// Add collected tax to the current epoch's proceeds
pub fn record_tax_proceeds<S>(storage: &mut S, tax: &Coins) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    if tax.is_zero() {
        return Ok(());
    }
    let proceeds = read_tax_proceeds(storage)?
        .checked_add(tax)
        .ok_or(Error::Overflow)?;
    storage.write(&tax_proceeds_key(), proceeds)?;
    Ok(())
}

/// The tax proceeds of an archived epoch
pub fn read_epoch_tax_proceeds<S>(storage: &S, epoch: Epoch) -> Result<Coins>
where
    S: StorageRead + ?Sized,
{
    Ok(storage
        .read(&epoch_tax_proceeds_key(epoch))?
        .unwrap_or_default())
}

/// Archive the current proceeds under `epoch` and start a new epoch
pub fn archive_epoch<S>(storage: &mut S, epoch: Epoch) -> Result<Coins>
where
    S: StorageRead + StorageWrite,
{
    let proceeds = read_tax_proceeds(storage)?;
    storage.write(&epoch_tax_proceeds_key(epoch), &proceeds)?;
    storage.delete(&tax_proceeds_key())?;
    tracing::info!(epoch = epoch.0, %proceeds, "Archived epoch tax proceeds");
    Ok(proceeds)
}

#[cfg(test)]
mod tests {
    use terra_core::coin::testing::coins;
    use terra_storage::MockStore;

    use super::*;

    #[test]
    fn test_epoch_proceeds() {
        let mut storage = MockStore::default();
        record_tax_proceeds(&mut storage, &coins("10usdr")).unwrap();
        record_tax_proceeds(&mut storage, &coins("5usdr,1uusd")).unwrap();
        assert_eq!(
            archive_epoch(&mut storage, Epoch(3)).unwrap(),
            coins("15usdr,1uusd")
        );
        assert!(read_tax_proceeds(&storage).unwrap().is_zero());
        assert_eq!(
            read_epoch_tax_proceeds(&storage, Epoch(3)).unwrap(),
            coins("15usdr,1uusd")
        );
        assert!(read_epoch_tax_proceeds(&storage, Epoch(2))
            .unwrap()
            .is_zero());
    }
}
