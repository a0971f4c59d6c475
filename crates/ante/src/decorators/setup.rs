use terra_gas::TxGasMeter;
use terra_storage::StorageRead;
use terra_tx::Tx;

use crate::{Ctx, Result};

/// Name of the first step of the chain
pub const SETUP_CONTEXT: &str = "setup_context";

/// Install the tx's gas meter: infinite while applying genesis, else
/// limited to the tx's gas limit
pub fn set_up_context<S>(ctx: &mut Ctx<'_, S>, tx: &Tx) -> Result<()>
where
    S: StorageRead,
{
    let height = ctx.storage.get_block_height()?;
    ctx.gas_meter = if height.is_genesis() {
        TxGasMeter::new_infinite()
    } else {
        TxGasMeter::new(tx.gas())
    };
    Ok(())
}
