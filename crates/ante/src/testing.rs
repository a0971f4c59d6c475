//! Fixtures for testing the admission pipeline

use terra_core::address::testing::{address_1, address_2};
use terra_core::address::Address;
use terra_core::chain::{BlockHeight, ChainId};
use terra_core::coin::testing::coins;
use terra_core::coin::Coins;
use terra_core::key::testing::{keypair_1, keypair_2};
use terra_core::key::SecretKey;
use terra_parameters::Parameters;
use terra_storage::MockStore;
use terra_tx::Msg;

/// The chain id used in tests
pub const TEST_CHAIN_ID: &str = "localterra";

/// A store at height 1 of the test chain with the given parameters
pub fn init_storage_with(parameters: &Parameters) -> MockStore {
    let mut storage = MockStore::new(ChainId::from(TEST_CHAIN_ID));
    storage.set_block_height(BlockHeight(1));
    terra_parameters::init_storage(parameters, &mut storage)
        .expect("Test parameters must be valid");
    storage
}

/// A store at height 1 of the test chain with the default parameters
pub fn init_storage() -> MockStore {
    init_storage_with(&Parameters::default())
}

/// Credit coins to an account
pub fn fund(storage: &mut MockStore, owner: &Address, amount: &str) {
    terra_bank::credit_tokens(storage, owner, &coins(amount))
        .expect("Crediting test tokens must not fail");
}

/// A send of `amount` from `address_1` to `address_2`
pub fn send(amount: &str) -> Msg {
    Msg::Send {
        from: address_1(),
        to: address_2(),
        amount: coins(amount),
    }
}

/// A send of `amount` between two accounts
pub fn send_between(from: Address, to: Address, amount: Coins) -> Msg {
    Msg::Send { from, to, amount }
}

/// The first test signer and its address
pub fn signer_1() -> (SecretKey, Address) {
    let sk = keypair_1();
    let address = sk.ref_to().address();
    (sk, address)
}

/// The second test signer and its address
pub fn signer_2() -> (SecretKey, Address) {
    let sk = keypair_2();
    let address = sk.ref_to().address();
    (sk, address)
}
