//! The steps of the admission pipeline, in the order
//! [`AnteHandler`](crate::AnteHandler) runs them

mod basic;
mod fee;
mod gov;
mod setup;
mod sigs;
mod spam;
mod wasm;

pub use basic::*;
pub use fee::*;
pub use gov::*;
pub use setup::*;
pub use sigs::*;
pub use spam::*;
pub use wasm::*;
