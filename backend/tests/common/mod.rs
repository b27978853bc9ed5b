// Not every helper is used in every test, so we allow dead code
#![allow(unused_imports, dead_code)]

mod test_setup;
pub use test_setup::*;
mod storage_mocks;
pub use storage_mocks::*;
