pub mod adapter;
pub mod filter;
pub mod office;
