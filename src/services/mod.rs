pub mod arl;
pub mod migrate;
