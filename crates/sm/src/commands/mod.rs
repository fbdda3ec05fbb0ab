//! Command builders for the eMRTD access protocols

pub mod mse_set_at;

pub use mse_set_at::{AuthTemplate, KeyReference, MseSetAt};
