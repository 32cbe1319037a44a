#![deny(unused_variables)]
#![deny(dead_code)]
pub mod flag;
pub mod scorer;
pub mod tier;
pub mod types;

#[path = "../cohort/mod.rs"]
pub mod cohort;
