pub mod blocks;
pub mod views;
