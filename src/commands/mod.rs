pub mod index;
pub mod simulate;
