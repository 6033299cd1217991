pub mod at;
