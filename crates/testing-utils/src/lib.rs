pub mod archive;
pub mod bin;
pub mod fixture;
