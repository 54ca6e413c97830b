pub mod account;
pub mod archive;
pub mod leave;
pub mod report;
