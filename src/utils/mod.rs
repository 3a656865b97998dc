pub mod command;
pub mod fs;
pub mod git;
pub mod interrupt;
