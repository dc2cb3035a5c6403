//! Subcommand implementations.

pub mod mpi_command;
pub mod role;
pub mod train;
