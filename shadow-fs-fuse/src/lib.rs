#[cfg(test)]
mod tests;

mod cli;
mod context_log;
mod host_dir;
mod shell;

pub use self::{
    cli::Cli,
    context_log::{ContextLog, Op},
    host_dir::HostDir,
    shell::{Command, ParseError, Shell},
};
