mod dirent;
mod error;
mod flags;
mod stat;

pub use self::{
    dirent::{DirEntry, DirEntryType},
    error::{Error, Result},
    flags::{OpenFlag, Permission},
    stat::Stat,
};
