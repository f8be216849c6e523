//! 面向调用方的统一错误
//!
//! 影子状态的记账失败（[`Error::InodesFull`]、[`Error::NoSpace`]、
//! [`Error::NotFound`]、[`Error::InvalidPath`]）总是在任何修改之前被检出；
//! 后备存储的错误按种类归入对应变体，其余经 [`Error::Io`] 转发。

use std::io;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no free inode")]
    InodesFull,
    #[error("not enough free data blocks")]
    NoSpace,
    #[error("no such file or directory")]
    NotFound,
    #[error("file already exists")]
    AlreadyExists,
    #[error("is a directory")]
    IsADirectory,
    #[error("not a directory")]
    NotADirectory,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("backing I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound,
            io::ErrorKind::AlreadyExists => Error::AlreadyExists,
            io::ErrorKind::IsADirectory => Error::IsADirectory,
            io::ErrorKind::NotADirectory => Error::NotADirectory,
            io::ErrorKind::DirectoryNotEmpty => Error::DirectoryNotEmpty,
            _ => Error::Io(err),
        }
    }
}

impl Error {
    /// 分派层回复时使用的 errno，每个变体恰好对应一个
    pub fn errno(&self) -> i32 {
        match self {
            Error::InodesFull => libc::ENOSPC,
            Error::NoSpace => libc::ENOSPC,
            Error::NotFound => libc::ENOENT,
            Error::AlreadyExists => libc::EEXIST,
            Error::IsADirectory => libc::EISDIR,
            Error::NotADirectory => libc::ENOTDIR,
            Error::DirectoryNotEmpty => libc::ENOTEMPTY,
            Error::InvalidPath(_) => libc::EINVAL,
            Error::InvalidGeometry(_) => libc::EINVAL,
            Error::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::Error;

    #[test]
    fn errno() {
        assert_eq!(libc::ENOSPC, Error::InodesFull.errno());
        assert_eq!(libc::ENOSPC, Error::NoSpace.errno());
        assert_eq!(libc::ENOENT, Error::NotFound.errno());
        assert_eq!(libc::EINVAL, Error::InvalidGeometry("zero".into()).errno());
        assert_eq!(libc::EINVAL, Error::InvalidPath("/..".into()).errno());
        assert_eq!(
            libc::EACCES,
            Error::from(io::Error::from_raw_os_error(libc::EACCES)).errno()
        );
        assert_eq!(libc::EIO, Error::from(io::Error::other("broken")).errno());
    }

    #[test]
    fn io_kinds() {
        let kind = |kind: io::ErrorKind| Error::from(io::Error::from(kind));

        assert!(matches!(kind(io::ErrorKind::NotFound), Error::NotFound));
        assert!(matches!(kind(io::ErrorKind::AlreadyExists), Error::AlreadyExists));
        assert!(matches!(kind(io::ErrorKind::IsADirectory), Error::IsADirectory));
        assert!(matches!(kind(io::ErrorKind::NotADirectory), Error::NotADirectory));
        assert!(matches!(
            kind(io::ErrorKind::DirectoryNotEmpty),
            Error::DirectoryNotEmpty
        ));
        assert!(matches!(kind(io::ErrorKind::PermissionDenied), Error::Io(_)));

        // 原始 errno 经种类映射后保持不变
        assert_eq!(
            libc::ENOTEMPTY,
            Error::from(io::Error::from_raw_os_error(libc::ENOTEMPTY)).errno()
        );
    }
}
