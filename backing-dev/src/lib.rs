//! # 后备存储接口层
//!
//! 真正的文件字节存放在宿主机的目录树上；
//! [`BackingDevice`] 是对这些原语的抽象，
//! 影子文件系统只镜像分配元数据，字节以后备存储为准。
//!
//! 所有路径都是挂载点内的路径（以`/`开头）。

use std::any::Any;
use std::fmt::Debug;
use std::io;

use enumflags2::BitFlags;
use vfs::{DirEntry, OpenFlag, Permission, Stat};

/// 后备存储驱动特质
pub trait BackingDevice: Debug + Send + Sync + Any {
    fn create(
        &self,
        path: &str,
        flags: BitFlags<OpenFlag>,
        perm: BitFlags<Permission>,
    ) -> io::Result<()>;

    /// 定位读，返回实际读到的字节数；
    /// 只有遇到文件末尾时才会少于`buf`的长度
    fn read_at(&self, path: &str, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// 定位写，要么写满整个`buf`，要么返回错误
    fn write_at(&self, path: &str, offset: u64, buf: &[u8]) -> io::Result<()>;

    fn unlink(&self, path: &str) -> io::Result<()>;

    fn mkdir(&self, path: &str, perm: BitFlags<Permission>) -> io::Result<()>;

    fn rmdir(&self, path: &str) -> io::Result<()>;

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    fn stat(&self, path: &str) -> io::Result<Stat>;
}
