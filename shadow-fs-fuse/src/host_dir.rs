use std::fs::{self, DirBuilder, File, FileType, OpenOptions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, DirEntryExt, FileExt, FileTypeExt, MetadataExt, OpenOptionsExt};
use std::path::{Component, Path, PathBuf};

use backing_dev::BackingDevice;
use enumflags2::BitFlags;
use vfs::{DirEntry, DirEntryType, OpenFlag, Permission, Stat};

/// 宿主机上的后备目录，挂载点内的路径都落在其下
#[derive(Debug)]
pub struct HostDir {
    root: PathBuf,
}

impl HostDir {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = fs::canonicalize(root)?;
        if !root.is_dir() {
            return Err(io::ErrorKind::NotADirectory.into());
        }
        Ok(Self { root })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 只接受由普通名字组成的路径，不会解析到根目录之外
    fn full_path(&self, path: &str) -> io::Result<PathBuf> {
        let mut full = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir => {}
                Component::Normal(name) => full.push(name),
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path escapes backing root: {path}"),
                    ));
                }
            }
        }
        Ok(full)
    }
}

impl BackingDevice for HostDir {
    fn create(
        &self,
        path: &str,
        flags: BitFlags<OpenFlag>,
        perm: BitFlags<Permission>,
    ) -> io::Result<()> {
        // 创建总要求可写
        OpenOptions::new()
            .read(flags.contains(OpenFlag::RDWR) || !flags.contains(OpenFlag::WRONLY))
            .write(true)
            .create(true)
            .create_new(flags.contains(OpenFlag::EXCL))
            .truncate(flags.contains(OpenFlag::TRUNC))
            .mode(perm.bits())
            .open(self.full_path(path)?)?;
        Ok(())
    }

    fn read_at(&self, path: &str, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let file = File::open(self.full_path(path)?)?;

        let mut read_size = 0;
        while read_size < buf.len() {
            match file.read_at(&mut buf[read_size..], offset + read_size as u64) {
                Ok(0) => break,
                Ok(n) => read_size += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(read_size)
    }

    fn write_at(&self, path: &str, offset: u64, buf: &[u8]) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .open(self.full_path(path)?)?
            .write_all_at(buf, offset)
    }

    fn unlink(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.full_path(path)?)
    }

    fn mkdir(&self, path: &str, perm: BitFlags<Permission>) -> io::Result<()> {
        DirBuilder::new()
            .mode(perm.bits())
            .create(self.full_path(path)?)
    }

    fn rmdir(&self, path: &str) -> io::Result<()> {
        fs::remove_dir(self.full_path(path)?)
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        fs::read_dir(self.full_path(path)?)?
            .map(|entry| -> io::Result<DirEntry> {
                let entry = entry?;
                Ok(DirEntry {
                    inode: entry.ino(),
                    ty: entry_type(entry.file_type()?),
                    name: entry.file_name().to_string_lossy().into_owned(),
                })
            })
            .collect()
    }

    fn stat(&self, path: &str) -> io::Result<Stat> {
        let metadata = fs::symlink_metadata(self.full_path(path)?)?;
        Ok(Stat {
            mode: entry_type(metadata.file_type()),
            inode: metadata.ino(),
            block_size: metadata.blksize(),
            blocks: metadata.blocks(),
            size: metadata.size(),
        })
    }
}

fn entry_type(ty: FileType) -> DirEntryType {
    if ty.is_dir() {
        DirEntryType::Directory
    } else if ty.is_symlink() {
        DirEntryType::SymLink
    } else if ty.is_block_device() {
        DirEntryType::Block
    } else if ty.is_char_device() {
        DirEntryType::Char
    } else if ty.is_fifo() {
        DirEntryType::Fifo
    } else if ty.is_socket() {
        DirEntryType::Socket
    } else {
        DirEntryType::Regular
    }
}
