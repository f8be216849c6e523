#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use backing_dev::BackingDevice;
use enumflags2::BitFlags;
use shadow_fs::layout::Inode;
use shadow_fs::{Geometry, ShadowFileSystem};
use vfs::{DirEntry, DirEntryType, OpenFlag, Permission, Stat};

/// 内存中的后备存储，可按需注入故障
#[derive(Debug, Default)]
pub struct MemDevice {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
    pub fail_creates: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_unlinks: AtomicBool,
    gate: Mutex<Option<Gate>>,
}

/// 让某个路径上的下一次创建、写或删除停在后备存储里，直到被放行
#[derive(Debug)]
struct Gate {
    path: String,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl MemDevice {
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// 绕过影子文件系统直接改写字节
    pub fn tamper(&self, path: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_owned(), bytes.to_vec());
    }

    /// 返回两端：调用停下时前者收到通知，向后者发送即放行
    pub fn gate(&self, path: &str) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(Gate {
            path: path.to_owned(),
            entered: entered_tx,
            release: release_rx,
        });
        (entered_rx, release_tx)
    }

    fn pass_gate(&self, path: &str) {
        let gate = self.gate.lock().unwrap().take_if(|gate| gate.path == path);
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
    }

    fn injected(flag: &AtomicBool) -> io::Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(io::Error::other("injected fault"))
        } else {
            Ok(())
        }
    }
}

fn parent(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn children<'a>(
    names: impl Iterator<Item = &'a String>,
    path: &str,
    ty: DirEntryType,
) -> Vec<DirEntry> {
    names
        .filter(|name| parent(name) == path)
        .map(|name| DirEntry {
            inode: 0,
            ty,
            name: name.rsplit('/').next().unwrap_or_default().to_owned(),
        })
        .collect()
}

impl BackingDevice for MemDevice {
    fn create(
        &self,
        path: &str,
        flags: BitFlags<OpenFlag>,
        _perm: BitFlags<Permission>,
    ) -> io::Result<()> {
        self.pass_gate(path);
        Self::injected(&self.fail_creates)?;
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) && flags.contains(OpenFlag::EXCL) {
            return Err(io::ErrorKind::AlreadyExists.into());
        }
        let file = files.entry(path.to_owned()).or_default();
        if flags.contains(OpenFlag::TRUNC) {
            file.clear();
        }
        Ok(())
    }

    fn read_at(&self, path: &str, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let files = self.files.lock().unwrap();
        let file = files.get(path).ok_or(io::ErrorKind::NotFound)?;
        let start = (offset as usize).min(file.len());
        let end = (start + buf.len()).min(file.len());
        buf[..end - start].copy_from_slice(&file[start..end]);
        Ok(end - start)
    }

    fn write_at(&self, path: &str, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.pass_gate(path);
        Self::injected(&self.fail_writes)?;
        let mut files = self.files.lock().unwrap();
        let file = files.get_mut(path).ok_or(io::ErrorKind::NotFound)?;
        let start = offset as usize;
        if file.len() < start + buf.len() {
            file.resize(start + buf.len(), 0);
        }
        file[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn unlink(&self, path: &str) -> io::Result<()> {
        self.pass_gate(path);
        Self::injected(&self.fail_unlinks)?;
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::ErrorKind::NotFound.into())
    }

    fn mkdir(&self, path: &str, _perm: BitFlags<Permission>) -> io::Result<()> {
        if !self.dirs.lock().unwrap().insert(path.to_owned()) {
            return Err(io::ErrorKind::AlreadyExists.into());
        }
        Ok(())
    }

    fn rmdir(&self, path: &str) -> io::Result<()> {
        let prefix = format!("{path}/");
        if self.files.lock().unwrap().keys().any(|file| file.starts_with(&prefix)) {
            return Err(io::ErrorKind::DirectoryNotEmpty.into());
        }
        if !self.dirs.lock().unwrap().remove(path) {
            return Err(io::ErrorKind::NotFound.into());
        }
        Ok(())
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let files = self.files.lock().unwrap();
        let dirs = self.dirs.lock().unwrap();
        let mut entries = children(dirs.iter(), path, DirEntryType::Directory);
        entries.extend(children(files.keys(), path, DirEntryType::Regular));
        Ok(entries)
    }

    fn stat(&self, path: &str) -> io::Result<Stat> {
        if self.dirs.lock().unwrap().contains(path) {
            return Ok(Stat {
                mode: DirEntryType::Directory,
                inode: 0,
                block_size: 4096,
                blocks: 0,
                size: 0,
            });
        }
        let files = self.files.lock().unwrap();
        let file = files.get(path).ok_or(io::ErrorKind::NotFound)?;
        Ok(Stat {
            mode: DirEntryType::Regular,
            inode: 0,
            block_size: 4096,
            blocks: (file.len() as u64).div_ceil(512),
            size: file.len() as u64,
        })
    }
}

pub fn mount(inodes: usize, blocks: usize, block_size: usize) -> (ShadowFileSystem, Arc<MemDevice>) {
    let device = Arc::new(MemDevice::default());
    let geometry = Geometry::new(inodes, blocks, block_size).unwrap();
    (ShadowFileSystem::mount(geometry, device.clone()), device)
}

pub fn create(fs: &ShadowFileSystem, path: &str) {
    fs.create(
        path,
        OpenFlag::CREATE | OpenFlag::WRONLY,
        Permission::file_default(),
    )
    .unwrap();
}

/// 校验三条不变量：位图与路径数一致、块数与逻辑大小相符、块不被共享
pub fn check_invariants(fs: &ShadowFileSystem) {
    let dump = fs.dump();
    let block_size = fs.geometry().block_size();

    let used_inodes = dump.inode_bitmap.iter().filter(|&&used| used).count();
    assert_eq!(used_inodes, dump.paths.len());
    for (_, inode) in &dump.paths {
        assert!(dump.inode_bitmap[usize::from(*inode)]);
    }

    let mut owned = BTreeSet::new();
    for (index, inode) in dump.inodes.iter().enumerate() {
        assert_eq!(
            Inode::count_data_block(inode.size, block_size),
            inode.blocks.len(),
            "inode{index} holds {} blocks for {} bytes",
            inode.blocks.len(),
            inode.size
        );
        for block in &inode.blocks {
            assert!(owned.insert(*block), "block {block} shared");
            assert!(dump.block_bitmap[usize::from(*block)]);
        }
    }
    assert_eq!(
        owned.len(),
        dump.block_bitmap.iter().filter(|&&used| used).count()
    );
}
