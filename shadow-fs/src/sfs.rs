//! # 影子文件系统
//!
//! 组合数据块池、inode 表、路径索引与追加分配器，
//! 每次操作先更新影子状态再调用后备存储；后备存储失败时补偿回滚影子状态。
//!
//! 加锁顺序：名字空间 → inode → 数据块池。
//! 名字空间锁只保护查找与分配决策，从不跨越后备存储调用：
//! 创建与删除在调用期间把路径条目置为待定，返回后再取锁转正或补偿。
//! 读写只在持有该文件 inode 锁时访问后备存储，不妨碍其他文件。

use std::sync::Arc;

use backing_dev::BackingDevice;
use enumflags2::BitFlags;
use spin::Mutex;
use vfs::{DirEntry, Error, OpenFlag, Permission, Result, Stat};

use crate::append::{AppendAllocator, Reservation};
use crate::dump::{Dump, InodeDump};
use crate::layout::{DataBlockPool, Inode, InodeId, InodeTable, PathIndex};
use crate::path::normalize;
use crate::Geometry;

#[derive(Debug)]
pub struct ShadowFileSystem {
    geometry: Geometry,
    allocator: AppendAllocator,
    device: Arc<dyn BackingDevice>,
    namespace: Mutex<Namespace>,
    pool: Mutex<DataBlockPool>,
}

/// 路径索引与 inode 位图共用一把锁，分配决策在此串行化
#[derive(Debug)]
struct Namespace {
    paths: PathIndex,
    inodes: InodeTable,
}

/// [`ShadowFileSystem::create`] 返回的文件句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle {
    pub inode: InodeId,
}

/// 写入失败时恢复影子状态所需的全部信息
struct WriteUndo {
    reservation: Reservation,
    offset: usize,
    /// 被覆盖的旧字节
    overwritten: Vec<u8>,
    old_size: usize,
}

impl ShadowFileSystem {
    pub fn mount(geometry: Geometry, device: Arc<dyn BackingDevice>) -> Self {
        log::info!(
            "mount: {} inodes, {} data blocks of {} bytes",
            geometry.inodes(),
            geometry.data_blocks(),
            geometry.block_size()
        );

        Self {
            geometry,
            allocator: AppendAllocator::new(geometry.block_size()),
            device,
            namespace: Mutex::new(Namespace {
                paths: PathIndex::new(geometry.inodes()),
                inodes: InodeTable::new(geometry.inodes()),
            }),
            pool: Mutex::new(DataBlockPool::new(
                geometry.data_blocks(),
                geometry.block_size(),
            )),
        }
    }

    /// 卸载并交出最后一份快照，所有缓冲随之释放
    pub fn unmount(self) -> Dump {
        let dump = self.dump();
        log::info!(
            "unmount: {} files tracked, {} blocks in use",
            dump.paths.len(),
            dump.block_bitmap.iter().filter(|&&used| used).count()
        );
        dump
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn create(
        &self,
        path: &str,
        flags: BitFlags<OpenFlag>,
        perm: BitFlags<Permission>,
    ) -> Result<FileHandle> {
        let path = normalize(path)?;

        let inode = {
            let mut ns = self.namespace.lock();
            if ns.paths.contains(&path) {
                return Err(Error::AlreadyExists);
            }

            let inode = ns.inodes.find_free_inode()?;
            if let Err(err) = ns.paths.reserve(&path, inode) {
                ns.inodes.release_inode(inode, &self.pool);
                return Err(err);
            }
            inode
        };
        log::debug!("create {path}: inode {inode}");

        let result = self.device.create(&path, flags, perm);

        let mut ns = self.namespace.lock();
        match result {
            Ok(()) => {
                ns.paths.commit(&path);
                Ok(FileHandle { inode })
            }
            Err(err) => {
                log::warn!("create {path}: backing store failed, releasing inode {inode}: {err}");
                ns.paths.remove(&path);
                ns.inodes.release_inode(inode, &self.pool);
                Err(err.into())
            }
        }
    }

    /// 在`offset`处写入`buf`。
    ///
    /// 只有超出逻辑大小的部分才申请新块；完全落在已有范围内的写原地覆盖。
    pub fn write(&self, path: &str, buf: &[u8], offset: usize) -> Result<usize> {
        let path = normalize(path)?;
        let ns = self.namespace.lock();
        let id = ns.paths.lookup(&path)?;
        let slot = ns.inodes.slot(id);
        let mut inode = slot.lock();
        drop(ns);

        if buf.is_empty() {
            return Ok(0);
        }

        let undo = {
            let mut pool = self.pool.lock();
            self.apply_write(&mut inode, &mut pool, offset, buf)?
        };

        if let Err(err) = self.device.write_at(&path, offset as u64, buf) {
            log::warn!(
                "write {path}: backing store failed, rolling back {} reserved blocks: {err}",
                undo.reservation.count()
            );
            undo.rollback(&mut inode, &mut self.pool.lock());
            return Err(err.into());
        }

        Ok(buf.len())
    }

    /// 读出`[offset, offset + len)`与`[0, 逻辑大小)`的交集
    pub fn read(&self, path: &str, offset: usize, len: usize) -> Result<Vec<u8>> {
        let path = normalize(path)?;
        let ns = self.namespace.lock();
        let id = ns.paths.lookup(&path)?;
        let slot = ns.inodes.slot(id);
        let inode = slot.lock();
        drop(ns);

        let start = offset.min(inode.size());
        let end = offset.saturating_add(len).min(inode.size());
        let mut shadow = vec![0; end - start];
        if shadow.is_empty() {
            return Ok(shadow);
        }
        inode.read_at(start, &mut shadow, &self.pool.lock());

        let mut durable = vec![0; shadow.len()];
        let read = self.device.read_at(&path, start as u64, &mut durable)?;
        durable.truncate(read);

        if durable != shadow {
            log::warn!(
                "read {path}: backing store disagrees with shadow blocks in [{start}, {end})"
            );
        }

        Ok(durable)
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        let path = normalize(path)?;
        let (id, slot) = {
            let mut ns = self.namespace.lock();
            let id = ns.paths.begin_remove(&path)?;
            (id, ns.inodes.slot(id))
        };

        // 后备存储删除成功后才释放影子状态，失败时条目转正即可
        if let Err(err) = self.device.unlink(&path) {
            log::warn!("unlink {path}: backing store failed, keeping inode {id}: {err}");
            self.namespace.lock().paths.commit(&path);
            return Err(err.into());
        }

        // 待定条目已查不到，只需等先前拿到该 inode 的读写做完
        drop(slot.lock());

        let mut ns = self.namespace.lock();
        ns.inodes.release_inode(id, &self.pool);
        ns.paths.remove(&path);
        log::debug!("unlink {path}: released inode {id}");

        Ok(())
    }

    pub fn mkdir(&self, path: &str, perm: BitFlags<Permission>) -> Result<()> {
        Ok(self.device.mkdir(&normalize(path)?, perm)?)
    }

    pub fn rmdir(&self, path: &str) -> Result<()> {
        Ok(self.device.rmdir(&normalize(path)?)?)
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        Ok(self.device.read_dir(&normalize(path)?)?)
    }

    /// 受跟踪的文件报告影子块数与块大小，其余属性来自后备存储
    pub fn stat(&self, path: &str) -> Result<Stat> {
        let path = normalize(path)?;
        let mut stat = self.device.stat(&path)?;

        let ns = self.namespace.lock();
        if let Ok(id) = ns.paths.lookup(&path) {
            let slot = ns.inodes.slot(id);
            stat.blocks = slot.lock().num_blocks() as u64;
            stat.block_size = self.geometry.block_size() as u64;
        }

        Ok(stat)
    }

    /// 影子状态的一致快照
    pub fn dump(&self) -> Dump {
        let ns = self.namespace.lock();
        let slots: Vec<_> = (0..ns.inodes.capacity())
            .map(|index| ns.inodes.slot(InodeId::from(index)))
            .collect();
        let inodes: Vec<_> = slots.iter().map(|slot| slot.lock()).collect();
        let pool = self.pool.lock();

        Dump {
            paths: ns
                .paths
                .sorted()
                .into_iter()
                .map(|entry| (entry.path, entry.inode))
                .collect(),
            inode_bitmap: ns.inodes.bitmap().iter().collect(),
            block_bitmap: pool.bitmap().iter().collect(),
            inodes: inodes
                .iter()
                .map(|inode| InodeDump {
                    blocks: inode.blocks().to_vec(),
                    size: inode.size(),
                    content: inode
                        .blocks()
                        .iter()
                        .flat_map(|&block| pool.block(block).iter().copied())
                        .collect(),
                })
                .collect(),
        }
    }
}

impl ShadowFileSystem {
    /// 第一阶段：校验并预留，再复制字节、更新逻辑大小
    fn apply_write(
        &self,
        inode: &mut Inode,
        pool: &mut DataBlockPool,
        offset: usize,
        buf: &[u8],
    ) -> Result<WriteUndo> {
        let old_size = inode.size();
        let end = offset.checked_add(buf.len()).ok_or(Error::NoSpace)?;

        if offset == old_size {
            let reservation = self.allocator.append(inode, pool, buf)?;
            return Ok(WriteUndo {
                reservation,
                offset,
                overwritten: Vec::new(),
                old_size,
            });
        }

        let reservation = if end > old_size {
            self.allocator.reserve(inode, pool, end - old_size)?
        } else {
            Reservation::empty(inode)
        };

        let mut overwritten = vec![0; old_size.saturating_sub(offset).min(buf.len())];
        inode.read_at(offset, &mut overwritten, pool);

        let written = inode.write_at(offset, buf, pool);
        debug_assert_eq!(written, buf.len());
        inode.size = old_size.max(end);
        debug_assert_eq!(
            inode.num_blocks(),
            Inode::count_data_block(inode.size(), pool.block_size())
        );

        Ok(WriteUndo {
            reservation,
            offset,
            overwritten,
            old_size,
        })
    }
}

impl WriteUndo {
    fn rollback(self, inode: &mut Inode, pool: &mut DataBlockPool) {
        inode.write_at(self.offset, &self.overwritten, pool);
        self.reservation.undo(inode, pool);
        inode.size = self.old_size;
        inode.zero_tail(pool);
    }
}
