use vfs::{Error, Result};

use super::InodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub path: String,
    pub inode: InodeId,
    /// 后备存储上的创建或删除尚未完成
    pending: bool,
}

/// 路径与 inode 的双向对应，条目数不超过 inode 容量。
///
/// 条目顺序没有意义，只要求唯一且完整。
/// 待定条目仍占着路径与 inode，但查找时视为不存在。
#[derive(Debug)]
pub struct PathIndex {
    entries: Vec<PathEntry>,
    capacity: usize,
}

impl PathIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// 路径是否已被登记，待定条目也算
    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| entry.path == path)
    }

    /// 登记一个待定条目，由 [`PathIndex::commit`] 转正。
    ///
    /// 已满说明 inode 分配与路径登记脱节了，此时拒绝而不是静默丢弃。
    pub fn reserve(&mut self, path: &str, inode: InodeId) -> Result<()> {
        if self.contains(path) {
            return Err(Error::AlreadyExists);
        }
        if self.entries.len() >= self.capacity {
            log::error!("path index full while registering {path} -> inode {inode}");
            return Err(Error::InodesFull);
        }

        self.entries.push(PathEntry {
            path: path.to_owned(),
            inode,
            pending: true,
        });
        Ok(())
    }

    /// 待定条目转正
    pub fn commit(&mut self, path: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.path == path) {
            debug_assert!(entry.pending, "{path} is not pending");
            entry.pending = false;
        }
    }

    /// 把已转正的条目置为待定，返回其 inode
    pub fn begin_remove(&mut self, path: &str) -> Result<InodeId> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.path == path && !entry.pending)
            .ok_or(Error::NotFound)?;
        entry.pending = true;
        Ok(entry.inode)
    }

    /// 与末项交换后收缩，返回被移除条目的 inode
    pub fn remove(&mut self, path: &str) -> Option<InodeId> {
        let index = self.entries.iter().position(|entry| entry.path == path)?;
        Some(self.entries.swap_remove(index).inode)
    }

    pub fn lookup(&self, path: &str) -> Result<InodeId> {
        self.entries
            .iter()
            .find_map(|entry| (entry.path == path && !entry.pending).then_some(entry.inode))
            .ok_or(Error::NotFound)
    }

    /// 按路径排序的副本，含待定条目
    pub fn sorted(&self) -> Vec<PathEntry> {
        let mut entries = self.entries.clone();
        entries.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}
