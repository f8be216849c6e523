//! inode 与 inode 表
//!
//! inode 以槽位编号为身份，记录一串按逻辑字节顺序排列的数据块编号与逻辑大小。
//! 只有最后一块可能未填满：
//! `num_blocks == ceil(size / block_size)`，空文件不占块。

use std::sync::Arc;

use derive_more::{Display, From, Into};
use spin::Mutex;
use vfs::{Error, Result};

use super::{Bitmap, BlockId, DataBlockPool};

/// inode 编号，即其在 [`InodeTable`] 中的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[repr(transparent)]
pub struct InodeId(usize);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inode {
    /// 数据块编号，插入顺序即逻辑字节顺序
    pub(crate) blocks: Vec<BlockId>,
    /// 逻辑大小：已写入的字节数
    pub(crate) size: usize,
}

impl Inode {
    #[inline]
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// 计算容纳指定数据量需要多少个数据块
    #[inline]
    pub fn count_data_block(size: usize, block_size: usize) -> usize {
        size.div_ceil(block_size)
    }

    /// 从指定位置(字节偏移)读出数据填充`buf`，不越过逻辑大小
    pub fn read_at(&self, offset: usize, buf: &mut [u8], pool: &DataBlockPool) -> usize {
        let block_size = pool.block_size();
        let mut start = offset;
        let end = (start + buf.len()).min(self.size);

        if start >= end {
            return 0;
        }

        // 已读取多少字节
        let mut read_size = 0;
        loop {
            let block_index = start / block_size;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * block_size).min(end);
            let block_read_size = current_block_end - start;

            // 绝对地址 % 块大小 = 块内偏移
            let inoffset = start % block_size;
            let src = &pool.block(self.blocks[block_index])[inoffset..inoffset + block_read_size];
            buf[read_size..read_size + block_read_size].copy_from_slice(src);

            read_size += block_read_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        read_size
    }

    /// 把`buf`写到指定位置，范围限于已持有的块；不改动逻辑大小
    pub fn write_at(&self, offset: usize, buf: &[u8], pool: &mut DataBlockPool) -> usize {
        let block_size = pool.block_size();
        let mut start = offset;
        let end = (start + buf.len()).min(self.blocks.len() * block_size);

        if start >= end {
            return 0;
        }

        let mut written_size = 0;
        loop {
            let block_index = start / block_size;
            let current_block_end = ((block_index + 1) * block_size).min(end);
            let block_write_size = current_block_end - start;

            let inoffset = start % block_size;
            let dest =
                &mut pool.block_mut(self.blocks[block_index])[inoffset..inoffset + block_write_size];
            dest.copy_from_slice(&buf[written_size..written_size + block_write_size]);

            written_size += block_write_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        log::trace!("copied {written_size} bytes at offset {offset}");
        written_size
    }

    /// 末块中逻辑大小之后的字节清零
    pub(crate) fn zero_tail(&self, pool: &mut DataBlockPool) {
        let fill_level = self.size % pool.block_size();
        if let (Some(&last), true) = (self.blocks.last(), fill_level > 0) {
            pool.block_mut(last)[fill_level..].fill(0);
        }
    }

    fn reset(&mut self) {
        self.blocks.clear();
        self.size = 0;
    }
}

/// inode 表：定长的 inode 槽位加一张位图。
///
/// 每个槽位各有一把锁，写不同文件时互不阻塞。
#[derive(Debug)]
pub struct InodeTable {
    slots: Box<[Arc<Mutex<Inode>>]>,
    bitmap: Bitmap,
}

impl InodeTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Arc::default()).collect(),
            bitmap: Bitmap::new(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 分配编号最小的空闲 inode，并将其重置为空文件
    pub fn find_free_inode(&mut self) -> Result<InodeId> {
        let index = self.bitmap.alloc().ok_or(Error::InodesFull)?;
        self.slots[index].lock().reset();
        Ok(InodeId(index))
    }

    /// 归还 inode 持有的全部数据块，并将其槽位标为空闲。
    ///
    /// 先锁 inode 再锁数据块池，与写路径的加锁顺序一致。
    pub fn release_inode(&mut self, id: InodeId, pool: &Mutex<DataBlockPool>) {
        let slot = self.slot(id);
        let mut inode = slot.lock();
        let mut pool = pool.lock();

        for block in inode.blocks.drain(..) {
            pool.free_block(block);
        }
        inode.reset();
        self.bitmap.dealloc(id.0);
    }

    #[inline]
    pub fn slot(&self, id: InodeId) -> Arc<Mutex<Inode>> {
        Arc::clone(&self.slots[id.0])
    }

    #[inline]
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }
}
