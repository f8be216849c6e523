use derive_more::{Display, From, Into};
use vfs::{Error, Result};

use super::Bitmap;

/// 数据块编号，只在所属的 [`DataBlockPool`] 内有意义
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[repr(transparent)]
pub struct BlockId(usize);

/// 数据块池：定长数据块的唯一所有者。
///
/// inode 只持有 [`BlockId`]，块的存储始终归池所有。
#[derive(Debug)]
pub struct DataBlockPool {
    blocks: Box<[Box<[u8]>]>,
    bitmap: Bitmap,
    block_size: usize,
}

impl DataBlockPool {
    /// 所有块初始均填零
    pub fn new(count: usize, block_size: usize) -> Self {
        Self {
            blocks: (0..count)
                .map(|_| vec![0; block_size].into_boxed_slice())
                .collect(),
            bitmap: Bitmap::new(count),
            block_size,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 分配编号最小的空闲块，只有成功时才修改位图
    pub fn find_free_block(&mut self) -> Result<BlockId> {
        self.bitmap.alloc().map(BlockId).ok_or(Error::NoSpace)
    }

    /// 归还数据块。
    ///
    /// 块内容随即清零，复用该块的文件看不到旧文件的数据。
    pub fn free_block(&mut self, id: BlockId) {
        self.blocks[id.0].fill(0);
        self.bitmap.dealloc(id.0);
    }

    /// 扫描整张位图，仅用于容量预检
    #[inline]
    pub fn count_free(&self) -> usize {
        self.bitmap.count_free()
    }

    #[inline]
    pub fn is_used(&self, id: BlockId) -> bool {
        self.bitmap.is_used(id.0)
    }

    #[inline]
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> &[u8] {
        &self.blocks[id.0]
    }

    #[inline]
    pub fn block_mut(&mut self, id: BlockId) -> &mut [u8] {
        debug_assert!(self.is_used(id), "writing to free block {id}");
        &mut self.blocks[id.0]
    }
}
