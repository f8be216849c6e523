//! # 追加分配
//!
//! 打包策略：追加的字节总是先填满当前末块，再申请新块。
//! 块的预留是全有或全无的，空闲块不够时不做任何修改。

use vfs::{Error, Result};

use crate::layout::{DataBlockPool, Inode};

#[derive(Debug, Clone, Copy)]
pub struct AppendAllocator {
    block_size: usize,
}

/// 一次追加所预留的块：inode 块表中从`first`起的`count`项
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    first: usize,
    count: usize,
}

impl AppendAllocator {
    #[inline]
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }

    /// 在逻辑大小为`logical_size`的文件后追加`n`字节需要的新块数
    pub fn blocks_needed(&self, logical_size: usize, n: usize) -> usize {
        let fill_level = logical_size % self.block_size;
        let space_in_last_block = if fill_level == 0 {
            0
        } else {
            self.block_size - fill_level
        };
        let overflow = n - n.min(space_in_last_block);

        overflow.div_ceil(self.block_size)
    }

    /// 为追加`n`字节预留数据块，按空闲编号升序接到 inode 块表之后。
    ///
    /// 逻辑大小不变，由调用方在复制完字节后更新。
    pub fn reserve(
        &self,
        inode: &mut Inode,
        pool: &mut DataBlockPool,
        n: usize,
    ) -> Result<Reservation> {
        let needed = self.blocks_needed(inode.size(), n);
        let free = pool.count_free();
        if free < needed {
            log::debug!("append of {n} bytes needs {needed} blocks, only {free} free");
            return Err(Error::NoSpace);
        }

        let reservation = Reservation {
            first: inode.num_blocks(),
            count: needed,
        };
        for _ in 0..needed {
            match pool.find_free_block() {
                Ok(block) => inode.blocks.push(block),
                Err(err) => {
                    reservation.undo(inode, pool);
                    return Err(err);
                }
            }
        }

        log::debug!(
            "reserved {needed} blocks for {n} bytes, inode now holds {:?}",
            inode.blocks()
        );
        Ok(reservation)
    }

    /// 在文件末尾追加`buf`：预留、复制，最后才增加逻辑大小。
    ///
    /// 返回的预留供调用方在后续失败时撤销。
    pub fn append(
        &self,
        inode: &mut Inode,
        pool: &mut DataBlockPool,
        buf: &[u8],
    ) -> Result<Reservation> {
        let offset = inode.size();
        let reservation = self.reserve(inode, pool, buf.len())?;
        let written = inode.write_at(offset, buf, pool);
        debug_assert_eq!(written, buf.len());
        inode.size += written;

        Ok(reservation)
    }
}

impl Reservation {
    /// 不含任何块的预留，用于不增长的覆盖写
    #[inline]
    pub fn empty(inode: &Inode) -> Self {
        Self {
            first: inode.num_blocks(),
            count: 0,
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// 把预留的块还给数据块池
    pub fn undo(self, inode: &mut Inode, pool: &mut DataBlockPool) {
        for block in inode.blocks.drain(self.first..) {
            pool.free_block(block);
        }
    }
}
