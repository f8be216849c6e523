use vfs::{Error, Result};

/// 挂载时确定的容量，之后不再改变
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    inodes: usize,
    data_blocks: usize,
    block_size: usize,
}

impl Geometry {
    /// 任何一项为零都会被拒绝
    pub fn new(inodes: usize, data_blocks: usize, block_size: usize) -> Result<Self> {
        for (name, value) in [
            ("inode capacity", inodes),
            ("data block capacity", data_blocks),
            ("data block size", block_size),
        ] {
            if value == 0 {
                return Err(Error::InvalidGeometry(format!("{name} must be positive")));
            }
        }

        Ok(Self {
            inodes,
            data_blocks,
            block_size,
        })
    }

    #[inline]
    pub fn inodes(&self) -> usize {
        self.inodes
    }

    #[inline]
    pub fn data_blocks(&self) -> usize {
        self.data_blocks
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}
