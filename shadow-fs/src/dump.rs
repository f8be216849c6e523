//! 影子状态的诊断快照，供外部日志记录

use std::fmt::{self, Display, Write};

use crate::layout::{BlockId, InodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dump {
    /// 按路径排序
    pub paths: Vec<(String, InodeId)>,
    pub inode_bitmap: Vec<bool>,
    pub block_bitmap: Vec<bool>,
    /// 按 inode 编号排列，空闲 inode 亦在其中
    pub inodes: Vec<InodeDump>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeDump {
    pub blocks: Vec<BlockId>,
    pub size: usize,
    /// 各块的原始字节，含末块未用的部分
    pub content: Vec<u8>,
}

impl Display for Dump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PATH_TO_INODE_MAP:")?;
        for (path, inode) in &self.paths {
            writeln!(f, "{path}: {inode}")?;
        }

        write_bitmap(f, "INODE_BITMAP", &self.inode_bitmap)?;
        write_bitmap(f, "DATA_BLOCK_BITMAP", &self.block_bitmap)?;

        for (index, inode) in self.inodes.iter().enumerate() {
            write!(f, "inode{index}: ")?;
            for &byte in &inode.content {
                match byte {
                    b'\n' => f.write_str("\\n")?,
                    byte => f.write_char(char::from(byte))?,
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

fn write_bitmap(f: &mut fmt::Formatter<'_>, name: &str, bitmap: &[bool]) -> fmt::Result {
    write!(f, "{name}: [")?;
    for (index, &used) in bitmap.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", u8::from(used))?;
    }
    writeln!(f, "]")
}
