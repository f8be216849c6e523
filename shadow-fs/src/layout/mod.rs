//! # 影子数据结构层
//!
//! 内存中的分配记账：位图、数据块池、inode 表与路径索引。

mod bitmap;
mod data_block;
mod inode;
mod path_index;

pub use self::{
    bitmap::Bitmap,
    data_block::{BlockId, DataBlockPool},
    inode::{Inode, InodeId, InodeTable},
    path_index::{PathEntry, PathIndex},
};
