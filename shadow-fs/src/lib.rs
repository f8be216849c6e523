/* shadow-fs 的整体架构，自上而下 */

// 影子文件系统层：创建、读写、删除，并与后备存储保持同步
mod sfs;

// 追加分配：打包策略与全有或全无的块预留
mod append;

// 影子数据结构层：位图、数据块池、inode 表、路径索引
pub mod layout;

// 诊断快照
mod dump;

// 路径规范化
mod path;

mod geometry;

pub use self::{
    append::{AppendAllocator, Reservation},
    dump::{Dump, InodeDump},
    geometry::Geometry,
    sfs::{FileHandle, ShadowFileSystem},
};
