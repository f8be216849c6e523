use enumflags2::{BitFlags, bitflags};

#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    /// 只写
    WRONLY = 0b0000_0000_0001,
    /// 读写兼备
    RDWR   = 0b0000_0000_0010,
    /// 创建文件，若文件存在则清空
    CREATE = 0b0010_0000_0000,
    /// 文件必须不存在
    EXCL   = 0b0100_0000_0000,
    /// 先清空文件，再交给用户
    TRUNC  = 0b1000_0000_0000,
}

/// 文件权限位
#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms, non_camel_case_types)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    OTHER_X = 0o001,
    OTHER_W = 0o002,
    OTHER_R = 0o004,
    GROUP_X = 0o010,
    GROUP_W = 0o020,
    GROUP_R = 0o040,
    OWNER_X = 0o100,
    OWNER_W = 0o200,
    OWNER_R = 0o400,
}

impl Permission {
    /// `rw-r--r--`
    #[inline]
    pub fn file_default() -> BitFlags<Permission> {
        Permission::OWNER_R | Permission::OWNER_W | Permission::GROUP_R | Permission::OTHER_R
    }

    /// `rwxr-xr-x`
    #[inline]
    pub fn dir_default() -> BitFlags<Permission> {
        Self::file_default() | Permission::OWNER_X | Permission::GROUP_X | Permission::OTHER_X
    }
}
