//! 路径规范化：同一个后备文件在路径索引中只有一种写法

use vfs::{Error, Result};

/// 合并重复的`/`并去掉末尾的`/`。
///
/// 相对路径以及含`.`、`..`分量的路径一律拒绝。
pub fn normalize(path: &str) -> Result<String> {
    let invalid = || Error::InvalidPath(path.to_owned());
    let rest = path.strip_prefix('/').ok_or_else(invalid)?;

    let mut normalized = String::with_capacity(path.len());
    for component in rest.split('/').filter(|component| !component.is_empty()) {
        if component == "." || component == ".." {
            return Err(invalid());
        }
        normalized.push('/');
        normalized.push_str(component);
    }

    if normalized.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}
