use std::path::{Component, Path, PathBuf};

use super::error::PathError;

/// Make `raw` absolute against `base`, purely lexically.
///
/// `.` components are dropped and `..` pops one level, never above the root.
/// Nothing is touched on disk: the target may not exist and symlinks are left
/// alone.
pub fn resolve_target(base: &Path, raw: &str) -> Result<PathBuf, PathError> {
    if raw.is_empty() {
        return Err(PathError::Empty);
    }
    if raw.contains('\0') {
        return Err(PathError::NulByte);
    }

    let joined = base.join(raw);
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // 루트에서의 ".."는 무시
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Ok(out)
}
