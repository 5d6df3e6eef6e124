//! Lexical path normalisation for file identifiers.
//!
//! Two paths identify the same file iff their normalised strings are equal;
//! there is no case folding and no filesystem access. Decoders may hand us
//! unnormalised paths (`./src//a.cpp`, `src/x/../a.cpp`) and trace formats
//! mix separators, so normalisation has to be purely textual.

use std::path::{Component, Path, PathBuf};

/// Normalises a path lexically: backslashes become forward slashes,
/// `.` components are dropped, and `..` pops the previous component where
/// one exists. Relative paths stay relative; the empty path stays empty.
pub fn normalize_path(path: &Path) -> PathBuf {
    let unified = path.to_string_lossy().replace('\\', "/");
    let unified = Path::new(&unified);

    let mut parts: Vec<Component> = Vec::new();
    for component in unified.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    let mut result = PathBuf::new();
    for part in parts {
        result.push(part.as_os_str());
    }
    result
}

/// Normalised string form used as a graph node id and diff key.
pub fn file_id(path: &Path) -> String {
    normalize_path(path).to_string_lossy().into_owned()
}

/// Shortens a path for display, keeping the trailing components.
pub fn abbreviate(path: &Path, max_len: usize) -> String {
    let s = path.to_string_lossy();
    if s.len() <= max_len {
        return s.into_owned();
    }
    let keep = max_len.saturating_sub(1);
    let tail: String = s.chars().skip(s.chars().count().saturating_sub(keep)).collect();
    format!("…{tail}")
}
