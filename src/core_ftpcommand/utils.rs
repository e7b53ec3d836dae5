use std::path::{Path, PathBuf};

use crate::config::Config;

/// Normalizes a client-supplied path against the virtual working
/// directory. The result is always absolute with no `.` or `..`
/// components; `..` at the root is silently ignored and never escapes.
pub fn resolve_virtual(cwd: &str, input: &str) -> String {
    let base = if input.starts_with('/') { "" } else { cwd };

    let mut stack: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(input.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }

    if stack.is_empty() {
        String::from("/")
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Maps a virtual path onto the filesystem under the server root.
pub fn to_filesystem(root: &Path, virtual_path: &str) -> PathBuf {
    root.join(virtual_path.trim_start_matches('/'))
}

/// Symlink recheck: canonicalizes the deepest existing ancestor of the
/// candidate and requires the canonicalized root as a prefix. The textual
/// resolver already prevents `..` escapes; this catches links that point
/// outside the root.
pub fn within_root(root: &Path, candidate: &Path) -> bool {
    let root = match root.canonicalize() {
        Ok(root) => root,
        Err(_) => return false,
    };

    let mut probe = candidate.to_path_buf();
    loop {
        match probe.canonicalize() {
            Ok(real) => return real.starts_with(&root),
            Err(_) => match probe.parent() {
                Some(parent) => probe = parent.to_path_buf(),
                None => return false,
            },
        }
    }
}

/// Resolves a client path to its virtual form and on-disk location, or
/// `None` when the result would land outside the root. Callers answer
/// `None` with a 550 reply.
pub fn resolve_client_path(
    config: &Config,
    cwd: &str,
    arg: &str,
) -> Option<(String, PathBuf)> {
    let root = Path::new(&config.server.root_path);
    let virtual_path = resolve_virtual(cwd, arg);
    let fs_path = to_filesystem(root, &virtual_path);
    if within_root(root, &fs_path) {
        Some((virtual_path, fs_path))
    } else {
        None
    }
}
