use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Writes `contents` to `path`, creating missing parent directories.
pub fn write_file(path: &Path, contents: &str) -> io::Result<()> {
    create_parent(path)?;
    std::fs::write(path, contents)
}

/// Creates the directory that will hold `path`, if it is missing.
pub fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => std::fs::create_dir_all(parent),
        None => Ok(()),
    }
}

/// Copies the tree at `src` into `dst`, overwriting files that already
/// exist. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<usize> {
    let mut copied = 0;
    for result in WalkDir::new(src).follow_links(true) {
        let entry = result?;
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // the entry's path
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
