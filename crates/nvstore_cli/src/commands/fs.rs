//! Volume file commands.

use super::record_store;
use nvstore_core::StorageManager;
use nvstore_fs::OpenMode;
use std::path::Path;

/// Longest line `cat` prints in one piece.
const LINE_BUF_LEN: usize = 256;

/// Runs the mount command.
pub fn mount(manager: &StorageManager) -> Result<(), Box<dyn std::error::Error>> {
    let volume = record_store(manager)?.volume();
    let files = volume.list_files("")?;
    println!("Volume {}", volume.config().label);
    println!("  Root:       {}", volume.root().display());
    println!("  State:      {:?}", volume.state());
    println!("  Max files:  {}", volume.config().max_files);
    println!("  Root files: {}", files.len());
    Ok(())
}

/// Runs the ls command.
pub fn ls(manager: &StorageManager, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let volume = record_store(manager)?.volume();
    for name in volume.list_files(dir)? {
        let size = volume.file_size(dir.join(&name))?;
        println!("{size:>10}  {name}");
    }
    Ok(())
}

/// Runs the cat command.
pub fn cat(manager: &StorageManager, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let volume = record_store(manager)?.volume();
    let mut file = volume.open(path, OpenMode::Read)?;
    let mut buf = [0u8; LINE_BUF_LEN];
    loop {
        let n = volume.read_line(&mut file, &mut buf)?;
        if n == 0 {
            break;
        }
        print!("{}", String::from_utf8_lossy(&buf[..n]));
    }
    volume.close(file)?;
    Ok(())
}

/// Runs the lines command.
pub fn lines(manager: &StorageManager, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let volume = record_store(manager)?.volume();
    println!("{}", volume.line_count(path)?);
    Ok(())
}

/// Runs the cp command.
pub fn cp(
    manager: &StorageManager,
    src: &Path,
    dst: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let volume = record_store(manager)?.volume();
    let copied = volume.copy_file(src, dst)?;
    println!("Copied {} bytes to {}", copied, dst.display());
    Ok(())
}

/// Runs the mv command.
pub fn mv(
    manager: &StorageManager,
    src: &Path,
    dst: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    record_store(manager)?.volume().rename_file(src, dst)?;
    println!("Renamed {} to {}", src.display(), dst.display());
    Ok(())
}

/// Runs the rm command.
pub fn rm(manager: &StorageManager, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    record_store(manager)?.volume().erase_file(path)?;
    println!("Deleted {}", path.display());
    Ok(())
}

/// Runs the mkdir command.
pub fn mkdir(manager: &StorageManager, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    record_store(manager)?.volume().make_dir(path)?;
    println!("Created {}", path.display());
    Ok(())
}
