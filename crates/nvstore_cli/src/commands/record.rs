//! Positional record commands.

use super::record_store;
use nvstore_core::StorageManager;

/// Runs the record get command.
pub fn get(
    manager: &StorageManager,
    id: &str,
    offset: u64,
    len: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = record_store(manager)?;
    let mut buf = vec![0u8; len];
    let mut cursor = offset;
    let n = store.get_record(id, &mut buf, Some(&mut cursor))?;
    buf.truncate(n);

    println!("Read {n} bytes from {id} at {offset} (cursor now {cursor})");
    println!("{}", String::from_utf8_lossy(&buf));
    Ok(())
}

/// Runs the record set command.
pub fn set(
    manager: &StorageManager,
    id: &str,
    data: &[u8],
    offset: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = record_store(manager)?;
    let mut cursor = offset;
    let n = store.set_record(id, data, Some(&mut cursor))?;
    if n < data.len() {
        println!("Short write: {n} of {} bytes", data.len());
    }
    println!("Wrote {n} bytes to {id} at {offset} (cursor now {cursor})");
    Ok(())
}
