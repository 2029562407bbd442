//! Store contract commands.

use nvstore_core::{NvStore, StorageManager, StoreSession};
use nvstore_kv::{TypedValue, ValueType};
use tracing::info;

/// Runs the init command.
pub fn init(manager: &StorageManager) -> Result<(), Box<dyn std::error::Error>> {
    manager.init()?;
    println!(
        "Store {} ready ({} backend)",
        manager.name(),
        manager.backend_name()
    );
    Ok(())
}

/// Runs the save command.
pub fn save(
    manager: &StorageManager,
    id: &str,
    ty: ValueType,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = TypedValue::parse(ty, text)?;
    manager.init()?;
    let written = manager.save(id, &value)?;
    info!(id, %ty, written, "value saved");
    println!("Saved {id} ({ty}, {written} bytes)");
    Ok(())
}

/// Runs the restore command.
pub fn restore(
    manager: &StorageManager,
    id: &str,
    ty: ValueType,
    capacity: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    manager.init()?;
    let value = manager.restore(id, ty, capacity)?;
    match format {
        "json" => {
            let out = serde_json::json!({
                "id": id,
                "type": ty.as_str(),
                "len": value.encoded_len(),
                "value": value.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => println!("{value}"),
    }
    Ok(())
}

/// Runs the check command.
pub fn check(manager: &StorageManager, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    manager.init()?;
    println!("{}", manager.check_key(id));
    Ok(())
}

/// Runs the remove command.
pub fn remove(manager: &StorageManager, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    manager.init()?;
    manager.remove_key(id)?;
    println!("Removed {id}");
    Ok(())
}

/// Runs the erase command.
///
/// With `partition`, the whole key-value partition is erased, every
/// namespace included.
pub fn erase(manager: &StorageManager, partition: bool) -> Result<(), Box<dyn std::error::Error>> {
    manager.init()?;
    if partition {
        let store = manager
            .key_value()
            .ok_or("--partition needs the key-value backend")?;
        store.erase_partition()?;
        println!("Erased partition {}", store.partition());
        return Ok(());
    }

    let mut session = manager.open()?;
    session.erase()?;
    session.close();
    println!("Erased store {}", manager.name());
    Ok(())
}
