use crate::database_api;
use crate::database_api::Item;
use crate::database_api::ItemId;
use crate::database_api::NewItem;
use crate::deletion_code;
use crate::error::Error;
use crate::error::Result;
use crate::file_api;
use crate::file_api::Upload;
use chrono::Utc;
use log::error;
use log::info;
use log::warn;
use rusqlite::Connection;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use std::path::Path;

/// Get project version as seen by Cargo.
pub fn get_project_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Every item, newest first. An empty store yields an empty vector.
pub fn list_all(conn: &Connection) -> Result<Vec<Item>> {
    database_api::list_items(conn)
}

pub fn get(conn: &Connection, id: ItemId) -> Result<Item> {
    database_api::get_item(conn, id)?
        .ok_or_else(|| Error::not_found(format!("Item {} does not exist", id)))
}

/// Store the optional photo, then persist a new item with a fresh deletion code.
///
/// Returns the stored record, including its deletion code.
/// If the record cannot be persisted, the photo is removed again.
pub fn create(
    conn: &mut Connection,
    uploads_dir: &Path,
    fields: NewItem,
    upload: Option<&Upload>,
) -> Result<Item> {
    validate_new_item(&fields)?;
    let now = Utc::now();
    let image_filename = file_api::store_upload(uploads_dir, upload, now)?;
    let deletion_code = deletion_code::generate();

    let created = in_transaction(conn, TransactionBehavior::Deferred, |tx| {
        let id = database_api::insert_item(
            tx,
            &fields,
            &deletion_code,
            image_filename.as_deref(),
            now.timestamp_millis(),
        )?;
        get(tx, id)
    });
    match created {
        Ok(item) => {
            info!(
                "Created item {} ({})",
                item.id,
                if item.image_filename.is_some() {
                    "with photo"
                } else {
                    "no photo"
                }
            );
            Ok(item)
        }
        Err(err) => {
            if let Some(filename) = &image_filename {
                if let Err(cleanup) = file_api::remove_upload(uploads_dir, filename) {
                    warn!("Failed to clean up upload {}, {}", filename, cleanup);
                }
            }
            Err(err)
        }
    }
}

/// Remove item `id` if `supplied_code` matches its deletion code exactly.
///
/// Fails with 404 for an unknown id and 403 for a wrong code; in both cases nothing changes.
/// The photo is moved aside before the row is committed away and unlinked only afterwards:
/// if it cannot be moved the row stays, and if the commit fails it is put back.
pub fn delete(
    conn: &mut Connection,
    uploads_dir: &Path,
    id: ItemId,
    supplied_code: &str,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let item = get(&tx, id)?;
    if item.deletion_code != supplied_code {
        warn!("Refusing to delete item {}, deletion code does not match", id);
        return Err(Error::forbidden(format!(
            "Deletion code does not match item {}",
            id
        )));
    }
    if !database_api::remove_item(&tx, id)? {
        return Err(Error::not_found(format!("Item {} does not exist", id)));
    }
    let aside = match &item.image_filename {
        Some(filename) => file_api::set_aside_upload(uploads_dir, filename)?
            .map(|aside| (filename, aside)),
        None => None,
    };
    if let Err(err) = tx.commit() {
        if let Some((filename, aside)) = &aside {
            if let Err(restore) = file_api::restore_upload(uploads_dir, filename, aside) {
                error!("Item {} keeps a missing photo {}, {}", id, filename, restore);
            }
        }
        return Err(err.into());
    }
    if let Some((filename, aside)) = aside {
        if let Err(err) = std::fs::remove_file(&aside) {
            warn!("Failed to remove photo {} of deleted item {}, {}", filename, id, err);
        }
    }
    info!("Deleted item {}", id);
    Ok(())
}

fn validate_new_item(fields: &NewItem) -> Result<()> {
    let required = [
        ("title", &fields.title),
        ("description", &fields.description),
        ("category", &fields.category),
        ("location", &fields.location),
        ("contact", &fields.contact),
    ];
    for (name, value) in required.iter() {
        if value.trim().is_empty() {
            return Err(Error::bad_request(format!(
                "Missing required field '{}'",
                name
            )));
        }
    }
    Ok(())
}

fn in_transaction<T, F: FnOnce(&Transaction) -> Result<T>>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    func: F,
) -> Result<T> {
    let tx = conn.transaction_with_behavior(behavior)?;
    let result = func(&tx)?; // Dropping `tx` on error rolls it back
    tx.commit()?;
    Ok(result)
}
