use crate::error::ErrorContext;
use crate::error::Result;
use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use log::debug;
use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;

pub type ItemId = i64;
pub type DBTime = i64;

/// A lost or found listing, exactly as stored in the `items` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub contact: String,
    pub deletion_code: String,
    pub image_filename: Option<String>,
    /// UTC milliseconds
    pub date_posted: DBTime,
}

impl Item {
    pub fn date_posted_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis(self.date_posted)
    }
}

/// User supplied fields of a new listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub contact: String,
}

const ITEM_COLUMNS: &str = "\
    id, \
    title, \
    description, \
    category, \
    location, \
    contact, \
    deletion_code, \
    image_filename, \
    date_posted";

fn item_from_row(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        location: row.get(4)?,
        contact: row.get(5)?,
        deletion_code: row.get(6)?,
        image_filename: row.get(7)?,
        date_posted: row.get(8)?,
    })
}

pub fn insert_item(
    conn: &Connection,
    item: &NewItem,
    deletion_code: &str,
    image_filename: Option<&str>,
    date_posted_millis: DBTime,
) -> Result<ItemId> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO items (\
            title, \
            description, \
            category, \
            location, \
            contact, \
            deletion_code, \
            image_filename, \
            date_posted \
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?);",
        )
        .context_str("Failed to prepare/compile INSERT statement")?;
    stmt.insert(params![
        item.title,
        item.description,
        item.category,
        item.location,
        item.contact,
        deletion_code,
        image_filename,
        date_posted_millis,
    ])
    .context_str("Failed to execute insert_item with parameters")
}

/// All items, newest first. Items posted within the same millisecond
/// keep their insertion order (higher id first).
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    debug!("Listing all items");
    let sql = format!(
        "SELECT {} FROM items ORDER BY date_posted DESC, id DESC;",
        ITEM_COLUMNS
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([], item_from_row)?;
    let mut result = Vec::new();
    for item in rows {
        result.push(item?);
    }
    Ok(result)
}

pub fn get_item(conn: &Connection, id: ItemId) -> Result<Option<Item>> {
    debug!("Getting item {}", id);
    let sql = format!("SELECT {} FROM items WHERE id = ?;", ITEM_COLUMNS);
    let mut stmt = conn.prepare_cached(&sql)?;
    let item = stmt.query_row(params![id], item_from_row).optional()?;
    Ok(item)
}

/// Remove the row. Returns `false` if no item had this id.
pub fn remove_item(conn: &Connection, id: ItemId) -> Result<bool> {
    let mut stmt = conn.prepare_cached("DELETE FROM items WHERE id = ?;")?;
    let removed = stmt.execute(params![id])?;
    Ok(removed > 0)
}

pub fn count_items(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))?;
    Ok(count)
}
