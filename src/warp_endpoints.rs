use crate::constants::DELETE_FAILED_MESSAGE;
use crate::constants::DELETE_SUCCEEDED_MESSAGE;
use crate::constants::FLASH_COOKIE;
use crate::constants::RELAY_COOKIE;
use crate::constants::RELAY_MAX_AGE_SECONDS;
use crate::database_api::ItemId;
use crate::database_api::NewItem;
use crate::database_init::SqlitePool;
use crate::error::Error;
use crate::error::Result;
use crate::file_api::Upload;
use crate::html_views;
use crate::internal_api;
use crate::signed_cookie::clear_cookie;
use crate::signed_cookie::set_cookie;
use crate::signed_cookie::CookieSigner;
use crate::signed_cookie::Flash;
use crate::signed_cookie::PostReceipt;
use bytes::BufMut;
use chrono::Utc;
use log::error;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_stream::StreamExt;
use warp::http::status::StatusCode;
use warp::multipart::FormData;
use warp::Reply;

/// Everything a request handler needs, shared by all requests.
pub struct AppState {
    pub pool: SqlitePool,
    pub uploads_dir: PathBuf,
    pub signer: CookieSigner,
    pub max_upload_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub item_id: String,
    pub deletion_code: String,
}

pub fn list(state: &AppState, flash_cookie: Option<String>) -> Result<Box<dyn Reply>> {
    let flash = state.signer.read_flash(flash_cookie.as_deref());
    let conn = state.pool.get()?;
    let items = internal_api::list_all(&conn)?;
    let page = warp::reply::html(html_views::list_page(&items, flash.as_ref()));
    Ok(consume_cookie(page, FLASH_COOKIE, flash_cookie.is_some()))
}

pub fn show_post_form() -> Box<dyn Reply> {
    Box::new(warp::reply::html(html_views::post_form_page()))
}

/// Read the multipart submission, create the item and hand its id and code
/// to the success view through the signed relay cookie.
pub async fn submit_post(state: Arc<AppState>, form: FormData) -> Result<Box<dyn Reply>> {
    let (mut fields, upload) = read_post_form(form).await?;
    let new_item = new_item_from_fields(&mut fields)?;
    create_and_relay(state, new_item, upload).await
}

/// Same as `submit_post` for an urlencoded form, which cannot carry a photo.
pub async fn submit_post_urlencoded(
    state: Arc<AppState>,
    mut fields: HashMap<String, String>,
) -> Result<Box<dyn Reply>> {
    let new_item = new_item_from_fields(&mut fields)?;
    create_and_relay(state, new_item, None).await
}

/// Show the receipt exactly once. Without a valid pending receipt, go back to the list.
pub fn post_success(state: &AppState, relay_cookie: Option<String>) -> Box<dyn Reply> {
    let had_cookie = relay_cookie.is_some();
    match state
        .signer
        .read_receipt(relay_cookie.as_deref(), Utc::now().timestamp())
    {
        Some(receipt) => {
            let page = warp::reply::html(html_views::post_success_page(&receipt));
            consume_cookie(page, RELAY_COOKIE, true)
        }
        None => consume_cookie(redirect("/"), RELAY_COOKIE, had_cookie),
    }
}

pub fn show_delete_form(state: &AppState, flash_cookie: Option<String>) -> Box<dyn Reply> {
    let flash = state.signer.read_flash(flash_cookie.as_deref());
    let page = warp::reply::html(html_views::delete_form_page(flash.as_ref()));
    consume_cookie(page, FLASH_COOKIE, flash_cookie.is_some())
}

/// Unknown ids and wrong codes end up with the same message,
/// so that the response does not reveal which of the two was wrong.
pub fn submit_delete(state: &AppState, form: DeleteForm) -> Result<Box<dyn Reply>> {
    let outcome = match form.item_id.trim().parse::<ItemId>() {
        Ok(id) => {
            let mut conn = state.pool.get()?;
            internal_api::delete(&mut conn, &state.uploads_dir, id, &form.deletion_code)
        }
        Err(_) => Err(Error::not_found(format!(
            "Not an item id: {:?}",
            form.item_id
        ))),
    };
    let (flash, location) = match outcome {
        Ok(()) => (Flash::success(DELETE_SUCCEEDED_MESSAGE), "/"),
        Err(err) if err.code == StatusCode::NOT_FOUND || err.code == StatusCode::FORBIDDEN => {
            (Flash::error(DELETE_FAILED_MESSAGE), "/delete")
        }
        Err(err) => return Err(err),
    };
    let cookie = set_cookie(FLASH_COOKIE, &state.signer.sign(&flash)?, None);
    Ok(Box::new(warp::reply::with_header(
        redirect(location),
        "set-cookie",
        cookie,
    )))
}

pub fn item_detail(state: &AppState, id: ItemId) -> Result<Box<dyn Reply>> {
    let conn = state.pool.get()?;
    match internal_api::get(&conn, id) {
        Ok(item) => Ok(Box::new(warp::reply::html(html_views::item_detail_page(
            &item,
        )))),
        Err(err) if err.code == StatusCode::NOT_FOUND => Ok(Box::new(warp::reply::with_status(
            warp::reply::html(html_views::not_found_page(&err.msg)),
            StatusCode::NOT_FOUND,
        ))),
        Err(err) => Err(err),
    }
}

/// Turn a failed request into its status code response.
pub fn error_reply(err: Error) -> Box<dyn Reply> {
    if err.code.is_server_error() {
        error!("{}", err);
    }
    Box::new(warp::reply::with_status(err.msg, err.code))
}

//
// helper functions:
//

fn new_item_from_fields(fields: &mut HashMap<String, String>) -> Result<NewItem> {
    let mut take = |name: &str| {
        fields
            .remove(name)
            .ok_or_else(|| Error::bad_request(format!("Missing required field '{}'", name)))
    };
    Ok(NewItem {
        title: take("title")?,
        description: take("description")?,
        category: take("category")?,
        location: take("location")?,
        contact: take("contact")?,
    })
}

async fn create_and_relay(
    state: Arc<AppState>,
    new_item: NewItem,
    upload: Option<Upload>,
) -> Result<Box<dyn Reply>> {
    let create_state = state.clone();
    let item = tokio::task::spawn_blocking(move || {
        let mut conn = create_state.pool.get()?;
        internal_api::create(
            &mut conn,
            &create_state.uploads_dir,
            new_item,
            upload.as_ref(),
        )
    })
    .await
    .map_err(|err| Error::internal(format!("Post handler task failed, {}", err)))??;

    let receipt = PostReceipt {
        item_id: item.id,
        deletion_code: item.deletion_code,
        issued_at: Utc::now().timestamp(),
    };
    let cookie = set_cookie(
        RELAY_COOKIE,
        &state.signer.sign(&receipt)?,
        Some(RELAY_MAX_AGE_SECONDS),
    );
    Ok(Box::new(warp::reply::with_header(
        redirect("/post-success"),
        "set-cookie",
        cookie,
    )))
}

async fn read_post_form(form: FormData) -> Result<(HashMap<String, String>, Option<Upload>)> {
    let mut form = Box::pin(form);
    let mut fields = HashMap::new();
    let mut upload = None;
    while let Some(part) = form.next().await {
        let mut part = part?;
        let name = part.name().to_string();
        let filename = part.filename().map(|f| f.to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = part.data().await {
            bytes.put(chunk?);
        }
        if name == "image" {
            // Only the first file counts
            if upload.is_none() {
                upload = Some(Upload {
                    filename: filename.unwrap_or_default(),
                    bytes,
                });
            }
        } else {
            let value = String::from_utf8(bytes).map_err(|err| {
                Error::bad_request(format!("Field '{}' is not valid UTF-8, {}", name, err))
            })?;
            fields.insert(name, value);
        }
    }
    Ok((fields, upload))
}

fn redirect(location: &'static str) -> impl Reply {
    warp::reply::with_status(
        warp::reply::with_header(warp::reply(), "location", location),
        StatusCode::SEE_OTHER,
    )
}

/// Attach a clearing `Set-Cookie` if the request carried the cookie.
fn consume_cookie<R: Reply + 'static>(reply: R, name: &str, present: bool) -> Box<dyn Reply> {
    if present {
        Box::new(warp::reply::with_header(reply, "set-cookie", clear_cookie(name)))
    } else {
        Box::new(reply)
    }
}
