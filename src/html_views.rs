//! Minimal server-rendered pages. Every user supplied string goes through `escape_html`.

use crate::database_api::Item;
use crate::signed_cookie::Flash;
use crate::signed_cookie::FlashKind;
use crate::signed_cookie::PostReceipt;
use std::fmt::Write;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, flash: Option<&Flash>, body: &str) -> String {
    let flash = match flash {
        Some(flash) => {
            let class = match flash.kind {
                FlashKind::Success => "flash success",
                FlashKind::Error => "flash error",
            };
            format!(
                "<div class=\"{}\">{}</div>\n",
                class,
                escape_html(&flash.message)
            )
        }
        None => String::new(),
    };
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>{title} - Campus Lost &amp; Found</title></head>\n\
         <body>\n\
         <header><h1><a href=\"/\">Campus Lost &amp; Found</a></h1>\n\
         <nav><a href=\"/post\">Post an item</a> | <a href=\"/delete\">Mark item as found</a></nav></header>\n\
         {flash}\
         <main>\n{body}</main>\n\
         </body>\n\
         </html>\n",
        title = escape_html(title),
        flash = flash,
        body = body,
    )
}

fn date_label(item: &Item) -> String {
    item.date_posted_utc().format("%Y-%m-%d %H:%M").to_string()
}

pub fn list_page(items: &[Item], flash: Option<&Flash>) -> String {
    let mut body = String::new();
    if items.is_empty() {
        body.push_str("<p class=\"empty\">No items posted yet. Be the first to post!</p>\n");
    } else {
        body.push_str("<ul class=\"items\">\n");
        for item in items {
            let _ = writeln!(
                body,
                "<li><a href=\"/item/{id}\">{title}</a> <span class=\"category\">{category}</span> \
                 <span class=\"location\">{location}</span> <time>{date}</time></li>",
                id = item.id,
                title = escape_html(&item.title),
                category = escape_html(&item.category),
                location = escape_html(&item.location),
                date = date_label(item),
            );
        }
        body.push_str("</ul>\n");
    }
    layout("All items", flash, &body)
}

pub fn post_form_page() -> String {
    let body = "<h2>Post a Lost or Found Item</h2>\n\
        <form method=\"post\" action=\"/post\" enctype=\"multipart/form-data\">\n\
        <label>Title <input name=\"title\" required></label>\n\
        <label>Description <textarea name=\"description\" required></textarea></label>\n\
        <label>Category <select name=\"category\" required>\
        <option>Electronics</option><option>Clothing</option><option>Accessories</option>\
        <option>Books</option><option>Keys</option><option>ID Cards</option><option>Other</option>\
        </select></label>\n\
        <label>Location <input name=\"location\" required></label>\n\
        <label>Contact <input name=\"contact\" required></label>\n\
        <label>Photo (png, jpg, jpeg, gif) <input type=\"file\" name=\"image\" accept=\"image/*\"></label>\n\
        <button type=\"submit\">Post item</button>\n\
        </form>\n";
    layout("Post an item", None, body)
}

pub fn post_success_page(receipt: &PostReceipt) -> String {
    let body = format!(
        "<h2>Item Posted Successfully</h2>\n\
         <p>Your item ID is <strong class=\"item-id\">{id}</strong>.</p>\n\
         <p>Your deletion code is <strong class=\"deletion-code\">{code}</strong>.</p>\n\
         <p>Write both down: they are shown only once and are needed to remove the listing \
         when the item is found.</p>\n\
         <p><a href=\"/item/{id}\">View your listing</a></p>\n",
        id = receipt.item_id,
        code = escape_html(&receipt.deletion_code),
    );
    layout("Item posted", None, &body)
}

pub fn delete_form_page(flash: Option<&Flash>) -> String {
    let body = "<h2>Mark Item as Found</h2>\n\
        <form method=\"post\" action=\"/delete\">\n\
        <label>Item ID <input name=\"item_id\" required></label>\n\
        <label>Deletion code <input name=\"deletion_code\" required maxlength=\"6\"></label>\n\
        <button type=\"submit\">Remove listing</button>\n\
        </form>\n";
    layout("Mark item as found", flash, body)
}

pub fn item_detail_page(item: &Item) -> String {
    let image = match &item.image_filename {
        Some(filename) => format!(
            "<img class=\"photo\" src=\"/uploads/{}\" alt=\"{}\">\n",
            escape_html(filename),
            escape_html(&item.title)
        ),
        None => String::new(),
    };
    let body = format!(
        "<article>\n\
         <h2>{title}</h2>\n\
         {image}\
         <p class=\"description\">{description}</p>\n\
         <dl>\n\
         <dt>Category</dt><dd>{category}</dd>\n\
         <dt>Location</dt><dd>{location}</dd>\n\
         <dt>Contact</dt><dd>{contact}</dd>\n\
         <dt>Posted</dt><dd>{date}</dd>\n\
         <dt>Item ID</dt><dd>{id}</dd>\n\
         </dl>\n\
         </article>\n",
        title = escape_html(&item.title),
        image = image,
        description = escape_html(&item.description),
        category = escape_html(&item.category),
        location = escape_html(&item.location),
        contact = escape_html(&item.contact),
        date = date_label(item),
        id = item.id,
    );
    layout(&item.title, None, &body)
}

pub fn not_found_page(what: &str) -> String {
    let body = format!(
        "<h2>Not found</h2>\n<p>{}</p>\n<p><a href=\"/\">Back to all items</a></p>\n",
        escape_html(what)
    );
    layout("Not found", None, &body)
}
