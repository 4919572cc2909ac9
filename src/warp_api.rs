use crate::command_line_interface::CliOptions;
use crate::constants::FLASH_COOKIE;
use crate::constants::RELAY_COOKIE;
use crate::database_api::ItemId;
use crate::internal_api;
use crate::warp_endpoints;
use crate::warp_endpoints::AppState;
use crate::warp_endpoints::DeleteForm;
use log::info;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::multipart::FormData;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

/// Form posts without a file stay tiny; anything larger is refused outright.
const MAX_DELETE_FORM_BYTES: u64 = 16 * 1024;

/// All endpoints of the bulletin, ready to be served (or driven by `warp::test`).
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // Get version of cargo project.
    let version = warp::path("version")
        .and(warp::path::end())
        .and(warp::get())
        .map(internal_api::get_project_version);

    // Every item, newest first, plus a pending flash message if any.
    let st = state.clone();
    let list = warp::path::end()
        .and(warp::get())
        .and(warp::cookie::optional(FLASH_COOKIE))
        .map(move |flash: Option<String>| {
            let result = warp_endpoints::list(&st, flash);
            let boxed: Box<dyn Reply> = match result {
                Ok(reply) => reply,
                Err(err) => warp_endpoints::error_reply(err),
            };
            boxed
        });

    let show_post_form = warp::path("post")
        .and(warp::path::end())
        .and(warp::get())
        .map(warp_endpoints::show_post_form);

    // Multipart form: title, description, category, location, contact, optional image.
    // Submissions above the configured size are refused with 413 before anything is stored.
    let st = state.clone();
    let submit_post = warp::path("post")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(state.max_upload_bytes))
        .and_then(move |form: FormData| {
            let st = st.clone();
            async move {
                let result = warp_endpoints::submit_post(st, form).await;
                let boxed: Box<dyn Reply> = match result {
                    Ok(reply) => reply,
                    Err(err) => warp_endpoints::error_reply(err),
                };
                Ok::<_, Infallible>(boxed)
            }
        });

    // The same form without a photo, as sent by clients that do not use multipart.
    let st = state.clone();
    let submit_post_urlencoded = warp::path("post")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(state.max_upload_bytes))
        .and(warp::body::form())
        .and_then(move |fields: HashMap<String, String>| {
            let st = st.clone();
            async move {
                let result = warp_endpoints::submit_post_urlencoded(st, fields).await;
                let boxed: Box<dyn Reply> = match result {
                    Ok(reply) => reply,
                    Err(err) => warp_endpoints::error_reply(err),
                };
                Ok::<_, Infallible>(boxed)
            }
        });

    let st = state.clone();
    let post_success = warp::path("post-success")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::cookie::optional(RELAY_COOKIE))
        .map(move |relay: Option<String>| warp_endpoints::post_success(&st, relay));

    let st = state.clone();
    let show_delete_form = warp::path("delete")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::cookie::optional(FLASH_COOKIE))
        .map(move |flash: Option<String>| warp_endpoints::show_delete_form(&st, flash));

    let st = state.clone();
    let submit_delete = warp::path("delete")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_DELETE_FORM_BYTES))
        .and(warp::body::form())
        .map(move |form: DeleteForm| {
            let result = warp_endpoints::submit_delete(&st, form);
            let boxed: Box<dyn Reply> = match result {
                Ok(reply) => reply,
                Err(err) => warp_endpoints::error_reply(err),
            };
            boxed
        });

    let st = state.clone();
    let item_detail = warp::path!("item" / ItemId)
        .and(warp::get())
        .map(move |id: ItemId| {
            let result = warp_endpoints::item_detail(&st, id);
            let boxed: Box<dyn Reply> = match result {
                Ok(reply) => reply,
                Err(err) => warp_endpoints::error_reply(err),
            };
            boxed
        });

    // Stored photos, by their stored filename.
    let uploads = warp::path("uploads")
        .and(warp::get())
        .and(warp::fs::dir(state.uploads_dir.clone()));

    version
        .or(list)
        .or(show_post_form)
        .or(submit_post)
        .or(submit_post_urlencoded)
        .or(post_success)
        .or(show_delete_form)
        .or(submit_delete)
        .or(item_detail)
        .or(uploads)
        .with(warp::log("lostfound::http"))
}

/// Start web framework with specified APIs.
pub async fn run_server(cli_options: &CliOptions, state: AppState) {
    let package_name = env!("CARGO_PKG_NAME").to_uppercase();
    info!("Starting {} HTTP server", package_name);
    info!("Storing uploads in {}", state.uploads_dir.display());

    let routes = routes(Arc::new(state));
    let socket = SocketAddr::new(cli_options.address, cli_options.port);
    match (&cli_options.tls_pub_crt, &cli_options.tls_priv_key) {
        (Some(cert), Some(key)) => {
            info!("Listening on https://{}", socket);
            warp::serve(routes)
                .tls()
                .cert_path(cert)
                .key_path(key)
                .run(socket)
                .await;
        }
        _ => {
            info!("Listening on http://{}", socket);
            warp::serve(routes).run(socket).await;
        }
    }
}
