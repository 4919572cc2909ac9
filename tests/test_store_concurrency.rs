extern crate lostfound;

mod common;

use common::TestApp;
use lostfound::database_api::NewItem;
use lostfound::internal_api;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use warp::http::StatusCode;

fn umbrella(n: usize) -> NewItem {
    NewItem {
        title: format!("Umbrella {}", n),
        description: "Green, folding".to_string(),
        category: "Accessories".to_string(),
        location: "Bus stop".to_string(),
        contact: "555-0100".to_string(),
    }
}

#[test]
fn test_concurrent_creates_get_distinct_ids() {
    let app = TestApp::new();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|n| {
            let state = app.state.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let mut conn = state.pool.get().unwrap();
                barrier.wait();
                internal_api::create(&mut conn, &state.uploads_dir, umbrella(n), None)
                    .map(|item| item.id)
            })
        })
        .collect();
    let ids: HashSet<i64> = handles
        .into_iter()
        .map(|h| h.join().unwrap().expect("every create should succeed"))
        .collect();
    assert_eq!(ids.len(), threads);
    assert_eq!(app.count(), threads as i64);
}

#[test]
fn test_concurrent_deletes_remove_once() {
    let app = TestApp::new();
    let item = {
        let mut conn = app.state.pool.get().unwrap();
        internal_api::create(&mut conn, &app.state.uploads_dir, umbrella(0), None).unwrap()
    };
    let id = item.id;
    let threads = 4;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let state = app.state.clone();
            let barrier = barrier.clone();
            let code = item.deletion_code.clone();
            thread::spawn(move || {
                let mut conn = state.pool.get().unwrap();
                barrier.wait();
                internal_api::delete(&mut conn, &state.uploads_dir, id, &code)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_eq!(result.as_ref().unwrap_err().code, StatusCode::NOT_FOUND);
    }
    assert_eq!(app.count(), 0);
}
