mod common;

use std::sync::Arc;

use common::{FakeApi, meme};
use meme_studio::api::{MemePage, SortDirection};
use meme_studio::gallery::{GalleryNotice, GalleryState, GalleryView};
use meme_studio::task::InlineSpawner;

fn gallery(api: Arc<FakeApi>) -> GalleryState {
    GalleryState::new(api, Arc::new(InlineSpawner), 9, SortDirection::Desc)
}

#[test]
fn test_empty_backend_shows_empty_state() {
    let api = FakeApi::new();
    let mut gallery = gallery(api.clone());
    gallery.refresh();
    gallery.poll();

    assert_eq!(gallery.view(), GalleryView::Empty);
    let query = api.queries.lock()[0].clone();
    assert_eq!((query.page, query.size, query.sort), (0, 9, SortDirection::Desc));
}

#[test]
fn test_single_page_has_no_pagination() {
    let api = FakeApi::new();
    api.pages.lock().push(MemePage {
        items: vec![meme(1, "one"), meme(2, "two")],
        total_pages: 1,
    });
    let mut gallery = gallery(api);
    gallery.refresh();
    gallery.poll();

    match gallery.view() {
        GalleryView::Grid { items, pagination } => {
            assert_eq!(items.len(), 2);
            assert!(pagination.is_none());
        }
        other => panic!("unexpected view {other:?}"),
    }
}

#[test]
fn test_paging_through_results() {
    let api = FakeApi::new();
    for page in 0..3 {
        api.pages.lock().push(MemePage {
            items: vec![meme(page, &format!("meme {page}"))],
            total_pages: 3,
        });
    }
    let mut gallery = gallery(api.clone());
    gallery.refresh();
    gallery.poll();
    gallery.next_page();
    gallery.poll();
    gallery.next_page();
    gallery.poll();
    gallery.next_page();
    gallery.poll();

    let GalleryView::Grid { items, pagination: Some(pagination) } = gallery.view() else {
        panic!("expected paginated grid");
    };
    assert_eq!(items[0].title, "meme 2");
    assert_eq!(pagination.label(), "Page 3 of 3");
    assert!(!pagination.has_next());
    // the request past the end was never sent
    assert_eq!(api.queries.lock().len(), 3);
}

#[test]
fn test_confirmed_delete_calls_backend_and_refreshes() {
    let api = FakeApi::new();
    api.pages.lock().push(MemePage {
        items: vec![meme(7, "doomed")],
        total_pages: 1,
    });
    let mut gallery = gallery(api.clone());
    gallery.refresh();
    gallery.poll();

    gallery.request_delete(&meme(7, "doomed"));
    assert!(api.deleted.lock().is_empty());
    gallery.confirm_delete();
    let notices = gallery.poll();

    assert_eq!(api.deleted.lock().as_slice(), &[meme_studio::api::MemeId::Number(7)]);
    assert_eq!(notices, vec![GalleryNotice::Info("Meme deleted".to_owned())]);
    assert_eq!(api.queries.lock().len(), 2);
}
