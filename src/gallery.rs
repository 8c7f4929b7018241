//! Gallery page state: the current page of memes and the actions on it.
//!
//! All backend calls run as background tasks. A newer list request replaces
//! the older one, so a slow stale page never overwrites a fresh one.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::api::{ApiError, ListQuery, Meme, MemeApi, MemeId, MemePage, SortDirection};
use crate::task::{Pending, Spawner, spawn_task};

/// Longest side of a gallery thumbnail
pub const THUMBNAIL_SIDE: u32 = 320;
/// Decoded thumbnails kept in memory, matching the gallery's texture cache
pub const THUMBNAIL_CACHE_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryNotice {
    Info(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationView {
    /// Zero-based
    pub page: u32,
    pub total_pages: u32,
}

impl PaginationView {
    pub fn label(&self) -> String {
        format!("Page {} of {}", self.page + 1, self.total_pages)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryView<'a> {
    Loading,
    Empty,
    Grid {
        items: &'a [Meme],
        /// Only present when there is more than one page
        pagination: Option<PaginationView>,
    },
}

pub struct GalleryState {
    api: Arc<dyn MemeApi>,
    spawner: Arc<dyn Spawner>,
    query: ListQuery,
    page: Option<MemePage>,
    listing: Option<Pending<Result<MemePage, ApiError>>>,
    deleting: Option<(MemeId, Pending<Result<(), ApiError>>)>,
    pending_delete: Option<Meme>,
    preview: Option<Meme>,
    thumbnails: Thumbnails,
}

impl std::fmt::Debug for GalleryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryState")
            .field("query", &self.query)
            .field("items", &self.page.as_ref().map(|page| page.items.len()))
            .field("loading", &self.listing.is_some())
            .field("pending_delete", &self.pending_delete.as_ref().map(|meme| &meme.id))
            .finish_non_exhaustive()
    }
}

impl GalleryState {
    pub fn new(api: Arc<dyn MemeApi>, spawner: Arc<dyn Spawner>, page_size: u32, sort: SortDirection) -> Self {
        let mut query = ListQuery::first_page(page_size);
        query.sort = sort;
        Self {
            thumbnails: Thumbnails::new(Arc::clone(&api), Arc::clone(&spawner), THUMBNAIL_CACHE_SIZE),
            api,
            spawner,
            query,
            page: None,
            listing: None,
            deleting: None,
            pending_delete: None,
            preview: None,
        }
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn sort(&self) -> SortDirection {
        self.query.sort
    }

    pub fn is_loading(&self) -> bool {
        self.listing.is_some()
    }

    pub fn view(&self) -> GalleryView<'_> {
        if self.listing.is_some() {
            return GalleryView::Loading;
        }
        match &self.page {
            None => GalleryView::Loading,
            Some(page) if page.items.is_empty() => GalleryView::Empty,
            Some(page) => GalleryView::Grid {
                items: &page.items,
                pagination: (page.total_pages > 1).then_some(PaginationView {
                    page: self.query.page,
                    total_pages: page.total_pages,
                }),
            },
        }
    }

    /// Fetch the current page again
    pub fn refresh(&mut self) {
        let query = self.query.clone();
        let api = Arc::clone(&self.api);
        debug!("Listing memes: {query:?}");
        self.listing = Some(spawn_task(self.spawner.as_ref(), "list-memes", move || api.list_memes(&query)));
    }

    /// New search term; always restarts from the first page
    pub fn submit_search(&mut self, term: &str) {
        self.query.search = term.trim().to_owned();
        self.query.page = 0;
        self.refresh();
    }

    /// Flip newest/oldest; always restarts from the first page
    pub fn toggle_sort(&mut self) {
        self.query.sort = self.query.sort.toggled();
        self.query.page = 0;
        self.refresh();
    }

    pub fn go_to_page(&mut self, page: u32) {
        let last = self.page.as_ref().map_or(0, |p| p.total_pages.saturating_sub(1));
        let page = page.min(last);
        if page != self.query.page {
            self.query.page = page;
            self.refresh();
        }
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.query.page.saturating_add(1));
    }

    pub fn previous_page(&mut self) {
        self.go_to_page(self.query.page.saturating_sub(1));
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Ask for confirmation before deleting `meme`
    pub fn request_delete(&mut self, meme: &Meme) {
        self.pending_delete = Some(meme.clone());
    }

    pub fn pending_delete(&self) -> Option<&Meme> {
        self.pending_delete.as_ref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn confirm_delete(&mut self) {
        let Some(meme) = self.pending_delete.take() else {
            return;
        };
        if self.deleting.is_some() {
            warn!("Delete already in progress, ignoring {}", meme.id);
            return;
        }
        info!("Deleting meme {}", meme.id);
        let api = Arc::clone(&self.api);
        let id = meme.id.clone();
        let pending = spawn_task(self.spawner.as_ref(), "delete-meme", move || api.delete_meme(&id));
        self.deleting = Some((meme.id, pending));
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting.is_some()
    }

    // =========================================================================
    // PREVIEW & SHARE
    // =========================================================================

    pub fn preview(&mut self, meme: &Meme) {
        self.preview = Some(meme.clone());
    }

    pub fn previewed(&self) -> Option<&Meme> {
        self.preview.as_ref()
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
    }

    /// Link to put on the clipboard for `meme`
    pub fn share_link(&self, meme: &Meme) -> Option<String> {
        meme.image_url.clone()
    }

    pub fn thumbnails(&mut self) -> &mut Thumbnails {
        &mut self.thumbnails
    }

    // =========================================================================
    // POLLING
    // =========================================================================

    /// Pick up finished backend calls. Call once per frame.
    pub fn poll(&mut self) -> Vec<GalleryNotice> {
        let mut notices = Vec::new();

        if let Some(listing) = self.listing.as_mut() {
            match listing.try_take() {
                Ok(None) => {}
                Ok(Some(Ok(page))) => {
                    debug!("Loaded {} memes, {} pages", page.items.len(), page.total_pages);
                    self.listing = None;
                    self.accept_page(page);
                }
                Ok(Some(Err(err))) => {
                    warn!("Listing memes failed: {err}");
                    self.listing = None;
                    self.page.get_or_insert_with(MemePage::default);
                    notices.push(GalleryNotice::Error(format!("Could not load memes: {err}")));
                }
                Err(lost) => {
                    self.listing = None;
                    self.page.get_or_insert_with(MemePage::default);
                    notices.push(GalleryNotice::Error(lost.to_string()));
                }
            }
        }

        if let Some((id, pending)) = self.deleting.as_mut() {
            let id = id.clone();
            match pending.try_take() {
                Ok(None) => {}
                Ok(Some(Ok(()))) => {
                    info!("Deleted meme {id}");
                    self.deleting = None;
                    if self.preview.as_ref().is_some_and(|meme| meme.id == id) {
                        self.preview = None;
                    }
                    notices.push(GalleryNotice::Info("Meme deleted".to_owned()));
                    self.refresh();
                }
                Ok(Some(Err(err))) => {
                    warn!("Deleting meme {id} failed: {err}");
                    self.deleting = None;
                    notices.push(GalleryNotice::Error(format!("Could not delete meme: {err}")));
                }
                Err(lost) => {
                    self.deleting = None;
                    notices.push(GalleryNotice::Error(lost.to_string()));
                }
            }
        }

        notices
    }

    /// A page past the end (e.g. after deleting the last item on it) falls
    /// back to the last page that exists
    fn accept_page(&mut self, page: MemePage) {
        if page.items.is_empty() && page.total_pages > 0 && self.query.page >= page.total_pages {
            self.query.page = page.total_pages - 1;
            self.page = Some(page);
            self.refresh();
            return;
        }
        self.page = Some(page);
    }
}

/// A decoded thumbnail, ready to upload as a texture
#[derive(Debug, Clone)]
pub enum Thumbnail {
    Loading,
    Ready(Arc<egui::ColorImage>),
    Failed,
}

/// Downloads and downsizes card images in the background. Finished jobs
/// drop their result into a shared inbox that the UI thread drains.
///
/// At most `capacity` finished thumbnails are kept; the least recently shown
/// one is evicted and downloaded again if it comes back into view.
pub struct Thumbnails {
    api: Arc<dyn MemeApi>,
    spawner: Arc<dyn Spawner>,
    capacity: usize,
    requested: HashSet<String>,
    ready: HashMap<String, Thumbnail>,
    /// Keys of `ready`, least recently used first
    recent: VecDeque<String>,
    inbox: Arc<Mutex<Vec<(String, Option<egui::ColorImage>)>>>,
}

impl Thumbnails {
    pub fn new(api: Arc<dyn MemeApi>, spawner: Arc<dyn Spawner>, capacity: usize) -> Self {
        Self {
            api,
            spawner,
            capacity: capacity.max(1),
            requested: HashSet::new(),
            ready: HashMap::new(),
            recent: VecDeque::new(),
            inbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of finished thumbnails held in memory
    pub fn cached(&self) -> usize {
        self.ready.len()
    }

    /// Current state for `url`, starting a download on first sight
    pub fn get(&mut self, url: &str) -> Thumbnail {
        self.drain();
        if let Some(thumbnail) = self.ready.get(url).cloned() {
            self.touch(url);
            return thumbnail;
        }
        if self.requested.insert(url.to_owned()) {
            let api = Arc::clone(&self.api);
            let inbox = Arc::clone(&self.inbox);
            let url = url.to_owned();
            self.spawner.spawn(
                "thumbnail",
                Box::new(move || {
                    let image = api
                        .download(&url)
                        .map_err(|err| err.to_string())
                        .and_then(|bytes| decode_thumbnail(&bytes).map_err(|err| err.to_string()));
                    let image = match image {
                        Ok(image) => Some(image),
                        Err(err) => {
                            warn!("Thumbnail {url} failed: {err}");
                            None
                        }
                    };
                    inbox.lock().push((url, image));
                }),
            );
        }
        self.drain();
        self.ready.get(url).cloned().unwrap_or(Thumbnail::Loading)
    }

    fn drain(&mut self) {
        let finished: Vec<_> = self.inbox.lock().drain(..).collect();
        for (url, image) in finished {
            let thumbnail = image.map_or(Thumbnail::Failed, |image| Thumbnail::Ready(Arc::new(image)));
            self.ready.insert(url.clone(), thumbnail);
            self.touch(&url);
        }
        while self.ready.len() > self.capacity {
            let Some(oldest) = self.recent.pop_front() else {
                break;
            };
            debug!("Evicting thumbnail {oldest}");
            self.ready.remove(&oldest);
            self.requested.remove(&oldest);
        }
    }

    fn touch(&mut self, url: &str) {
        if let Some(index) = self.recent.iter().position(|key| key == url) {
            self.recent.remove(index);
        }
        self.recent.push_back(url.to_owned());
    }
}

pub fn decode_thumbnail(bytes: &[u8]) -> Result<egui::ColorImage, image::ImageError> {
    let image = image::load_from_memory(bytes)?.thumbnail(THUMBNAIL_SIDE, THUMBNAIL_SIDE).to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportArtifact;
    use crate::task::InlineSpawner;

    struct PagedApi {
        total_pages: u32,
        calls: Mutex<Vec<ListQuery>>,
    }

    impl MemeApi for PagedApi {
        fn list_memes(&self, query: &ListQuery) -> Result<MemePage, ApiError> {
            self.calls.lock().push(query.clone());
            let items = if query.page < self.total_pages {
                vec![Meme {
                    id: MemeId::Number(query.page as i64),
                    title: format!("meme {}", query.page),
                    image_url: Some("http://x/a.png".to_owned()),
                    created_at: None,
                }]
            } else {
                Vec::new()
            };
            Ok(MemePage { items, total_pages: self.total_pages })
        }
        fn create_meme(&self, _file: &ExportArtifact, _title: &str) -> Result<Meme, ApiError> {
            Err(ApiError::Request("unused".to_owned()))
        }
        fn delete_meme(&self, _id: &MemeId) -> Result<(), ApiError> {
            Ok(())
        }
        fn download(&self, _url: &str) -> Result<Vec<u8>, ApiError> {
            Err(ApiError::Request("offline".to_owned()))
        }
    }

    fn gallery(total_pages: u32) -> (GalleryState, Arc<PagedApi>) {
        let api = Arc::new(PagedApi { total_pages, calls: Mutex::new(Vec::new()) });
        let state = GalleryState::new(api.clone(), Arc::new(InlineSpawner), 9, SortDirection::Desc);
        (state, api)
    }

    #[test]
    fn test_loading_until_first_page() {
        let (mut state, _) = gallery(1);
        assert_eq!(state.view(), GalleryView::Loading);
        state.refresh();
        assert_eq!(state.view(), GalleryView::Loading);
        state.poll();
        assert!(matches!(state.view(), GalleryView::Grid { pagination: None, .. }));
    }

    #[test]
    fn test_pagination_only_with_several_pages() {
        let (mut state, _) = gallery(3);
        state.refresh();
        state.poll();
        let GalleryView::Grid { pagination: Some(pagination), .. } = state.view() else {
            panic!("expected paginated grid");
        };
        assert_eq!(pagination.label(), "Page 1 of 3");
        assert!(!pagination.has_previous());
        assert!(pagination.has_next());
    }

    #[test]
    fn test_sort_and_search_reset_page() {
        let (mut state, api) = gallery(3);
        state.refresh();
        state.poll();
        state.next_page();
        state.poll();
        assert_eq!(state.query().page, 1);

        state.toggle_sort();
        state.poll();
        assert_eq!(state.query().page, 0);
        assert_eq!(state.sort(), SortDirection::Asc);

        state.next_page();
        state.poll();
        state.submit_search("  cats ");
        state.poll();
        let last = api.calls.lock().last().cloned().expect("call");
        assert_eq!(last.page, 0);
        assert_eq!(last.search, "cats");
        assert_eq!(last.sort, SortDirection::Asc);
    }

    #[test]
    fn test_page_is_clamped_to_last() {
        let (mut state, _) = gallery(2);
        state.refresh();
        state.poll();
        state.go_to_page(10);
        assert_eq!(state.query().page, 1);
    }

    #[test]
    fn test_delete_needs_confirmation_then_refreshes() {
        let (mut state, api) = gallery(1);
        state.refresh();
        state.poll();
        let calls_before = api.calls.lock().len();
        let meme = match state.view() {
            GalleryView::Grid { items, .. } => items[0].clone(),
            other => panic!("unexpected view {other:?}"),
        };

        state.request_delete(&meme);
        assert_eq!(state.pending_delete().map(|m| &m.id), Some(&meme.id));
        state.cancel_delete();
        assert!(state.pending_delete().is_none());

        state.request_delete(&meme);
        state.confirm_delete();
        let notices = state.poll();
        assert_eq!(notices, vec![GalleryNotice::Info("Meme deleted".to_owned())]);
        assert_eq!(api.calls.lock().len(), calls_before + 1);
    }

    #[test]
    fn test_failed_thumbnail_is_reported_once() {
        let (mut state, _) = gallery(1);
        assert!(matches!(state.thumbnails().get("http://x/a.png"), Thumbnail::Failed));
        assert!(matches!(state.thumbnails().get("http://x/a.png"), Thumbnail::Failed));
    }

    struct ImageApi {
        downloads: Mutex<Vec<String>>,
    }

    impl MemeApi for ImageApi {
        fn list_memes(&self, _query: &ListQuery) -> Result<MemePage, ApiError> {
            Ok(MemePage::default())
        }
        fn create_meme(&self, _file: &ExportArtifact, _title: &str) -> Result<Meme, ApiError> {
            Err(ApiError::Request("unused".to_owned()))
        }
        fn delete_meme(&self, _id: &MemeId) -> Result<(), ApiError> {
            Ok(())
        }
        fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
            self.downloads.lock().push(url.to_owned());
            let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
            let mut bytes = std::io::Cursor::new(Vec::new());
            image
                .write_to(&mut bytes, image::ImageFormat::Png)
                .map_err(|e| ApiError::Request(e.to_string()))?;
            Ok(bytes.into_inner())
        }
    }

    #[test]
    fn test_thumbnail_cache_evicts_least_recently_shown() {
        let api = Arc::new(ImageApi { downloads: Mutex::new(Vec::new()) });
        let mut thumbnails = Thumbnails::new(api.clone(), Arc::new(InlineSpawner), 2);

        assert!(matches!(thumbnails.get("a"), Thumbnail::Ready(_)));
        assert!(matches!(thumbnails.get("b"), Thumbnail::Ready(_)));
        // "a" was shown last, so "b" goes when "c" arrives
        thumbnails.get("a");
        assert!(matches!(thumbnails.get("c"), Thumbnail::Ready(_)));
        assert_eq!(thumbnails.cached(), 2);

        thumbnails.get("a");
        assert_eq!(api.downloads.lock().len(), 3);
        assert!(matches!(thumbnails.get("b"), Thumbnail::Ready(_)));
        assert_eq!(*api.downloads.lock(), vec!["a", "b", "c", "b"]);
        assert_eq!(thumbnails.cached(), 2);
    }

    #[test]
    fn test_share_link_is_image_url() {
        let (state, _) = gallery(1);
        let meme = Meme {
            id: MemeId::Number(1),
            title: "t".to_owned(),
            image_url: Some("http://x/1.png".to_owned()),
            created_at: None,
        };
        assert_eq!(state.share_link(&meme).as_deref(), Some("http://x/1.png"));
    }
}
