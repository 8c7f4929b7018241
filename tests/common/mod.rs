#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use meme_studio::api::{ApiError, ListQuery, Meme, MemeApi, MemeId, MemePage};
use meme_studio::config::EditorConfig;
use meme_studio::export::ExportArtifact;
use meme_studio::task::InlineSpawner;
use meme_studio::text::FontBook;
use meme_studio::{EditorServices, EditorSession};
use parking_lot::Mutex;

/// What the backend received for one create call
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub title: String,
    pub bytes: Vec<u8>,
}

/// In-memory backend that records every call
#[derive(Default)]
pub struct FakeApi {
    pub uploads: Mutex<Vec<Upload>>,
    pub queries: Mutex<Vec<ListQuery>>,
    pub deleted: Mutex<Vec<MemeId>>,
    pub pages: Mutex<Vec<MemePage>>,
    pub fail_create: Mutex<Option<ApiError>>,
    pub download_bytes: Mutex<Vec<u8>>,
    next_id: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }
}

impl MemeApi for FakeApi {
    fn list_memes(&self, query: &ListQuery) -> Result<MemePage, ApiError> {
        self.queries.lock().push(query.clone());
        let pages = self.pages.lock();
        Ok(pages.get(query.page as usize).cloned().unwrap_or_else(|| MemePage {
            items: Vec::new(),
            total_pages: pages.len() as u32,
        }))
    }

    fn create_meme(&self, file: &ExportArtifact, title: &str) -> Result<Meme, ApiError> {
        if let Some(err) = self.fail_create.lock().clone() {
            return Err(err);
        }
        self.uploads.lock().push(Upload {
            file_name: file.file_name.clone(),
            mime: file.mime.to_owned(),
            title: title.to_owned(),
            bytes: file.bytes.clone(),
        });
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        Ok(Meme {
            id: MemeId::Number(id),
            title: title.to_owned(),
            image_url: Some(format!("http://memes.test/{id}.png")),
            created_at: Some("2026-10-18T10:00:00Z".to_owned()),
        })
    }

    fn delete_meme(&self, id: &MemeId) -> Result<(), ApiError> {
        self.deleted.lock().push(id.clone());
        Ok(())
    }

    fn download(&self, _url: &str) -> Result<Vec<u8>, ApiError> {
        Ok(self.download_bytes.lock().clone())
    }
}

pub fn meme(id: i64, title: &str) -> Meme {
    Meme {
        id: MemeId::Number(id),
        title: title.to_owned(),
        image_url: Some(format!("http://memes.test/{id}.png")),
        created_at: Some("2026-10-18T10:00:00Z".to_owned()),
    }
}

/// A solid-colour PNG
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("png encodes");
    bytes.into_inner()
}

pub fn services(api: Arc<FakeApi>) -> EditorServices {
    EditorServices {
        api,
        spawner: Arc::new(InlineSpawner),
        fonts: Arc::new(FontBook::with_defaults().expect("bundled fonts")),
        config: EditorConfig::default(),
    }
}

pub fn session(api: Arc<FakeApi>) -> EditorSession {
    EditorSession::mount(services(api)).expect("editor mounts")
}

/// Session with a 600x600 background already loaded
pub fn session_with_background(api: Arc<FakeApi>) -> EditorSession {
    let mut session = session(api);
    session.load_bytes(png_bytes(600, 600, [200, 50, 50, 255]));
    session.poll();
    assert!(session.scene().background().is_some());
    session
}
