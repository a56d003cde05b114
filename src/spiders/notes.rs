use std::collections::BTreeMap;
use std::fmt::Debug;

use serde_json::json;
use ulid::Ulid;

use crate::extract::Extractor;
use crate::request::RequestSpec;

const CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Posts one notes-search query per page.
pub struct NotesSearchSpider {
    options: NotesSearchOptions,
    search_id: String,
}

impl NotesSearchSpider {
    pub fn new(options: NotesSearchOptions) -> Self {
        let search_id = options
            .search_id
            .clone()
            .unwrap_or_else(|| Ulid::new().to_string().to_lowercase());
        tracing::debug!(
            keyword = %options.keyword,
            pages = options.pages,
            "configuring NotesSearchSpider"
        );
        Self { options, search_id }
    }

    fn page_body(&self, page: u32) -> Vec<u8> {
        let options = &self.options;
        json!({
            "keyword": options.keyword,
            "page": page,
            "page_size": options.page_size,
            "search_id": self.search_id,
            "sort": options.sort,
            "note_type": options.note_type,
            "ext_flags": [],
            "image_formats": options.image_formats,
        })
        .to_string()
        .into_bytes()
    }
}

impl Debug for NotesSearchSpider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotesSearchSpider {{ /* omitted */ }}")
    }
}

impl Default for NotesSearchSpider {
    fn default() -> Self {
        Self::new(NotesSearchOptions::default())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct NotesSearchOptions {
    pub endpoint: String,
    pub keyword: String,
    pub first_page: u32,
    pub pages: u32,
    pub page_size: u32,
    pub sort: String,
    pub note_type: u32,
    pub image_formats: Vec<String>,
    pub search_id: Option<String>,
    /// Sent with every request (cookie, signing headers and so on).
    pub headers: BTreeMap<String, String>,
    /// JSON Pointer to the notes inside the response.
    pub items_path: String,
}

impl Default for NotesSearchOptions {
    fn default() -> Self {
        Self {
            endpoint: "https://edith.xiaohongshu.com/api/sns/web/v1/search/notes".into(),
            keyword: String::new(),
            first_page: 1,
            pages: 1,
            page_size: 20,
            sort: "time_descending".into(),
            note_type: 0,
            image_formats: vec!["jpg".into(), "webp".into(), "avif".into()],
            search_id: None,
            headers: BTreeMap::new(),
            items_path: "/data/items".into(),
        }
    }
}

impl super::Spider for NotesSearchSpider {
    fn name(&self) -> String {
        String::from("notes")
    }

    fn start_requests(&self) -> Vec<RequestSpec> {
        let first = self.options.first_page;
        (first..first.saturating_add(self.options.pages))
            .map(|page| {
                // the fragment keeps pages distinct without changing what is sent
                let url = format!("{}#page={}", self.options.endpoint, page);
                let mut spec = RequestSpec::post(url, self.page_body(page))
                    .with_headers(self.options.headers.clone());
                if spec.header("content-type").is_none() {
                    spec = spec.with_header("content-type", CONTENT_TYPE);
                }
                spec
            })
            .collect()
    }

    fn extractor(&self) -> Extractor {
        Extractor::new(self.options.items_path.clone())
    }
}
