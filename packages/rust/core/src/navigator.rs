//! Navigation controller: binds TOC interactions to host capabilities.
//!
//! The host supplies two capabilities:
//! - [`FileBrowser`] — the directory the user is looking at
//! - [`DocumentOpener`] — opens or focuses a document in a given view
//!
//! [`Navigator::on_toggle`] and [`Navigator::on_open_file`] are what the
//! host UI binds to chevron and entry clicks. Each open issues a new
//! [`RequestToken`]; metadata from an open that has since been superseded
//! is dropped instead of being reported.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use jbooknav_contents::ContentsClient;
use jbooknav_shared::{DirectoryListing, NavError, Result, ViewMode};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::book::{extract_book_author, extract_book_title};
use crate::paths::{join_target, reconcile, view_mode_for};
use crate::title::extract_title;
use crate::toc::{Chevron, NodeId, TocFragment, TocTree, parse_toc_html};

/// Default book config file name.
const DEFAULT_CONFIG_FILE: &str = "_config.yml";

// ---------------------------------------------------------------------------
// Host capabilities
// ---------------------------------------------------------------------------

/// The host's file browser.
pub trait FileBrowser: Send + Sync {
    /// Current directory relative to the server root, if known.
    fn current_path(&self) -> Option<String>;
}

/// The host's document manager.
pub trait DocumentOpener: Send + Sync {
    /// Open `path` in `view`, or focus it if already open.
    fn open_or_reveal(&self, path: &str, view: ViewMode) -> Result<()>;
}

/// A file browser fixed at one directory.
#[derive(Debug, Clone)]
pub struct FixedBrowser(pub String);

impl FileBrowser for FixedBrowser {
    fn current_path(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Request generations
// ---------------------------------------------------------------------------

/// Monotonic counter; issuing a token invalidates all earlier ones.
#[derive(Debug, Clone, Default)]
pub struct RequestGeneration(Arc<AtomicU64>);

/// Handle for one in-flight open.
#[derive(Debug, Clone)]
pub struct RequestToken {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl RequestGeneration {
    /// Issue a new token, superseding every earlier one.
    pub fn issue(&self) -> RequestToken {
        let id = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        RequestToken {
            id,
            latest: Arc::clone(&self.0),
        }
    }
}

impl RequestToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether no newer token has been issued.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Where a document was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenTarget {
    /// Reconciled book root.
    pub book_root: String,
    /// Server-relative path handed to the opener.
    pub path: String,
    pub view: ViewMode,
}

/// Metadata gathered after opening.
#[derive(Debug, Clone, Serialize)]
pub struct EntryMetadata {
    /// Document title, or the title sentinel.
    pub title: String,
    /// Book title, or the book title sentinel.
    pub book_title: String,
    /// Book author, or the author sentinel.
    pub author: String,
    /// Listing of the book root, if the server allowed it.
    pub listing: Option<DirectoryListing>,
}

/// Result of an open request.
#[derive(Debug)]
pub enum OpenOutcome {
    /// Nothing was opened.
    Aborted(NavError),
    /// The document was opened. `metadata` is `None` when a newer open
    /// superseded this one before the metadata arrived.
    Opened {
        target: OpenTarget,
        metadata: Option<EntryMetadata>,
    },
}

impl OpenOutcome {
    /// The opened target, if any.
    pub fn target(&self) -> Option<&OpenTarget> {
        match self {
            Self::Opened { target, .. } => Some(target),
            Self::Aborted(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

/// Binds TOC interactions to the contents API and the host.
pub struct Navigator<B, O> {
    client: ContentsClient,
    browser: Option<B>,
    opener: O,
    config_file: String,
    generation: RequestGeneration,
}

impl<B: FileBrowser, O: DocumentOpener> Navigator<B, O> {
    /// Create a navigator. `browser` is `None` when the host has no active file browser.
    pub fn new(client: ContentsClient, browser: Option<B>, opener: O) -> Self {
        Self {
            client,
            browser,
            opener,
            config_file: DEFAULT_CONFIG_FILE.to_string(),
            generation: RequestGeneration::default(),
        }
    }

    /// Use a different book config file name.
    pub fn with_config_file(mut self, name: impl Into<String>) -> Self {
        self.config_file = name.into();
        self
    }

    pub fn client(&self) -> &ContentsClient {
        &self.client
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    pub fn generation(&self) -> &RequestGeneration {
        &self.generation
    }

    /// Fetch and parse the TOC for the browser's directory.
    ///
    /// Any failure means the sidebar shows nothing; it is logged as a
    /// missing server extension.
    #[instrument(skip_all)]
    pub async fn load_toc(&self) -> Option<TocFragment> {
        let browser_path = match self.browser.as_ref() {
            Some(browser) => browser.current_path().unwrap_or_default(),
            None => {
                debug!("file browser is not available");
                String::new()
            }
        };

        let response = match self.client.fetch_toc(&browser_path).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    error = %e,
                    "the jupyterlab_jupyterbook_navigation server extension appears to be missing"
                );
                return None;
            }
        };

        match parse_toc_html(&response.data) {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                error!(error = %e, "could not parse table of contents");
                None
            }
        }
    }

    /// Chevron click: flip the entry's subsection.
    pub fn on_toggle(&self, tree: &mut TocTree, id: NodeId) -> Result<Chevron> {
        let chevron = tree.toggle(id)?;
        debug!(id, icon = chevron.icon_class(), "toggled subsection");
        Ok(chevron)
    }

    /// Entry click: open the entry `id` of `tree`.
    pub async fn on_open_file(&self, tree: &TocTree, id: NodeId) -> OpenOutcome {
        let file_path = match tree.find(id) {
            Some(entry) => entry.file_path.as_deref(),
            None => return abort(NavError::missing(format!("no TOC entry with id {id}"))),
        };

        match file_path {
            Some(file_path) => self.open_file(&tree.book_dir, file_path).await,
            None => abort(NavError::missing(format!(
                "TOC entry {id} has no data-file-path"
            ))),
        }
    }

    /// Open `file_path` (relative to `book_dir`) and gather its metadata.
    #[instrument(skip(self))]
    pub async fn open_file(&self, book_dir: &str, file_path: &str) -> OpenOutcome {
        let token = self.generation.issue();

        let Some(browser) = self.browser.as_ref() else {
            return abort(NavError::missing("file browser not found"));
        };
        let Some(browser_path) = browser.current_path() else {
            return abort(NavError::missing(
                "the file browser's current path is not set",
            ));
        };
        debug!(%browser_path, "current directory");

        let book_root = match reconcile(book_dir, &browser_path) {
            Ok(root) => root,
            Err(e) => return abort(e),
        };

        let target = OpenTarget {
            path: join_target(&book_root, file_path),
            view: view_mode_for(file_path),
            book_root,
        };

        if let Err(e) = self.opener.open_or_reveal(&target.path, target.view) {
            return abort(e);
        }
        info!(path = %target.path, view = %target.view, "opened document");

        let config_path = join_target(&target.book_root, &self.config_file);
        let (title, book_title, author, listing) = tokio::join!(
            extract_title(&self.client, &target.path),
            extract_book_title(&self.client, &config_path),
            extract_book_author(&self.client, &config_path),
            self.client.list_directory(&target.book_root),
        );

        if !token.is_current() {
            debug!(token = token.id(), "superseded by a newer open, dropping metadata");
            return OpenOutcome::Opened {
                target,
                metadata: None,
            };
        }

        info!(%title, %book_title, %author, "entry metadata");
        OpenOutcome::Opened {
            target,
            metadata: Some(EntryMetadata {
                title,
                book_title,
                author,
                listing,
            }),
        }
    }
}

fn abort(error: NavError) -> OpenOutcome {
    warn!(error = %error, "open aborted");
    OpenOutcome::Aborted(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use jbooknav_shared::ServerSettings;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::book::BOOK_TITLE_SENTINEL;
    use crate::title::TITLE_SENTINEL;

    #[derive(Default)]
    struct RecordingOpener {
        opened: Mutex<Vec<(String, ViewMode)>>,
    }

    impl DocumentOpener for RecordingOpener {
        fn open_or_reveal(&self, path: &str, view: ViewMode) -> Result<()> {
            self.opened.lock().unwrap().push((path.to_string(), view));
            Ok(())
        }
    }

    impl RecordingOpener {
        fn opened(&self) -> Vec<(String, ViewMode)> {
            self.opened.lock().unwrap().clone()
        }
    }

    struct UnsetBrowser;

    impl FileBrowser for UnsetBrowser {
        fn current_path(&self) -> Option<String> {
            None
        }
    }

    fn navigator(
        server: &MockServer,
        browser: Option<FixedBrowser>,
    ) -> Navigator<FixedBrowser, RecordingOpener> {
        let client = ContentsClient::new(ServerSettings::new(&server.uri()).unwrap()).unwrap();
        Navigator::new(client, browser, RecordingOpener::default())
    }

    async fn serve_book(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/contents/work/demo-book/intro.md"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"content": "# Introduction\n"})),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/contents/work/demo-book/_config.yml"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": "title: Demo Book\nauthor: Jane Doe\nlogo: logo.png\n"
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/contents/work/demo-book"))
            .and(query_param("content", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "demo-book",
                "path": "work/demo-book",
                "type": "directory",
                "content": []
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn tokens_supersede_each_other() {
        let generation = RequestGeneration::default();
        let first = generation.issue();
        assert!(first.is_current());

        let second = generation.issue();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.id() > first.id());
    }

    #[tokio::test]
    async fn open_markdown_entry() {
        let server = MockServer::start().await;
        serve_book(&server).await;
        let nav = navigator(&server, Some(FixedBrowser("work/demo-book".into())));

        let outcome = nav.open_file("/home/jovyan/work/demo-book", "intro.md").await;

        let OpenOutcome::Opened { target, metadata } = outcome else {
            panic!("expected Opened, got {outcome:?}");
        };
        assert_eq!(target.path, "work/demo-book/intro.md");
        assert_eq!(target.view, ViewMode::MarkdownPreview);

        let metadata = metadata.expect("metadata");
        assert_eq!(metadata.title, "Introduction");
        assert_eq!(metadata.book_title, "Demo Book");
        assert_eq!(metadata.author, "Jane Doe");
        assert!(metadata.listing.is_some());

        assert_eq!(
            nav.opener().opened(),
            [("work/demo-book/intro.md".to_string(), ViewMode::MarkdownPreview)]
        );
    }

    #[tokio::test]
    async fn notebook_opens_in_default_view_with_sentinels_on_failure() {
        let server = MockServer::start().await;
        let nav = navigator(&server, Some(FixedBrowser("work/demo-book".into())));

        let outcome = nav
            .open_file("/home/jovyan/work/demo-book", "chapters/basics.ipynb")
            .await;

        let OpenOutcome::Opened { target, metadata } = outcome else {
            panic!("expected Opened");
        };
        assert_eq!(target.view, ViewMode::Default);
        let metadata = metadata.expect("metadata");
        assert_eq!(metadata.title, TITLE_SENTINEL);
        assert_eq!(metadata.book_title, BOOK_TITLE_SENTINEL);
        assert!(metadata.listing.is_none());
    }

    #[tokio::test]
    async fn missing_browser_aborts_without_opening() {
        let server = MockServer::start().await;
        let nav = navigator(&server, None);

        let outcome = nav.open_file("/home/jovyan/book", "intro.md").await;
        assert!(matches!(outcome, OpenOutcome::Aborted(NavError::MissingContext(_))));
        assert!(nav.opener().opened().is_empty());
    }

    #[tokio::test]
    async fn unset_browser_path_aborts() {
        let server = MockServer::start().await;
        let client = ContentsClient::new(ServerSettings::new(&server.uri()).unwrap()).unwrap();
        let nav = Navigator::new(client, Some(UnsetBrowser), RecordingOpener::default());

        let outcome = nav.open_file("/home/jovyan/book", "intro.md").await;
        assert!(matches!(outcome, OpenOutcome::Aborted(NavError::MissingContext(_))));
    }

    #[tokio::test]
    async fn unreconcilable_path_aborts_without_requests() {
        let server = MockServer::start().await;
        let nav = navigator(&server, Some(FixedBrowser("other/place".into())));

        let outcome = nav.open_file("/srv/book", "intro.md").await;
        assert!(matches!(outcome, OpenOutcome::Aborted(NavError::Resolution { .. })));
        assert!(nav.opener().opened().is_empty());

        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn superseded_open_drops_metadata() {
        let server = MockServer::start().await;
        serve_book(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/contents/work/demo-book/slow.md"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"content": "# Slow\n"}))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;
        let nav = navigator(&server, Some(FixedBrowser("work/demo-book".into())));

        let (slow, fast) = tokio::join!(
            nav.open_file("/home/jovyan/work/demo-book", "slow.md"),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                nav.open_file("/home/jovyan/work/demo-book", "intro.md").await
            },
        );

        let OpenOutcome::Opened { metadata: stale, .. } = slow else {
            panic!("expected slow open to succeed");
        };
        assert!(stale.is_none());

        let OpenOutcome::Opened { metadata: fresh, .. } = fast else {
            panic!("expected fast open to succeed");
        };
        assert_eq!(fresh.expect("metadata").title, "Introduction");
        assert_eq!(nav.opener().opened().len(), 2);
    }

    #[tokio::test]
    async fn load_toc_and_open_entry() {
        let server = MockServer::start().await;
        serve_book(&server).await;
        let html = std::fs::read_to_string("../../../fixtures/html/toc.html")
            .expect("read fixture");
        Mock::given(method("GET"))
            .and(path("/jupyterlab-jupyterbook-navigation/get-toc"))
            .and(query_param("path", "work/demo-book"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": html })))
            .mount(&server)
            .await;
        let nav = navigator(&server, Some(FixedBrowser("work/demo-book".into())));

        let Some(TocFragment::Book(mut tree)) = nav.load_toc().await else {
            panic!("expected a book");
        };
        assert_eq!(nav.on_toggle(&mut tree, 1).unwrap(), Chevron::Up);

        let outcome = nav.on_open_file(&tree, 0).await;
        assert_eq!(
            outcome.target().map(|t| t.path.as_str()),
            Some("work/demo-book/intro.md")
        );
    }

    #[tokio::test]
    async fn load_toc_without_extension_is_none() {
        let server = MockServer::start().await;
        let nav = navigator(&server, Some(FixedBrowser("work".into())));

        assert!(nav.load_toc().await.is_none());
    }

    #[tokio::test]
    async fn open_unknown_entry_aborts() {
        let server = MockServer::start().await;
        let nav = navigator(&server, Some(FixedBrowser("book".into())));
        let tree = TocTree {
            book_dir: "book".into(),
            title: None,
            author: None,
            nodes: Vec::new(),
        };

        let outcome = nav.on_open_file(&tree, 7).await;
        assert!(matches!(outcome, OpenOutcome::Aborted(NavError::MissingContext(_))));
    }
}
