//! Terminal host for one document-chat workspace.
//!
//! The shell owns the session objects (document store, chat, layout, viewer)
//! and turns input lines into calls on them:
//!
//! ```text
//! :add <path>...     upload PDF files
//! :rm <n|key>        remove one document
//! :clear             remove every document
//! :select <n|key>    show a document in the viewer
//! :docs              list documents
//! :split <percent>   set the chat pane width
//! :drag <x> <width>  simulate dragging the divider
//! :view              describe the viewer pane
//! :help / :quit
//! anything else      ask a question
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use docuery_chat::{ChatSession, SubmitOutcome, EMPTY_CHAT_PLACEHOLDER};
use docuery_data::{
    ApiClient, BlobUrlRegistry, ClientConfig, DocumentBackend, DocumentStore, JsonFileStorage,
    KeyValueStorage, LocalFile,
};
use docuery_widgets::{ContainerRect, DocumentViewer, ReflowTarget, SplitLayout, ViewerState};
use tokio::io::{AsyncBufReadExt, BufReader};

// ─── Commands ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(Vec<PathBuf>),
    Remove(String),
    Clear,
    Select(String),
    Docs,
    Split(f64),
    Drag { x: f64, width: f64 },
    View,
    Help,
    Quit,
    Ask(String),
    Invalid(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix(':') else {
            return Some(Command::Ask(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("add", []) => Command::Invalid("usage: :add <path>...".to_string()),
            ("add", paths) => Command::Add(paths.iter().map(PathBuf::from).collect()),
            ("rm", [target]) => Command::Remove(target.to_string()),
            ("clear", []) => Command::Clear,
            ("select", [target]) => Command::Select(target.to_string()),
            ("docs", []) => Command::Docs,
            ("split", [value]) => match value.trim_end_matches('%').parse() {
                Ok(percent) => Command::Split(percent),
                Err(_) => Command::Invalid(format!("not a percentage: {value}")),
            },
            ("drag", [x, width]) => match (x.parse(), width.parse()) {
                (Ok(x), Ok(width)) => Command::Drag { x, width },
                _ => Command::Invalid("usage: :drag <x> <width>".to_string()),
            },
            ("view", []) => Command::View,
            ("help", []) => Command::Help,
            ("quit", []) | ("q", []) => Command::Quit,
            _ => Command::Invalid(format!("unknown command: {line}")),
        };
        Some(command)
    }
}

// ─── Viewer host ──────────────────────────────────────────────────────────────

/// The terminal has no layout engine; reflows are only traced.
struct TerminalHost;

impl ReflowTarget for TerminalHost {
    fn dispatch_window_resize(&self) {
        log::debug!("Window resize dispatched");
    }

    fn reflow_embedded(&self) -> Result<(), String> {
        log::debug!("Embedded viewer reflow requested");
        Ok(())
    }
}

// ─── App ──────────────────────────────────────────────────────────────────────

pub struct App {
    store: DocumentStore,
    chat: ChatSession,
    layout: SplitLayout,
    viewer: DocumentViewer,
}

impl App {
    pub fn new(config: ClientConfig) -> Self {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(match &config.storage_path {
            Some(path) => JsonFileStorage::open(path),
            None => JsonFileStorage::load(),
        });
        let backend: Arc<dyn DocumentBackend> = Arc::new(ApiClient::new(config));

        let store = DocumentStore::new(backend.clone(), Arc::new(BlobUrlRegistry::new()));
        let chat = ChatSession::new(store.clone(), backend);
        let layout = SplitLayout::new(storage);
        let viewer = DocumentViewer::new(store.clone(), layout.subscribe(), Arc::new(TerminalHost));

        Self {
            store,
            chat,
            layout,
            viewer,
        }
    }

    /// Run one command. Returns `false` when the shell should exit.
    pub async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Add(paths) => self.add(paths).await,
            Command::Remove(target) => match self.resolve_target(&target) {
                Some(key) => {
                    self.store.remove_document(&key).await;
                }
                None => println!("No document matches {target}"),
            },
            Command::Clear => self.store.clear_all().await,
            Command::Select(target) => match self.resolve_target(&target) {
                Some(key) => self.store.select(key),
                None => println!("No document matches {target}"),
            },
            Command::Docs => self.print_documents(),
            Command::Split(percent) => {
                self.layout.set_ratio(percent);
                self.print_layout();
            }
            Command::Drag { x, width } => {
                self.layout.begin_resize();
                self.layout.pointer_move(x, ContainerRect { left: 0.0, width });
                self.layout.pointer_up();
                self.print_layout();
            }
            Command::View => self.print_view(),
            Command::Help => print_help(),
            Command::Quit => return false,
            Command::Ask(question) => self.ask(&question).await,
            Command::Invalid(message) => println!("{message}"),
        }

        if self.viewer.sync() {
            self.print_view();
        }
        true
    }

    async fn add(&self, paths: Vec<PathBuf>) {
        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            match LocalFile::from_path(&path) {
                Ok(file) => candidates.push(file),
                Err(e) => println!("Skipping {}: {}", path.display(), e),
            }
        }

        let report = self.store.add_documents(candidates).await;
        for name in &report.rejected_non_pdf {
            println!("Skipping {name}: not a PDF");
        }
        println!("{}", self.store.summary());
    }

    async fn ask(&self, question: &str) {
        match self.chat.submit(question).await {
            SubmitOutcome::Ignored => return,
            SubmitOutcome::Answered(response) => {
                self.print_last_reply();
                for (index, citation) in response.citations.iter().enumerate() {
                    match citation.page {
                        Some(page) => println!("  [{}] {} p.{}", index + 1, citation.filename, page),
                        None => println!("  [{}] {}", index + 1, citation.filename),
                    }
                }
            }
            SubmitOutcome::NoDocuments | SubmitOutcome::Failed(_) => self.print_last_reply(),
        }
    }

    /// Accept a 1-based position in the document list or a document key.
    fn resolve_target(&self, target: &str) -> Option<String> {
        let documents = self.store.documents();
        if let Ok(position) = target.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|index| documents.get(index))
                .map(|d| d.key.clone());
        }
        documents.into_iter().find(|d| d.key == target).map(|d| d.key)
    }

    fn print_last_reply(&self) {
        if let Some(reply) = self.chat.messages().last() {
            println!("{}\n", reply.display_text());
        }
    }

    fn print_documents(&self) {
        let documents = self.store.documents();
        if documents.is_empty() {
            println!("{}", self.store.summary());
            return;
        }
        let active = self.store.active_key();
        for (index, document) in documents.iter().enumerate() {
            let marker = if active.as_deref() == Some(document.key.as_str()) { '*' } else { ' ' };
            println!("{} {}. {}  [{}]", marker, index + 1, document.file.name, document.key);
        }
    }

    fn print_layout(&self) {
        println!(
            "Chat {:.0}% | Viewer {:.0}%",
            self.layout.chat_pane_basis(),
            self.layout.viewer_pane_basis()
        );
    }

    fn print_view(&self) {
        match self.viewer.view() {
            ViewerState::Empty { title, message, hint } => {
                println!("[{title}] {message}. {hint}");
            }
            ViewerState::Showing { title, source, .. } => {
                println!("[Viewing] {title} ({source})");
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.store.dispose();
    }
}

fn print_help() {
    println!(":add <path>...      upload PDF files");
    println!(":rm <n|key>         remove a document");
    println!(":clear              remove every document");
    println!(":select <n|key>     show a document");
    println!(":docs               list documents");
    println!(":split <percent>    set the chat pane width (30-70)");
    println!(":drag <x> <width>   drag the divider to x in a container of width");
    println!(":view               describe the viewer");
    println!(":quit               exit");
    println!("anything else is sent as a question");
}

pub async fn app_main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env();
    log::info!("Using backend at {}", config.base_url);

    let mut app = App::new(config);
    println!("{}", EMPTY_CHAT_PLACEHOLDER);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        if !app.handle_command(command).await {
            break;
        }
    }

    log::info!("Shutting down");
    Ok(())
}
