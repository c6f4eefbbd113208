//! In-memory port fakes shared by the engine's unit tests

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Notify, Semaphore};

use savesync_core::domain::{
    CommandKind, CredentialRejected, RemoteCommand, ResourceCategory, ResourceId, WatchRoot,
    WatchedResource,
};
use savesync_core::ports::{
    EventSubscription, FsEvent, ICommandChannel, IFileEventSource, ITransferGateway, UploadFile,
};

pub fn resource_in(id: &str, dir: &Path, exts: &[&str]) -> WatchedResource {
    WatchedResource::new(
        ResourceId::new(id).unwrap(),
        id,
        ResourceCategory::Game,
        vec![WatchRoot::new(
            dir,
            exts.iter().map(|s| s.to_string()).collect(),
        )],
    )
    .unwrap()
}

pub fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, bytes) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn rejected(context: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(CredentialRejected::new("Invalid session")).context(context.into())
}

// ============================================================================
// Transfer gateway
// ============================================================================

pub struct FakeGateway {
    pub attempts: AtomicUsize,
    uploads: Mutex<Vec<(ResourceId, Vec<UploadFile>)>>,
    fail_uploads: AtomicBool,
    reject_credential: AtomicBool,
    gated: AtomicBool,
    release: Semaphore,
    pub upload_started: Notify,
    archives: Mutex<HashMap<ResourceId, Vec<u8>>>,
    pub downloads: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            fail_uploads: AtomicBool::new(false),
            reject_credential: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            release: Semaphore::new(0),
            upload_started: Notify::new(),
            archives: Mutex::new(HashMap::new()),
            downloads: AtomicUsize::new(0),
        })
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Fails every transfer the way the API client does on a 401
    pub fn reject_credential(&self, reject: bool) {
        self.reject_credential.store(reject, Ordering::SeqCst);
    }

    /// Makes every upload wait for [`release_one`](Self::release_one)
    pub fn gate_uploads(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release_one(&self) {
        self.release.add_permits(1);
    }

    pub fn set_archive(&self, id: &str, archive: Vec<u8>) {
        self.archives
            .lock()
            .unwrap()
            .insert(ResourceId::new(id).unwrap(), archive);
    }

    pub fn uploads(&self) -> Vec<(ResourceId, Vec<UploadFile>)> {
        self.uploads.lock().unwrap().clone()
    }

    /// Sorted relative paths of every successful upload, in order
    pub fn uploaded_names(&self) -> Vec<Vec<String>> {
        self.uploads()
            .into_iter()
            .map(|(_, files)| {
                let mut names: Vec<_> = files.into_iter().map(|f| f.relative_path).collect();
                names.sort();
                names
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ITransferGateway for FakeGateway {
    async fn upload(&self, resource: &ResourceId, files: Vec<UploadFile>) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.upload_started.notify_one();
        if self.gated.load(Ordering::SeqCst) {
            self.release.acquire().await?.forget();
        }
        if self.reject_credential.load(Ordering::SeqCst) {
            return Err(rejected(format!("Upload of {resource} failed")));
        }
        if self.fail_uploads.load(Ordering::SeqCst) {
            anyhow::bail!("upload rejected");
        }
        self.uploads.lock().unwrap().push((resource.clone(), files));
        Ok(())
    }

    async fn download(&self, resource: &ResourceId) -> anyhow::Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.reject_credential.load(Ordering::SeqCst) {
            return Err(rejected(format!("Download of {resource} failed")));
        }
        self.archives
            .lock()
            .unwrap()
            .get(resource)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no saves for {resource}"))
    }

    async fn delete(&self, resource: &ResourceId) -> anyhow::Result<()> {
        self.archives.lock().unwrap().remove(resource);
        Ok(())
    }
}

// ============================================================================
// Command channel
// ============================================================================

#[derive(Default)]
pub struct FakeCommandChannel {
    script: Mutex<VecDeque<anyhow::Result<Vec<RemoteCommand>>>>,
    reports: Mutex<Vec<(CommandKind, bool)>>,
    fail_reports: AtomicBool,
    pub polls: AtomicUsize,
}

impl FakeCommandChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_commands(&self, kinds: &[CommandKind]) {
        let commands = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| RemoteCommand::new(i as u64 + 1, *kind))
            .collect();
        self.script.lock().unwrap().push_back(Ok(commands));
    }

    pub fn push_error(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(anyhow::anyhow!(message.to_string())));
    }

    pub fn push_rejection(&self) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(rejected("GET /api/sync-requests/pending failed")));
    }

    pub fn fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    pub fn reports(&self) -> Vec<(CommandKind, bool)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ICommandChannel for FakeCommandChannel {
    async fn poll(&self) -> anyhow::Result<Vec<RemoteCommand>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn report_completion(&self, kind: CommandKind, success: bool) -> anyhow::Result<()> {
        self.reports.lock().unwrap().push((kind, success));
        if self.fail_reports.load(Ordering::SeqCst) {
            anyhow::bail!("report failed");
        }
        Ok(())
    }
}

// ============================================================================
// File event source
// ============================================================================

#[derive(Default)]
pub struct FakeEventSource {
    senders: Mutex<Vec<(Vec<PathBuf>, mpsc::Sender<FsEvent>)>>,
    pub stopped: Arc<AtomicUsize>,
}

impl FakeEventSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sender for the subscription that covers `dir`
    pub fn sender_for(&self, dir: &Path) -> Option<mpsc::Sender<FsEvent>> {
        self.senders
            .lock()
            .unwrap()
            .iter()
            .find(|(dirs, _)| dirs.iter().any(|d| d == dir))
            .map(|(_, tx)| tx.clone())
    }

    pub fn subscriptions(&self) -> usize {
        self.senders.lock().unwrap().len()
    }
}

impl IFileEventSource for FakeEventSource {
    fn subscribe(&self, directories: &[PathBuf]) -> anyhow::Result<EventSubscription> {
        let (tx, rx) = mpsc::channel(64);
        self.senders
            .lock()
            .unwrap()
            .push((directories.to_vec(), tx));
        let stopped = Arc::clone(&self.stopped);
        Ok(EventSubscription::new(rx, move || {
            stopped.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// Event source whose subscriptions always fail
pub struct FailingEventSource;

impl IFileEventSource for FailingEventSource {
    fn subscribe(&self, directories: &[PathBuf]) -> anyhow::Result<EventSubscription> {
        anyhow::bail!("inotify limit reached for {} directories", directories.len())
    }
}
