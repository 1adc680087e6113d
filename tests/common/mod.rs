//! In-memory fakes for every collaborator of the catalog core

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};

use catalog_mirror::cache::{CacheError, KvStore, ManualClock, MemoryStore};
use catalog_mirror::catalog::{
    AssetContent, AssetMirror, AssetSink, ByteStream, CatalogAssembler, CatalogService,
    CatalogSettings, ContentSource, ImageProxy, ReadFailurePolicy, TreeLister, UploadRequest,
};
use catalog_mirror::cdn::CdnError;
use catalog_mirror::drive::{ChildKind, DriveError, DriveFile};
use catalog_mirror::server::AppState;

pub const ROOT: &str = "root";

/// Remote folder tree keyed by parent id
#[derive(Default)]
pub struct FakeTree {
    children: Mutex<HashMap<String, Vec<DriveFile>>>,
    pub listings: AtomicUsize,
    /// Artificial latency per listing
    pub delay: Mutex<Option<Duration>>,
}

impl FakeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, parent: &str, child: DriveFile) {
        self.children
            .lock()
            .unwrap()
            .entry(parent.to_string())
            .or_default()
            .push(child);
    }

    pub fn folder(&self, parent: &str, id: &str, name: &str) {
        self.add(parent, DriveFile::folder(id, name));
        self.children
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default();
    }

    pub fn file(&self, parent: &str, id: &str, name: &str) {
        self.add(parent, DriveFile::file(id, name, "image/jpeg"));
    }

    pub fn remove_folder(&self, id: &str) {
        self.children.lock().unwrap().remove(id);
    }

    /// Build `categories` x `subfolders` x `files`
    pub fn grid(categories: usize, subfolders: usize, files: usize) -> Self {
        let tree = Self::new();
        tree.children.lock().unwrap().entry(ROOT.to_string()).or_default();
        for c in 0..categories {
            let cid = format!("c{}", c);
            tree.folder(ROOT, &cid, &format!("Category {}", c));
            for s in 0..subfolders {
                let sid = format!("{}-s{}", cid, s);
                tree.folder(&cid, &sid, &format!("Sub {}", s));
                for f in 0..files {
                    tree.file(&sid, &format!("{}-f{}", sid, f), &format!("item-{}.jpg", f));
                }
            }
        }
        tree
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TreeLister for FakeTree {
    async fn list_children(
        &self,
        parent_id: &str,
        kind: ChildKind,
    ) -> Result<Vec<DriveFile>, DriveError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let children = self.children.lock().unwrap();
        let entries = children
            .get(parent_id)
            .ok_or_else(|| DriveError::NotFound(parent_id.to_string()))?;
        Ok(entries.iter().filter(|f| f.matches(kind)).cloned().collect())
    }
}

/// File contents are the file id's bytes
#[derive(Default)]
pub struct FakeSource {
    pub fetches: AtomicUsize,
    pub meta_lookups: AtomicUsize,
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn fetch(&self, file_id: &str) -> Result<AssetContent, DriveError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if file_id.starts_with("missing") {
            return Err(DriveError::NotFound(file_id.to_string()));
        }
        let chunks: Vec<Result<Bytes, std::io::Error>> = file_id
            .as_bytes()
            .chunks(3)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(AssetContent {
            mime_type: "image/jpeg".to_string(),
            stream: stream::iter(chunks).boxed(),
        })
    }

    async fn mime_type(&self, file_id: &str) -> Result<String, DriveError> {
        self.meta_lookups.fetch_add(1, Ordering::SeqCst);
        if file_id.starts_with("missing") {
            return Err(DriveError::NotFound(file_id.to_string()));
        }
        Ok("image/webp".to_string())
    }
}

/// Records uploads; rejects the public ids in `reject`
#[derive(Default)]
pub struct FakeSink {
    pub uploads: Mutex<Vec<(UploadRequest, Vec<u8>)>>,
    pub reject: Mutex<HashSet<String>>,
}

impl FakeSink {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn reject(&self, public_id: &str) {
        self.reject.lock().unwrap().insert(public_id.to_string());
    }

    pub fn accept_all(&self) {
        self.reject.lock().unwrap().clear();
    }
}

#[async_trait]
impl AssetSink for FakeSink {
    async fn upload(&self, request: &UploadRequest, stream: ByteStream) -> Result<String, CdnError> {
        let chunks: Vec<Bytes> = stream
            .try_collect()
            .await
            .map_err(|e| CdnError::Stream(e.to_string()))?;
        self.uploads
            .lock()
            .unwrap()
            .push((request.clone(), chunks.concat()));

        if self.reject.lock().unwrap().contains(&request.public_id) {
            return Err(CdnError::Rejected {
                status: 400,
                message: "rejected".to_string(),
            });
        }
        Ok(format!(
            "https://cdn.test/{}/{}",
            request.collection, request.public_id
        ))
    }
}

/// Store wrapper whose reads or writes can be made to fail
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            inner: MemoryStore::with_clock(clock),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Network("connection reset".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("OOM command not allowed".to_string()));
        }
        self.inner.set(key, value, ttl).await
    }
}

/// The catalog core wired to fakes
pub struct Harness {
    pub tree: Arc<FakeTree>,
    pub source: Arc<FakeSource>,
    pub sink: Arc<FakeSink>,
    pub store: Arc<FlakyStore>,
    pub clock: Arc<ManualClock>,
    pub service: CatalogService,
    pub images: ImageProxy,
}

impl Harness {
    pub fn new(tree: FakeTree) -> Self {
        Self::with_options(tree, 1, ReadFailurePolicy::Miss)
    }

    pub fn with_options(tree: FakeTree, concurrency: usize, read_policy: ReadFailurePolicy) -> Self {
        let tree = Arc::new(tree);
        let source = Arc::new(FakeSource::default());
        let sink = Arc::new(FakeSink::default());
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(FlakyStore::new(clock.clone()));

        let mirror = AssetMirror::new(store.clone(), source.clone(), sink.clone(), "sarees")
            .with_read_policy(read_policy);
        let assembler = Arc::new(CatalogAssembler::with_concurrency(
            tree.clone(),
            mirror,
            concurrency,
        ));
        let mut settings = CatalogSettings::new(ROOT);
        settings.read_policy = read_policy;
        let service = CatalogService::new(store.clone(), assembler, settings);
        let images = ImageProxy::new(store.clone(), source.clone()).with_read_policy(read_policy);

        Self {
            tree,
            source,
            sink,
            store,
            clock,
            service,
            images,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            catalog: self.service.clone(),
            images: self.images.clone(),
        }
    }
}
