//! In-memory collaborators shared by the upload integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cruxclip_upload::{
    AccessToken, BackendError, ChunkProgressUpdate, InitializeRequest, InitializeResponse,
    MarkUploadedRequest, MarkUploadedResponse, ObjectStore, ResumableEndpoint,
    ResumableTransport, StoreError, UploadBackend, UploadConfiguration, UploadOrchestrator,
    WriteOptions,
};

pub const TOKEN: &str = "test-token";
pub const OBJECT_LOCATION: &str = "videos/user-1/session-1.mp4";
pub const PUBLIC_URL: &str = "https://cdn.example.com/videos/user-1/session-1.mp4";
pub const ENDPOINT_URL: &str = "https://storage.example.com/upload/resumable";

/// Configuration with tiny chunks and near-instant retries.
pub fn fast_config() -> UploadConfiguration {
    UploadConfiguration::new()
        .with_resumable_threshold(1_000)
        .with_chunk_size(10)
        .with_max_concurrent_transfers(3)
        .with_retry_base_delay(Duration::from_millis(1))
}

/// Deterministic file content of `len` bytes.
pub fn video_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i: usize| (i % 251) as u8).collect()
}

/// Initialize response pointing at the test locations.
pub fn initialize_response() -> InitializeResponse {
    InitializeResponse {
        session_id: "session-1".to_string(),
        object_location: OBJECT_LOCATION.to_string(),
        public_url: PUBLIC_URL.to_string(),
        endpoint_url: Some(ENDPOINT_URL.to_string()),
        endpoint_headers: HashMap::new(),
        strategy_hint: None,
        chunk_size_bytes: None,
    }
}

/// Test harness wiring the in-memory collaborators into an orchestrator.
pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<MemoryTransport>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            backend: Arc::new(MockBackend::default()),
            store: Arc::new(MemoryStore::default()),
            transport: Arc::new(MemoryTransport::default()),
        }
    }

    pub fn orchestrator(&self, config: UploadConfiguration) -> UploadOrchestrator {
        UploadOrchestrator::new(
            self.backend.clone(),
            self.store.clone(),
            self.transport.clone(),
            config,
        )
        .unwrap()
    }
}

/// Backend with scripted responses that records every call.
pub struct MockBackend {
    pub initialize_result: Mutex<Result<InitializeResponse, BackendError>>,
    pub finalize_result: Mutex<Result<MarkUploadedResponse, BackendError>>,
    pub fail_progress: bool,
    pub initialize_calls: Mutex<Vec<InitializeRequest>>,
    pub finalize_calls: Mutex<Vec<MarkUploadedRequest>>,
    pub progress_calls: Mutex<Vec<ChunkProgressUpdate>>,
    pub tokens: Mutex<Vec<String>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            initialize_result: Mutex::new(Ok(initialize_response())),
            finalize_result: Mutex::new(Ok(MarkUploadedResponse {
                status: "processing".to_string(),
            })),
            fail_progress: false,
            initialize_calls: Mutex::new(Vec::new()),
            finalize_calls: Mutex::new(Vec::new()),
            progress_calls: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub fn with_initialize(self, result: Result<InitializeResponse, BackendError>) -> Self {
        *self.initialize_result.lock().unwrap() = result;
        self
    }

    pub fn with_finalize(self, result: Result<MarkUploadedResponse, BackendError>) -> Self {
        *self.finalize_result.lock().unwrap() = result;
        self
    }

    pub fn with_failing_progress(mut self) -> Self {
        self.fail_progress = true;
        self
    }

    pub fn initialize_count(&self) -> usize {
        self.initialize_calls.lock().unwrap().len()
    }

    pub fn finalize_count(&self) -> usize {
        self.finalize_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl UploadBackend for MockBackend {
    async fn initialize_upload(
        &self,
        request: &InitializeRequest,
        token: &AccessToken,
    ) -> Result<InitializeResponse, BackendError> {
        self.initialize_calls.lock().unwrap().push(request.clone());
        self.tokens.lock().unwrap().push(token.as_str().to_string());
        self.initialize_result.lock().unwrap().clone()
    }

    async fn mark_uploaded(
        &self,
        request: &MarkUploadedRequest,
        token: &AccessToken,
    ) -> Result<MarkUploadedResponse, BackendError> {
        self.finalize_calls.lock().unwrap().push(request.clone());
        self.tokens.lock().unwrap().push(token.as_str().to_string());
        self.finalize_result.lock().unwrap().clone()
    }

    async fn update_chunk_progress(
        &self,
        update: &ChunkProgressUpdate,
        _token: &AccessToken,
    ) -> Result<(), BackendError> {
        self.progress_calls.lock().unwrap().push(update.clone());
        if self.fail_progress {
            return Err(BackendError::Status {
                status: 500,
                message: Some("progress table unavailable".to_string()),
            });
        }
        Ok(())
    }
}

/// Upsert object store with per-location failure injection and
/// concurrency tracking.
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub attempts: Mutex<Vec<String>>,
    pub options: Mutex<Vec<WriteOptions>>,
    failures: Mutex<HashMap<String, VecDeque<StoreError>>>,
    permanent: Mutex<HashMap<String, StoreError>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    /// Fail the next `errors.len()` writes to `location`.
    pub fn fail_next(&self, location: &str, errors: Vec<StoreError>) {
        self.failures
            .lock()
            .unwrap()
            .insert(location.to_string(), errors.into());
    }

    /// Fail every write to `location`.
    pub fn fail_always(&self, location: &str, error: StoreError) {
        self.permanent
            .lock()
            .unwrap()
            .insert(location.to_string(), error);
    }

    pub fn attempts_for(&self, location: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|attempted: &&String| attempted.as_str() == location)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Concatenate stored objects in location order.
    pub fn assembled(&self) -> Vec<u8> {
        let objects = self.objects.lock().unwrap();
        let mut keys: Vec<&String> = objects.keys().collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|key: &String| objects[key].to_vec())
            .collect()
    }

    fn scripted_failure(&self, location: &str) -> Option<StoreError> {
        if let Some(error) = self.permanent.lock().unwrap().get(location) {
            return Some(error.clone());
        }
        self.failures
            .lock()
            .unwrap()
            .get_mut(location)
            .and_then(|queue: &mut VecDeque<StoreError>| queue.pop_front())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn write(
        &self,
        location: &str,
        data: Bytes,
        options: &WriteOptions,
        _token: &AccessToken,
    ) -> Result<(), StoreError> {
        let current: usize = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.attempts.lock().unwrap().push(location.to_string());
        self.options.lock().unwrap().push(options.clone());

        // Let sibling writes of the batch start before this one resolves
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        let result: Result<(), StoreError> = match self.scripted_failure(location) {
            Some(error) => Err(error),
            None => {
                self.objects
                    .lock()
                    .unwrap()
                    .insert(location.to_string(), data);
                Ok(())
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// In-memory resumable protocol server.
#[derive(Default)]
pub struct MemoryTransport {
    pub received: Mutex<Vec<u8>>,
    pub endpoints: Mutex<Vec<ResumableEndpoint>>,
    pub metadata: Mutex<Vec<(String, String)>>,
    pub created_size: Mutex<Option<u64>>,
    pub patches: AtomicUsize,
    /// Number of upcoming patches that fail before touching the data.
    pub failing_patches: AtomicUsize,
}

#[async_trait]
impl ResumableTransport for MemoryTransport {
    async fn create(
        &self,
        endpoint: &ResumableEndpoint,
        total_size: u64,
        metadata: &[(String, String)],
    ) -> Result<String, StoreError> {
        self.endpoints.lock().unwrap().push(endpoint.clone());
        *self.metadata.lock().unwrap() = metadata.to_vec();
        *self.created_size.lock().unwrap() = Some(total_size);
        Ok(format!("{}/files/1", endpoint.url))
    }

    async fn offset(
        &self,
        _endpoint: &ResumableEndpoint,
        _upload_url: &str,
    ) -> Result<u64, StoreError> {
        Ok(self.received.lock().unwrap().len() as u64)
    }

    async fn patch(
        &self,
        _endpoint: &ResumableEndpoint,
        _upload_url: &str,
        offset: u64,
        data: Bytes,
    ) -> Result<u64, StoreError> {
        self.patches.fetch_add(1, Ordering::SeqCst);
        let should_fail: bool = self
            .failing_patches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left: usize| {
                left.checked_sub(1)
            })
            .is_ok();
        if should_fail {
            return Err(StoreError::Network {
                message: "connection reset".to_string(),
            });
        }

        let mut received = self.received.lock().unwrap();
        if offset != received.len() as u64 {
            return Err(StoreError::Rejected {
                status: 409,
                message: "offset mismatch".to_string(),
            });
        }
        received.extend_from_slice(&data);
        Ok(received.len() as u64)
    }
}
