//! Tests of the HTTP clients against a local mock server.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;

use bytes::Bytes;
use cruxclip_upload::{
    AccessToken, BackendError, ChunkProgressUpdate, InitializeRequest, MarkUploadedRequest,
    MemoryFileSource, NoOpProgress, ObjectStore, ResumableEndpoint, ResumableTransport,
    StaticCredentials, StoreError, StrategyKind, UploadBackend, UploadConfiguration,
    UploadMetadata, UploadOrchestrator, UploadResult, WriteOptions,
};
use cruxclip_upload_http::{
    encode_metadata, HttpBackendClient, HttpObjectStore, HttpSettings, TusTransport,
};
use httpmock::Method::{HEAD, PATCH, POST};
use httpmock::MockServer;
use serde_json::json;

const TOKEN: &str = "user-token";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn token() -> AccessToken {
    AccessToken::new(TOKEN)
}

fn initialize_request() -> InitializeRequest {
    InitializeRequest {
        title: "moonboard send".to_string(),
        location: "Home wall".to_string(),
        total_chunks: 10,
        file_size_bytes: 60_000_000,
        mime_type: "video/mp4".to_string(),
    }
}

fn write_options() -> WriteOptions {
    WriteOptions {
        content_type: "video/mp4".to_string(),
        cache_control: "3600".to_string(),
        upsert: true,
    }
}

fn backend(server: &MockServer) -> HttpBackendClient {
    HttpBackendClient::new(&server.url("/functions/v1/uploads"), &HttpSettings::default())
        .unwrap()
}

#[tokio::test]
async fn backend_initialize_round_trip() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/functions/v1/uploads/initialize")
            .header("authorization", format!("Bearer {TOKEN}"))
            .json_body(json!({
                "title": "moonboard send",
                "location": "Home wall",
                "totalChunks": 10,
                "fileSizeBytes": 60_000_000,
                "mimeType": "video/mp4"
            }));
        then.status(200).json_body(json!({
            "sessionId": "session-1",
            "objectLocation": "user-1/session-1.mp4",
            "publicUrl": "https://cdn.example.com/user-1/session-1.mp4",
            "endpointUrl": "https://storage.example.com/upload/resumable",
            "endpointHeaders": { "x-upsert": "true" },
            "strategyHint": "resumable",
            "chunkSizeBytes": 6_291_456
        }));
    });

    let response = backend(&server)
        .initialize_upload(&initialize_request(), &token())
        .await
        .unwrap();

    mock.assert();
    assert_eq!(response.session_id, "session-1");
    assert_eq!(response.object_location, "user-1/session-1.mp4");
    assert_eq!(
        response.endpoint_url.as_deref(),
        Some("https://storage.example.com/upload/resumable")
    );
    assert_eq!(
        response.endpoint_headers.get("x-upsert").map(String::as_str),
        Some("true")
    );
    assert_eq!(response.strategy_hint, Some(StrategyKind::Resumable));
    assert_eq!(response.chunk_size_bytes, Some(6_291_456));
}

#[tokio::test]
async fn backend_rejection_keeps_server_message() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/functions/v1/uploads/initialize");
        then.status(413).json_body(json!({ "error": "File too large" }));
    });

    let err = backend(&server)
        .initialize_upload(&initialize_request(), &token())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BackendError::Status {
            status: 413,
            message: Some("File too large".to_string()),
        }
    );
    assert_eq!(err.user_message(), "File too large");
}

#[tokio::test]
async fn backend_malformed_body_is_invalid_response() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/functions/v1/uploads/mark-uploaded");
        then.status(200).body("<html>gateway</html>");
    });

    let err = backend(&server)
        .mark_uploaded(
            &MarkUploadedRequest {
                session_id: "session-1".to_string(),
                file_size_bytes: 42,
            },
            &token(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::InvalidResponse { .. }));
    assert!(err.responded());
}

#[tokio::test]
async fn backend_unreachable_is_no_response() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    // Reserve a port, then free it so nothing is listening there
    let port: u16 = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = HttpBackendClient::new(
        &format!("http://127.0.0.1:{port}/functions/v1/uploads"),
        &HttpSettings::default(),
    )
    .unwrap();

    let err = client
        .initialize_upload(&initialize_request(), &token())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::NoResponse { .. }));
    assert!(!err.responded());
}

#[tokio::test]
async fn backend_finalize_and_progress() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let finalize = server.mock(|when, then| {
        when.method(POST)
            .path("/functions/v1/uploads/mark-uploaded")
            .header("authorization", format!("Bearer {TOKEN}"))
            .json_body(json!({ "sessionId": "session-1", "fileSizeBytes": 42 }));
        then.status(200).json_body(json!({ "status": "processing" }));
    });
    let progress = server.mock(|when, then| {
        when.method(POST)
            .path("/functions/v1/uploads/update-chunk-progress")
            .json_body(json!({ "sessionId": "session-1", "uploadedChunks": 3 }));
        then.status(204);
    });

    let client = backend(&server);
    let confirmed = client
        .mark_uploaded(
            &MarkUploadedRequest {
                session_id: "session-1".to_string(),
                file_size_bytes: 42,
            },
            &token(),
        )
        .await
        .unwrap();
    client
        .update_chunk_progress(
            &ChunkProgressUpdate {
                session_id: "session-1".to_string(),
                uploaded_chunks: 3,
            },
            &token(),
        )
        .await
        .unwrap();

    finalize.assert();
    progress.assert();
    assert_eq!(confirmed.status, "processing");
}

#[tokio::test]
async fn object_store_upserts_with_headers() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/storage/v1/object/climbing-videos/user-1/session-1.mp4.part00001")
            .header("authorization", format!("Bearer {TOKEN}"))
            .header("apikey", "anon-key")
            .header("content-type", "video/mp4")
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "true")
            .body("chunk-bytes");
        then.status(200)
            .json_body(json!({ "Key": "climbing-videos/user-1/session-1.mp4.part00001" }));
    });

    let store = HttpObjectStore::new(
        &server.url("/storage/v1"),
        "climbing-videos",
        &HttpSettings::default(),
    )
    .unwrap()
    .with_api_key("anon-key");

    store
        .write(
            "user-1/session-1.mp4.part00001",
            Bytes::from_static(b"chunk-bytes"),
            &write_options(),
            &token(),
        )
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn object_store_errors_carry_retryability() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/storage/v1/object/climbing-videos/denied.mp4");
        then.status(403)
            .json_body(json!({ "message": "new row violates row-level security policy" }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/storage/v1/object/climbing-videos/flaky.mp4");
        then.status(503).body("Service Unavailable");
    });

    let store = HttpObjectStore::new(
        &server.url("/storage/v1"),
        "climbing-videos",
        &HttpSettings::default(),
    )
    .unwrap();

    let denied = store
        .write("denied.mp4", Bytes::from_static(b"x"), &write_options(), &token())
        .await
        .unwrap_err();
    assert_eq!(
        denied,
        StoreError::Rejected {
            status: 403,
            message: "new row violates row-level security policy".to_string(),
        }
    );
    assert!(!denied.is_retryable());

    let flaky = store
        .write("flaky.mp4", Bytes::from_static(b"x"), &write_options(), &token())
        .await
        .unwrap_err();
    assert!(flaky.is_retryable());
}

fn tus_endpoint(server: &MockServer) -> ResumableEndpoint {
    let mut headers: HashMap<String, String> = HashMap::new();
    headers.insert("authorization".to_string(), format!("Bearer {TOKEN}"));
    headers.insert("x-upsert".to_string(), "true".to_string());
    ResumableEndpoint {
        url: server.url("/upload/resumable"),
        headers,
    }
}

#[tokio::test]
async fn tus_create_returns_absolute_upload_url() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let metadata: Vec<(String, String)> = vec![
        ("objectName".to_string(), "user-1/session-1.mp4".to_string()),
        ("contentType".to_string(), "video/mp4".to_string()),
    ];
    let mut expected: Vec<(String, String)> =
        vec![("bucketName".to_string(), "climbing-videos".to_string())];
    expected.extend(metadata.iter().cloned());

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/upload/resumable")
            .header("tus-resumable", "1.0.0")
            .header("upload-length", "11")
            .header("upload-metadata", encode_metadata(&expected))
            .header("authorization", format!("Bearer {TOKEN}"))
            .header("x-upsert", "true");
        then.status(201)
            .header("Location", "/upload/resumable/abc123")
            .header("Tus-Resumable", "1.0.0");
    });

    let transport = TusTransport::new(&HttpSettings::default())
        .unwrap()
        .with_bucket("climbing-videos");
    let upload_url: String = transport
        .create(&tus_endpoint(&server), 11, &metadata)
        .await
        .unwrap();

    mock.assert();
    assert_eq!(upload_url, server.url("/upload/resumable/abc123"));
}

#[tokio::test]
async fn tus_create_without_location_is_protocol_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/upload/resumable");
        then.status(201);
    });

    let transport = TusTransport::new(&HttpSettings::default()).unwrap();
    let err = transport
        .create(&tus_endpoint(&server), 11, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Protocol { .. }));
}

#[tokio::test]
async fn tus_patch_and_head_report_offsets() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/upload/resumable/abc123")
            .header("tus-resumable", "1.0.0")
            .header("upload-offset", "6")
            .header("content-type", "application/offset+octet-stream")
            .body("world");
        then.status(204)
            .header("Upload-Offset", "11")
            .header("Tus-Resumable", "1.0.0");
    });
    let head = server.mock(|when, then| {
        when.method(HEAD)
            .path("/upload/resumable/abc123")
            .header("tus-resumable", "1.0.0");
        then.status(200).header("Upload-Offset", "6");
    });
    let conflict = server.mock(|when, then| {
        when.method(PATCH)
            .path("/upload/resumable/abc123")
            .header("upload-offset", "0");
        then.status(409).body("offset mismatch");
    });

    let transport = TusTransport::new(&HttpSettings::default()).unwrap();
    let endpoint: ResumableEndpoint = tus_endpoint(&server);
    let upload_url: String = server.url("/upload/resumable/abc123");

    assert_eq!(transport.offset(&endpoint, &upload_url).await.unwrap(), 6);
    assert_eq!(
        transport
            .patch(&endpoint, &upload_url, 6, Bytes::from_static(b"world"))
            .await
            .unwrap(),
        11
    );
    let err = transport
        .patch(&endpoint, &upload_url, 0, Bytes::from_static(b"hello "))
        .await
        .unwrap_err();

    head.assert();
    patch.assert();
    conflict.assert();
    assert_eq!(
        err,
        StoreError::Rejected {
            status: 409,
            message: "offset mismatch".to_string(),
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn orchestrator_over_http_uploads_small_file() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let initialize = server.mock(|when, then| {
        when.method(POST).path("/functions/v1/uploads/initialize");
        then.status(200).json_body(json!({
            "sessionId": "session-9",
            "objectLocation": "user-1/session-9.mp4",
            "publicUrl": "https://cdn.example.com/user-1/session-9.mp4"
        }));
    });
    let write = server.mock(|when, then| {
        when.method(POST)
            .path("/storage/v1/object/climbing-videos/user-1/session-9.mp4")
            .body("tiny video");
        then.status(200);
    });
    server.mock(|when, then| {
        when.method(POST).path("/functions/v1/uploads/update-chunk-progress");
        then.status(200);
    });
    let finalize = server.mock(|when, then| {
        when.method(POST)
            .path("/functions/v1/uploads/mark-uploaded")
            .json_body(json!({ "sessionId": "session-9", "fileSizeBytes": 10 }));
        then.status(200).json_body(json!({ "status": "processing" }));
    });

    let settings = HttpSettings::default();
    let http: reqwest::Client = settings.build_client().unwrap();
    let backend =
        HttpBackendClient::with_client(http.clone(), &server.url("/functions/v1/uploads")).unwrap();
    let store =
        HttpObjectStore::with_client(http.clone(), &server.url("/storage/v1"), "climbing-videos")
            .unwrap();
    let orchestrator = UploadOrchestrator::new(
        Arc::new(backend),
        Arc::new(store),
        Arc::new(TusTransport::with_client(http).with_bucket("climbing-videos")),
        UploadConfiguration::default(),
    )
    .unwrap();

    let source = MemoryFileSource::new("tiny.mp4", Bytes::from_static(b"tiny video"));
    let result: UploadResult = orchestrator
        .upload(
            &source,
            &UploadMetadata::from_file_name("tiny.mp4", "Crag"),
            &StaticCredentials::new(token()),
            &NoOpProgress,
        )
        .await
        .into();

    initialize.assert();
    write.assert();
    finalize.assert();
    assert_eq!(
        result,
        UploadResult::Completed {
            object_url: "https://cdn.example.com/user-1/session-9.mp4".to_string(),
            session_id: "session-9".to_string(),
            status: "processing".to_string(),
        }
    );
}
