//! Integration-style tests for the resolver, downloader and installer

use crate::catalog::{CatalogConfig, CatalogResolver, CurseClient, ProjectIdentifier};
use crate::downloader::{DownloadConfig, HttpDownloader, ProgressCallback, ProgressEvent};
use crate::error::CmpdlError;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Helper struct to capture progress events during testing
#[derive(Debug, Default)]
struct ProgressCapture {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl ProgressCapture {
    fn new() -> Self {
        Self::default()
    }

    fn get_callback(&self) -> ProgressCallback {
        let events = self.events.clone();
        Arc::new(move |event| {
            events.lock().unwrap().push(event);
        })
    }

    fn get_events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count_events_of_type(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| match event {
                ProgressEvent::DownloadStarted { .. } => event_type == "download_started",
                ProgressEvent::DownloadProgress { .. } => event_type == "download_progress",
                ProgressEvent::DownloadComplete { .. } => event_type == "download_complete",
                ProgressEvent::AlreadyDownloaded { .. } => event_type == "already_downloaded",
                ProgressEvent::Error { .. } => event_type == "error",
            })
            .count()
    }
}

fn test_config(server: &MockServer) -> CatalogConfig {
    CatalogConfig::new("test-key").with_endpoints(server.uri(), format!("{}/mirror", server.uri()))
}

fn test_resolver(server: &MockServer) -> CatalogResolver<CurseClient> {
    CatalogResolver::from_config(test_config(server)).unwrap()
}

fn file_json(project_id: u64, file_id: u64, file_name: &str, download_url: Option<String>, date: &str) -> serde_json::Value {
    json!({
        "id": file_id,
        "modId": project_id,
        "fileName": file_name,
        "displayName": file_name.trim_end_matches(".jar"),
        "downloadUrl": download_url,
        "fileDate": date,
        "isServerPack": false,
        "fileStatus": 4
    })
}

fn data(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": value }))
}

async fn mount_file_endpoint(server: &MockServer, project_id: u64, file_id: u64, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/mods/{}/files/{}", project_id, file_id)))
        .respond_with(data(body))
        .mount(server)
        .await;
}

async fn mount_mirror(server: &MockServer, project_id: u64, file_id: u64, file_name: &str, url: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/mirror/{}/{}.json", project_id, file_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "FileName": file_name,
            "DownloadURL": url
        })))
        .mount(server)
        .await;
}

async fn mount_download(server: &MockServer, route: &str, body: Vec<u8>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[cfg(test)]
mod http_downloader_tests {
    use super::*;
    use crate::downloader::FileDownloader;

    #[tokio::test]
    async fn test_download_commits_file_and_reports_progress() {
        let server = MockServer::start().await;
        let body = vec![7u8; 64 * 1024];
        mount_download(&server, "/files/mod.jar", body.clone(), 1).await;

        let temp_dir = tempdir().unwrap();
        let dest = temp_dir.path().join("mods").join("mod.jar");
        let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
        let progress = ProgressCapture::new();

        let size = downloader
            .download(
                &format!("{}/files/mod.jar", server.uri()),
                &dest,
                "(1/1) ",
                Some(progress.get_callback()),
            )
            .await
            .unwrap();

        assert_eq!(size, body.len() as u64);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
        assert!(!temp_dir.path().join("mods").join("mod.jar.downloading").exists());

        let events = progress.get_events();
        assert!(matches!(events.first(), Some(ProgressEvent::DownloadStarted { label, .. }) if label == "(1/1) "));
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::DownloadComplete { final_size, file, .. }) if *final_size == size && file == "mod.jar"
        ));
        for event in &events {
            if let ProgressEvent::DownloadProgress { downloaded, total, .. } = event {
                assert!(downloaded <= total);
                assert_eq!(*total, size);
            }
        }
        assert_eq!(progress.count_events_of_type("error"), 0);
    }

    #[tokio::test]
    async fn test_failed_status_leaves_destination_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/broken.jar"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let dest = temp_dir.path().join("broken.jar");
        let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
        let progress = ProgressCapture::new();

        let result = downloader
            .download(
                &format!("{}/files/broken.jar", server.uri()),
                &dest,
                "",
                Some(progress.get_callback()),
            )
            .await;

        match result {
            Err(CmpdlError::HttpStatus { status, .. }) => assert_eq!(status.as_u16(), 500),
            other => panic!("expected HttpStatus error, got {:?}", other),
        }
        assert!(!dest.exists());
        assert_eq!(progress.count_events_of_type("error"), 1);
        assert_eq!(progress.count_events_of_type("download_complete"), 0);
    }

    #[tokio::test]
    async fn test_stale_temp_file_is_replaced() {
        let server = MockServer::start().await;
        mount_download(&server, "/files/fresh.jar", b"fresh bytes".to_vec(), 1).await;

        let temp_dir = tempdir().unwrap();
        let dest = temp_dir.path().join("fresh.jar");
        let stale = temp_dir.path().join("fresh.jar.downloading");
        tokio::fs::write(&stale, b"half of an older attempt, much longer than the new body")
            .await
            .unwrap();

        let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
        downloader
            .download(&format!("{}/files/fresh.jar", server.uri()), &dest, "", None)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"fresh bytes");
        assert!(!stale.exists());
    }

    /// Serve one response that announces more bytes than it sends, then hang up
    async fn serve_truncated_body(announced: usize, sent: &'static [u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }

            let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", announced);
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(sent).await.unwrap();
            socket.flush().await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/files/truncated.jar", address)
    }

    #[tokio::test]
    async fn test_broken_stream_leaves_temp_file_for_inspection() {
        let url = serve_truncated_body(4096, b"only the first few bytes").await;

        let temp_dir = tempdir().unwrap();
        let dest = temp_dir.path().join("truncated.jar");
        let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
        let progress = ProgressCapture::new();

        let result = downloader
            .download(&url, &dest, "(1/1) ", Some(progress.get_callback()))
            .await;

        assert!(matches!(result, Err(CmpdlError::HttpRequest { .. })), "got {:?}", result);
        assert!(!dest.exists());
        assert!(temp_dir.path().join("truncated.jar.downloading").exists());
        assert_eq!(progress.count_events_of_type("error"), 1);
        assert_eq!(progress.count_events_of_type("download_complete"), 0);
    }
}

#[cfg(test)]
mod resolver_tests {
    use super::*;
    use crate::catalog::CachedResponse;

    #[tokio::test]
    async fn test_file_endpoint_takes_precedence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/7/files/42"))
            .and(header("x-api-key", "test-key"))
            .respond_with(data(file_json(
                7,
                42,
                "primary.jar",
                Some("https://edge.example/primary.jar".to_string()),
                "2021-06-01T00:00:00Z",
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mirror/7/42.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "FileName": "mirror.jar",
                "DownloadURL": "https://mirror.example/mirror.jar"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let resolver = test_resolver(&server);
        let file = resolver.resolve_file(7, 42).await.unwrap();

        assert_eq!(file.file_name, "primary.jar");
        assert_eq!(file.usable_download_url(), Some("https://edge.example/primary.jar"));
    }

    #[tokio::test]
    async fn test_falls_through_to_mirror() {
        let server = MockServer::start().await;
        mount_mirror(&server, 7, 42, "mirror.jar", "https://mirror.example/mirror.jar").await;

        let resolver = test_resolver(&server);
        let file = resolver.resolve_file(7, 42).await.unwrap();

        assert_eq!(file.id, 42);
        assert_eq!(file.project_id, 7);
        assert_eq!(file.file_name, "mirror.jar");
        assert_eq!(file.usable_download_url(), Some("https://mirror.example/mirror.jar"));

        let cache = resolver.api().cache();
        let file_url = format!("{}/v1/mods/7/files/42", server.uri());
        assert_eq!(cache.get(&file_url), Some(CachedResponse::NotFound));
    }

    #[tokio::test]
    async fn test_mirror_request_carries_no_api_key() {
        let server = MockServer::start().await;
        mount_mirror(&server, 7, 42, "mirror.jar", "https://mirror.example/mirror.jar").await;

        test_resolver(&server).resolve_file(7, 42).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        for request in &requests {
            let has_key = request.headers.get("x-api-key").is_some();
            if request.url.path().starts_with("/mirror/") {
                assert!(!has_key, "mirror request sent the API key");
            } else {
                assert!(has_key, "API request {} without key", request.url);
            }
        }
    }

    #[tokio::test]
    async fn test_record_without_url_falls_through() {
        let server = MockServer::start().await;
        mount_file_endpoint(&server, 7, 42, file_json(7, 42, "mod.jar", None, "2021-06-01T00:00:00Z")).await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/7/files"))
            .respond_with(data(json!([
                file_json(7, 41, "older.jar", Some("https://edge.example/older.jar".to_string()), "2021-01-01T00:00:00Z"),
                file_json(7, 42, "mod.jar", Some("https://edge.example/mod.jar".to_string()), "2021-06-01T00:00:00Z"),
            ])))
            .mount(&server)
            .await;

        let file = test_resolver(&server).resolve_file(7, 42).await.unwrap();

        assert_eq!(file.usable_download_url(), Some("https://edge.example/mod.jar"));
    }

    #[tokio::test]
    async fn test_unexpected_status_aborts_resolution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/7/files/42"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mirror/7/42.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "FileName": "mirror.jar",
                "DownloadURL": "https://mirror.example/mirror.jar"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let error = test_resolver(&server).resolve_file(7, 42).await.unwrap_err();

        match &error {
            CmpdlError::HttpStatus { status, .. } => assert_eq!(status.as_u16(), 403),
            other => panic!("expected HttpStatus error, got {:?}", other),
        }
        assert_eq!(error.suggestion(), Some("Check that your CurseForge API key is valid"));
    }

    #[tokio::test]
    async fn test_exhausted_tiers_report_file_not_found() {
        let server = MockServer::start().await;

        let error = test_resolver(&server).resolve_file(7, 42).await.unwrap_err();

        assert!(matches!(error, CmpdlError::FileNotFound { project_id: 7, file_id: 42 }));
        assert_eq!(error.to_string(), "File 42 not found in project 7.");
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_latest_file_skips_server_packs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/7"))
            .respond_with(data(json!({
                "id": 7,
                "name": "Test Pack",
                "slug": "test-pack",
                "latestFiles": [
                    {
                        "id": 1, "modId": 7, "fileName": "server.zip", "displayName": "Server",
                        "fileDate": "2021-09-01T00:00:00Z", "isServerPack": true
                    },
                    {
                        "id": 2, "modId": 7, "fileName": "pack-june.zip", "displayName": "Pack June",
                        "fileDate": "2021-06-01T00:00:00Z", "isServerPack": false
                    },
                    {
                        "id": 3, "modId": 7, "fileName": "pack-march.zip", "displayName": "Pack March",
                        "fileDate": "2021-03-01T00:00:00Z", "isServerPack": false
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_file_endpoint(
            &server,
            7,
            2,
            json!({
                "id": 2, "modId": 7, "fileName": "pack-june.zip", "displayName": "Pack June",
                "downloadUrl": "https://edge.example/pack-june.zip",
                "fileDate": "2021-06-01T00:00:00Z", "isServerPack": false
            }),
        )
        .await;

        let resolved = test_resolver(&server)
            .resolve(&ProjectIdentifier::Id(7), None)
            .await
            .unwrap();

        assert_eq!(resolved.version, "Pack June");
        assert_eq!(resolved.file_name, "pack-june.zip");
        assert_eq!(resolved.url, "https://edge.example/pack-june.zip");
    }

    #[tokio::test]
    async fn test_project_without_client_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/7"))
            .respond_with(data(json!({ "id": 7, "name": "Servers Only", "latestFiles": [] })))
            .mount(&server)
            .await;

        let error = test_resolver(&server)
            .resolve(&ProjectIdentifier::Id(7), None)
            .await
            .unwrap_err();

        assert!(matches!(error, CmpdlError::NoEligibleFiles { project_id: 7 }));
    }

    #[tokio::test]
    async fn test_title_search_pages_until_prefix_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/search"))
            .and(query_param("gameId", "432"))
            .and(query_param("classId", "4471"))
            .and(query_param("searchFilter", "better mc"))
            .and(query_param("index", "0"))
            .respond_with(data(json!([
                { "id": 1, "name": "The Better MC Experience", "slug": "tbmce" },
                { "id": 2, "name": "Vanilla Plus", "slug": "vanilla-plus" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/search"))
            .and(query_param("index", "20"))
            .respond_with(data(json!([
                { "id": 452013, "name": "Better MC [FORGE]", "slug": "better-mc-forge" }
            ])))
            .mount(&server)
            .await;

        let project_id = test_resolver(&server)
            .resolve_project_id(&ProjectIdentifier::parse("better mc"))
            .await
            .unwrap();

        assert_eq!(project_id, 452013);
    }

    #[tokio::test]
    async fn test_url_slug_matches_exactly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/search"))
            .and(query_param("searchFilter", "better-mc-forge"))
            .respond_with(data(json!([
                { "id": 452013, "name": "Better MC [FORGE]", "slug": "better-mc-forge" }
            ])))
            .mount(&server)
            .await;

        let identifier = ProjectIdentifier::parse("https://www.curseforge.com/minecraft/modpacks/better-mc-forge");
        let project_id = test_resolver(&server).resolve_project_id(&identifier).await.unwrap();

        assert_eq!(project_id, 452013);
    }

    #[tokio::test]
    async fn test_search_without_match_is_project_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/search"))
            .respond_with(data(json!([])))
            .mount(&server)
            .await;

        let error = test_resolver(&server)
            .resolve_project_id(&ProjectIdentifier::parse("nothing like this"))
            .await
            .unwrap_err();

        assert!(matches!(error, CmpdlError::ProjectNotFound { ref identifier } if identifier == "nothing like this"));
    }

    #[tokio::test]
    async fn test_search_failure_aborts_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/search"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let error = test_resolver(&server)
            .resolve_project_id(&ProjectIdentifier::parse("better mc"))
            .await
            .unwrap_err();

        match error {
            CmpdlError::HttpStatus { status, .. } => assert_eq!(status.as_u16(), 500),
            other => panic!("expected HttpStatus error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_stops_at_index_bound() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/search"))
            .respond_with(data(json!([
                { "id": 1, "name": "Something Else", "slug": "something-else" }
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let resolver = test_resolver(&server).with_search_limits(1, 2);
        let error = resolver
            .resolve_project_id(&ProjectIdentifier::parse("better mc"))
            .await
            .unwrap_err();

        assert!(matches!(error, CmpdlError::ProjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_repeated_lookups_hit_the_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/mods/7/files/42"))
            .respond_with(data(file_json(
                7,
                42,
                "mod.jar",
                Some("https://edge.example/mod.jar".to_string()),
                "2021-06-01T00:00:00Z",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = test_resolver(&server);
        let first = resolver.resolve_file(7, 42).await.unwrap();
        let second = resolver.resolve_file(7, 42).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.api().cache().len(), 1);
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;
    use crate::downloader::{DownloadResult, DownloadTask, execute, plan};
    use crate::modpack::Manifest;

    fn manifest_with(files: &str) -> Manifest {
        Manifest::from_json(
            &format!(r#"{{ "minecraft": {{ "version": "1.18.2" }}, "files": {} }}"#, files),
            "test",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_plan_keeps_manifest_order_and_sanitises_names() {
        let server = MockServer::start().await;
        mount_file_endpoint(
            &server,
            10,
            100,
            file_json(10, 100, "first.jar", Some("https://edge.example/first.jar".to_string()), "2021-01-01T00:00:00Z"),
        )
        .await;
        mount_mirror(&server, 11, 110, "second:mod.jar", "https://mirror.example/second.jar").await;

        let manifest = manifest_with(
            r#"[{ "projectID": 10, "fileID": 100 }, { "projectID": 11, "fileID": 110 }]"#,
        );
        let tasks = plan(&test_resolver(&server), &manifest).await.unwrap();

        assert_eq!(
            tasks,
            vec![
                DownloadTask {
                    file_name: "first.jar".to_string(),
                    download_url: "https://edge.example/first.jar".to_string(),
                },
                DownloadTask {
                    file_name: "second-mod.jar".to_string(),
                    download_url: "https://mirror.example/second.jar".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_plan_fails_when_any_entry_is_missing() {
        let server = MockServer::start().await;
        mount_file_endpoint(
            &server,
            10,
            100,
            file_json(10, 100, "first.jar", Some("https://edge.example/first.jar".to_string()), "2021-01-01T00:00:00Z"),
        )
        .await;

        let manifest = manifest_with(
            r#"[{ "projectID": 10, "fileID": 100 }, { "projectID": 11, "fileID": 110 }]"#,
        );
        let error = plan(&test_resolver(&server), &manifest).await.unwrap_err();

        assert!(matches!(error, CmpdlError::FileNotFound { project_id: 11, file_id: 110 }));
    }

    #[tokio::test]
    async fn test_existing_files_are_skipped_without_requests() {
        let server = MockServer::start().await;
        mount_download(&server, "/dl/present.jar", b"remote".to_vec(), 0).await;
        mount_download(&server, "/dl/empty.jar", b"refetched".to_vec(), 1).await;
        mount_download(&server, "/dl/missing.jar", b"new".to_vec(), 1).await;

        let temp_dir = tempdir().unwrap();
        tokio::fs::write(temp_dir.path().join("present.jar"), b"local copy").await.unwrap();
        tokio::fs::write(temp_dir.path().join("empty.jar"), b"").await.unwrap();

        let task = |name: &str| DownloadTask {
            file_name: name.to_string(),
            download_url: format!("{}/dl/{}", server.uri(), name),
        };
        let tasks = vec![task("present.jar"), task("empty.jar"), task("missing.jar")];

        let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
        let progress = ProgressCapture::new();
        let results = execute(&downloader, &tasks, temp_dir.path(), Some(progress.get_callback()))
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                DownloadResult::AlreadyExists { size: 10 },
                DownloadResult::Downloaded { size: 9 },
                DownloadResult::Downloaded { size: 3 },
            ]
        );
        assert_eq!(tokio::fs::read(temp_dir.path().join("present.jar")).await.unwrap(), b"local copy");
        assert_eq!(tokio::fs::read(temp_dir.path().join("empty.jar")).await.unwrap(), b"refetched");

        let skipped: Vec<_> = progress
            .get_events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::AlreadyDownloaded { label, file, .. } => Some((label, file)),
                _ => None,
            })
            .collect();
        assert_eq!(skipped, vec![("(1/3) ".to_string(), "present.jar".to_string())]);
        assert_eq!(progress.count_events_of_type("download_complete"), 2);
    }

    #[tokio::test]
    async fn test_execute_stops_at_first_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/broken.jar"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_download(&server, "/dl/after.jar", b"never".to_vec(), 0).await;

        let temp_dir = tempdir().unwrap();
        let tasks = vec![
            DownloadTask {
                file_name: "broken.jar".to_string(),
                download_url: format!("{}/dl/broken.jar", server.uri()),
            },
            DownloadTask {
                file_name: "after.jar".to_string(),
                download_url: format!("{}/dl/after.jar", server.uri()),
            },
        ];

        let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
        let result = execute(&downloader, &tasks, temp_dir.path(), None).await;

        assert!(matches!(result, Err(CmpdlError::HttpStatus { .. })));
        assert!(!temp_dir.path().join("after.jar").exists());
    }
}

#[cfg(test)]
mod install_tests {
    use super::*;
    use crate::install::ModpackInstaller;
    use crate::modpack::extract_archive;
    use std::io::Write;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn pack_archive() -> Vec<u8> {
        let manifest = json!({
            "minecraft": {
                "version": "1.18.2",
                "modLoaders": [{ "id": "forge-40.1.0", "primary": true }]
            },
            "manifestType": "minecraftModpack",
            "name": "Test Pack",
            "files": [
                { "projectID": 1, "fileID": 10, "required": true },
                { "projectID": 1, "fileID": 11, "required": true }
            ],
            "overrides": "overrides"
        })
        .to_string();

        build_zip(&[
            ("manifest.json", manifest.as_bytes()),
            ("overrides/config/test.cfg", b"enabled=true"),
            ("overrides/options.txt", b"fov:90"),
            ("overrides/mods/bundled.jar", b"bundled"),
        ])
    }

    async fn mount_pack(server: &MockServer) {
        mount_file_endpoint(
            server,
            7,
            42,
            json!({
                "id": 42, "modId": 7, "fileName": "test-pack.zip", "displayName": "Test Pack 1.0",
                "downloadUrl": format!("{}/dl/test-pack.zip", server.uri()),
                "fileDate": "2021-06-01T00:00:00Z", "isServerPack": false
            }),
        )
        .await;
        mount_download(server, "/dl/test-pack.zip", pack_archive(), 1).await;

        mount_file_endpoint(
            server,
            1,
            10,
            file_json(1, 10, "mod-a.jar", Some(format!("{}/dl/mod-a.jar", server.uri())), "2021-01-01T00:00:00Z"),
        )
        .await;
        mount_mirror(server, 1, 11, "mod-b.jar", &format!("{}/dl/mod-b.jar", server.uri())).await;
        mount_download(server, "/dl/mod-a.jar", b"mod a".to_vec(), 1).await;
        mount_download(server, "/dl/mod-b.jar", b"mod b".to_vec(), 1).await;
    }

    #[tokio::test]
    async fn test_extract_archive_writes_nested_files() {
        let temp_dir = tempdir().unwrap();
        let archive = temp_dir.path().join("pack.zip");
        tokio::fs::write(&archive, pack_archive()).await.unwrap();

        let written = extract_archive(&archive, &temp_dir.path().join("out")).await.unwrap();

        assert_eq!(written, 4);
        let cfg = temp_dir.path().join("out/overrides/config/test.cfg");
        assert_eq!(tokio::fs::read_to_string(cfg).await.unwrap(), "enabled=true");
    }

    #[tokio::test]
    async fn test_extract_rejects_non_zip() {
        let temp_dir = tempdir().unwrap();
        let archive = temp_dir.path().join("pack.zip");
        tokio::fs::write(&archive, b"definitely not a zip").await.unwrap();

        let result = extract_archive(&archive, &temp_dir.path().join("out")).await;

        assert!(matches!(result, Err(CmpdlError::Archive { .. })));
    }

    #[tokio::test]
    async fn test_full_install_and_rerun() {
        let server = MockServer::start().await;
        mount_pack(&server).await;

        let output = tempdir().unwrap();
        let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
        let progress = ProgressCapture::new();
        let installer = ModpackInstaller::new(test_resolver(&server), downloader, output.path())
            .with_progress(progress.get_callback());

        let report = installer.install(&ProjectIdentifier::Id(7), Some(42)).await.unwrap();

        let pack_dir = output.path().join("Test Pack 1.0");
        let minecraft = pack_dir.join(".minecraft");
        assert_eq!(report.minecraft_dir, minecraft);
        assert_eq!((report.downloaded, report.skipped), (2, 0));
        assert_eq!(report.manifest.minecraft.version, "1.18.2");
        assert_eq!(report.manifest.mod_loader_ids().collect::<Vec<_>>(), vec!["forge-40.1.0"]);

        assert!(pack_dir.join("test-pack.zip").exists());
        assert_eq!(read(&minecraft.join("mods/mod-a.jar")).await, "mod a");
        assert_eq!(read(&minecraft.join("mods/mod-b.jar")).await, "mod b");
        assert_eq!(read(&minecraft.join("mods/bundled.jar")).await, "bundled");
        assert_eq!(read(&minecraft.join("config/test.cfg")).await, "enabled=true");
        assert_eq!(read(&minecraft.join("options.txt")).await, "fov:90");
        assert!(!pack_dir.join("extracted/overrides").exists());
        assert!(pack_dir.join("extracted/manifest.json").exists());

        let started: Vec<_> = progress
            .get_events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::DownloadStarted { label, file, .. } => Some((label, file)),
                _ => None,
            })
            .collect();
        assert_eq!(
            started,
            vec![
                ("".to_string(), "test-pack.zip".to_string()),
                ("(1/2) ".to_string(), "mod-a.jar".to_string()),
                ("(2/2) ".to_string(), "mod-b.jar".to_string()),
            ]
        );

        // Everything is on disk now, so nothing is fetched again.
        let rerun = installer.install(&ProjectIdentifier::Id(7), Some(42)).await.unwrap();
        assert_eq!((rerun.downloaded, rerun.skipped), (0, 2));
        assert_eq!(progress.count_events_of_type("already_downloaded"), 2);
    }

    #[tokio::test]
    async fn test_overrides_outside_archive_are_rejected() {
        let outside = tempdir().unwrap();
        let user_data = outside.path().join("user-data");
        tokio::fs::create_dir_all(&user_data).await.unwrap();
        tokio::fs::write(user_data.join("notes.txt"), "keep me").await.unwrap();

        for overrides in [user_data.to_string_lossy().into_owned(), "../../user-data".to_string()] {
            let server = MockServer::start().await;
            let manifest = json!({
                "minecraft": { "version": "1.18.2", "modLoaders": [] },
                "manifestType": "minecraftModpack",
                "name": "Hostile Pack",
                "files": [{ "projectID": 1, "fileID": 10, "required": true }],
                "overrides": overrides
            })
            .to_string();
            mount_file_endpoint(
                &server,
                7,
                42,
                json!({
                    "id": 42, "modId": 7, "fileName": "hostile.zip", "displayName": "Hostile 1.0",
                    "downloadUrl": format!("{}/dl/hostile.zip", server.uri()),
                    "fileDate": "2021-06-01T00:00:00Z", "isServerPack": false
                }),
            )
            .await;
            mount_download(&server, "/dl/hostile.zip", build_zip(&[("manifest.json", manifest.as_bytes())]), 1).await;
            mount_download(&server, "/dl/mod-a.jar", b"mod a".to_vec(), 0).await;

            let output = tempdir().unwrap();
            let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
            let installer = ModpackInstaller::new(test_resolver(&server), downloader, output.path());

            let result = installer.install(&ProjectIdentifier::Id(7), Some(42)).await;

            assert!(
                matches!(result, Err(CmpdlError::InvalidManifest { .. })),
                "overrides {:?} gave {:?}",
                overrides,
                result
            );
            assert_eq!(read(&user_data.join("notes.txt")).await, "keep me");
            assert!(!output.path().join("Hostile 1.0/.minecraft").exists());
        }
    }

    #[tokio::test]
    async fn test_archive_without_manifest_is_rejected() {
        let server = MockServer::start().await;
        mount_file_endpoint(
            &server,
            7,
            42,
            json!({
                "id": 42, "modId": 7, "fileName": "broken.zip", "displayName": "Broken",
                "downloadUrl": format!("{}/dl/broken.zip", server.uri()),
                "fileDate": "2021-06-01T00:00:00Z"
            }),
        )
        .await;
        mount_download(&server, "/dl/broken.zip", build_zip(&[("readme.txt", b"no manifest here")]), 1).await;

        let output = tempdir().unwrap();
        let downloader = HttpDownloader::new(DownloadConfig::default()).unwrap();
        let installer = ModpackInstaller::new(test_resolver(&server), downloader, output.path());

        let error = installer.install(&ProjectIdentifier::Id(7), Some(42)).await.unwrap_err();

        match error {
            CmpdlError::MissingManifest { path } => assert_eq!(path, output.path().join("Broken/extracted")),
            other => panic!("expected MissingManifest, got {:?}", other),
        }
    }

    async fn read(path: &Path) -> String {
        tokio::fs::read_to_string(path).await.unwrap()
    }
}
