//! End-to-end coverage for `Service` against a mock plugin source: install, checksum-mismatch,
//! category, and update scenarios.

// crates.io
use scanhub_plugins::{
	Error, Service, ServiceConfig,
	model::PluginSource,
	service::{InstallOptions, UninstallOptions, UpdateOptions, VerifyOptions},
};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

const MANIFEST_PATH: &str = "/registry.yaml";
const ARTIFACT_V1_PATH: &str = "/artifacts/ssh-weak-cipher-1.0.0.yaml";
const ARTIFACT_V2_PATH: &str = "/artifacts/ssh-weak-cipher-2.0.0.yaml";

fn artifact_yaml(version: &str) -> String {
	format!(
		"id: ssh-weak-cipher\nname: SSH weak cipher\nversion: {version}\nauthor: scanhub\nseverity: high\ntags: [ssh]\noutput:\n  message: weak cipher negotiated\n"
	)
}

fn sha256_hex(bytes: &[u8]) -> String {
	hex::encode(Sha256::digest(bytes))
}

fn manifest_yaml(base: &Url, version: &str, artifact_path: &str, checksum_hex: &str) -> String {
	format!(
		"version: \"1.0\"\nplugins:\n  - id: ssh-weak-cipher\n    name: SSH weak cipher\n    version: {version}\n    author: scanhub\n    categories: [ssh]\n    url: \"{}\"\n    checksum: \"sha256:{checksum_hex}\"\n    size: 0\n",
		base.join(artifact_path).unwrap(),
	)
}

async fn service_against(server: &MockServer) -> (Service, TempDir) {
	let dir = tempfile::tempdir().unwrap();
	let base = Url::parse(&server.uri()).unwrap();
	let source = PluginSource {
		name: "official".into(),
		url: base.join(MANIFEST_PATH).unwrap(),
		enabled: true,
		priority: 1,
		mirrors: vec![],
	};
	let config = ServiceConfig::builder().cache_root(dir.path().join("cache")).sources(vec![source]).build();
	let service = Service::new(config).await.unwrap();

	(service, dir)
}

#[tokio::test]
async fn install_by_id_then_verify_then_uninstall() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;
	let artifact = artifact_yaml("1.0.0");
	let checksum = sha256_hex(artifact.as_bytes());
	let base = Url::parse(&server.uri()).unwrap();

	Mock::given(method("GET"))
		.and(path(MANIFEST_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(manifest_yaml(&base, "1.0.0", ARTIFACT_V1_PATH, &checksum)))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(ARTIFACT_V1_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(artifact))
		.mount(&server)
		.await;

	let (service, _dir) = service_against(&server).await;
	let token = CancellationToken::new();

	let installed = service.install(&token, "ssh-weak-cipher", InstallOptions::default()).await.unwrap();

	assert_eq!(installed.installed, 1);
	assert_eq!(installed.failed, 0);

	let listed = service.list(&token).await.unwrap();

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].id, "ssh-weak-cipher");

	let detail = service.get_info(&token, "ssh-weak-cipher").await.unwrap();

	assert!(detail.cache_size_bytes > 0);

	let verified = service.verify(&token, VerifyOptions::default()).await.unwrap();

	assert_eq!(verified.success, 1);
	assert_eq!(verified.failed, 0);

	let removed = service.uninstall(&token, "ssh-weak-cipher", UninstallOptions::default()).await.unwrap();

	assert_eq!(removed.removed, 1);
	assert_eq!(removed.remaining, 0);
}

#[tokio::test]
async fn install_rejects_checksum_mismatch() {
	let server = MockServer::start().await;
	let artifact = artifact_yaml("1.0.0");
	let base = Url::parse(&server.uri()).unwrap();
	let wrong_checksum = "0".repeat(64);

	Mock::given(method("GET"))
		.and(path(MANIFEST_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(manifest_yaml(&base, "1.0.0", ARTIFACT_V1_PATH, &wrong_checksum)))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(ARTIFACT_V1_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(artifact))
		.mount(&server)
		.await;

	let (service, _dir) = service_against(&server).await;
	let token = CancellationToken::new();

	let err = service.install(&token, "ssh-weak-cipher", InstallOptions::default()).await.unwrap_err();

	assert!(matches!(err, Error::PartialFailure(_)));
}

#[tokio::test]
async fn update_swaps_in_newer_version() {
	let server = MockServer::start().await;
	let v1 = artifact_yaml("1.0.0");
	let v2 = artifact_yaml("2.0.0");
	let checksum_v1 = sha256_hex(v1.as_bytes());
	let checksum_v2 = sha256_hex(v2.as_bytes());
	let base = Url::parse(&server.uri()).unwrap();

	Mock::given(method("GET"))
		.and(path(MANIFEST_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(manifest_yaml(&base, "1.0.0", ARTIFACT_V1_PATH, &checksum_v1)))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(ARTIFACT_V1_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(v1))
		.mount(&server)
		.await;

	let (service, _dir) = service_against(&server).await;
	let token = CancellationToken::new();

	service.install(&token, "ssh-weak-cipher", InstallOptions::default()).await.unwrap();

	// Replace the mounted manifest with one advertising a newer version, simulating the
	// registry having moved on since install.
	server.reset().await;
	Mock::given(method("GET"))
		.and(path(MANIFEST_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(manifest_yaml(&base, "2.0.0", ARTIFACT_V2_PATH, &checksum_v2)))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(ARTIFACT_V2_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(v2))
		.mount(&server)
		.await;

	let updated = service.update(&token, UpdateOptions::default()).await.unwrap();

	assert_eq!(updated.updated, 1);
	assert_eq!(updated.failed, 0);

	let listed = service.list(&token).await.unwrap();

	assert_eq!(listed[0].version, semver::Version::new(2, 0, 0));
}

#[tokio::test]
async fn install_by_category_with_no_matches_reports_no_plugins_found() {
	let server = MockServer::start().await;
	let artifact = artifact_yaml("1.0.0");
	let checksum = sha256_hex(artifact.as_bytes());
	let base = Url::parse(&server.uri()).unwrap();

	Mock::given(method("GET"))
		.and(path(MANIFEST_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(manifest_yaml(&base, "1.0.0", ARTIFACT_V1_PATH, &checksum)))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(ARTIFACT_V1_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(artifact))
		.mount(&server)
		.await;

	let (service, _dir) = service_against(&server).await;
	let token = CancellationToken::new();

	// "web" is a real category but the one mounted entry is tagged "ssh" only.
	let err = service.install(&token, "web", InstallOptions::default()).await.unwrap_err();

	assert!(matches!(err, Error::NoPluginsFound));
}
