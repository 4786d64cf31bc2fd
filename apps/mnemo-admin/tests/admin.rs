use std::fs;

use clap::Parser;

use mnemo_admin::{Args, Command, ModeArg};
use mnemo_service::{AddRequest, MnemoService};
use mnemo_testkit::TestStore;

async fn open(store: &TestStore) -> MnemoService {
	MnemoService::connect(store.config(0)).await.expect("Failed to open service.")
}

async fn add(service: &MnemoService, content: &str) -> String {
	let req = AddRequest {
		content: content.to_string(),
		category: None,
		tags: None,
		source: None,
		embedding: None,
	};

	service.add(req).await.expect("Failed to add memory.").id
}

#[test]
fn parses_import_with_default_mode() {
	let args =
		Args::try_parse_from(["mnemo-admin", "-c", "mnemo.toml", "import", "--input", "a.jsonl"])
			.expect("Failed to parse arguments.");

	match args.command {
		Command::Import { input, mode } => {
			assert_eq!(input.to_str(), Some("a.jsonl"));
			assert_eq!(mode, ModeArg::Merge);
		},
		other => panic!("Unexpected command: {other:?}"),
	}
}

#[test]
fn rejects_unknown_import_mode() {
	let result = Args::try_parse_from([
		"mnemo-admin",
		"-c",
		"mnemo.toml",
		"import",
		"--input",
		"a.jsonl",
		"--mode",
		"overwrite",
	]);

	assert!(result.is_err());
}

#[tokio::test]
async fn export_to_file_then_import_elsewhere() {
	let source = TestStore::new().expect("Failed to create test store.");
	let target = TestStore::new().expect("Failed to create test store.");
	let source_service = open(&source).await;
	let target_service = open(&target).await;
	let output = source.sibling("export.jsonl").expect("Failed to build export path.");

	add(&source_service, "first").await;
	add(&source_service, "second").await;

	let command = Command::Export { output: Some(output.clone()) };
	let report =
		mnemo_admin::execute(&source_service, command).await.expect("Failed to export.");

	assert_eq!(report["count"], 2);
	assert_eq!(fs::read_to_string(&output).expect("Failed to read export.").lines().count(), 2);

	let report = mnemo_admin::execute(
		&target_service,
		Command::Import { input: output.clone(), mode: ModeArg::Merge },
	)
	.await
	.expect("Failed to import.");

	assert_eq!(report["imported"], 2);

	let report = mnemo_admin::execute(
		&target_service,
		Command::Import { input: output, mode: ModeArg::Merge },
	)
	.await
	.expect("Failed to re-import.");

	assert_eq!(report["imported"], 0);
	assert_eq!(report["skipped"], 2);

	let report =
		mnemo_admin::execute(&target_service, Command::Stats).await.expect("Failed to read stats.");

	assert_eq!(report["total_memories"], 2);
}

#[tokio::test]
async fn merge_pulls_in_snapshot_records() {
	let store = TestStore::new().expect("Failed to create test store.");
	let snapshot_path = store.sibling("remote.db").expect("Failed to build snapshot path.");
	let local = open(&store).await;
	let remote = MnemoService::connect(mnemo_testkit::config_at(&snapshot_path, 0))
		.await
		.expect("Failed to open snapshot service.");

	add(&local, "local note").await;
	add(&remote, "remote note").await;

	remote.db.pool.close().await;

	let report = mnemo_admin::execute(&local, Command::Merge { snapshot: snapshot_path })
		.await
		.expect("Failed to merge snapshot.");

	assert_eq!(report["imported"], 1);

	let report = mnemo_admin::execute(&local, Command::Stats).await.expect("Failed to read stats.");

	assert_eq!(report["total_memories"], 2);
}

#[tokio::test]
async fn missing_import_file_is_reported() {
	let store = TestStore::new().expect("Failed to create test store.");
	let service = open(&store).await;
	let input = store.sibling("absent.jsonl").expect("Failed to build input path.");
	let err = mnemo_admin::execute(&service, Command::Import { input, mode: ModeArg::Replace })
		.await
		.expect_err("Expected a missing-file error.");

	assert!(err.to_string().contains("does not exist"), "Unexpected error: {err}");
}
