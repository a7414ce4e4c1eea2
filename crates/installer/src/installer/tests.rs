//! End-to-end runs of the install pipeline with a local server and a stand-in archiver

use super::*;
use crate::extract::{ExtractionError, ExtractionToolCandidate, ToolOutput};
use crate::paths::GAME_FOLDER;
use crate::progress::ProgressEvent;
use async_trait::async_trait;
use std::ffi::OsString;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path_regex},
};

/// Pretends to be 7-Zip: writes a wrapped `DT` payload into the `-o` directory
struct UnpackingRunner;

#[async_trait]
impl ToolRunner for UnpackingRunner {
    async fn run(
        &self,
        tool: &ExtractionToolCandidate,
        args: &[OsString],
        _cancel: &CancellationToken,
    ) -> crate::extract::Result<ToolOutput> {
        let out_dir = args
            .iter()
            .filter_map(|a| a.to_str())
            .find_map(|a| a.strip_prefix("-o").filter(|rest| !rest.is_empty() && *rest != "+"))
            .ok_or_else(|| ExtractionError::ToolFailed {
                tool: tool.display_name(),
                code: Some(2),
                stderr: "no output directory".into(),
            })?;
        let payload = Path::new(out_dir).join("release").join("DT");
        std::fs::create_dir_all(&payload).unwrap();
        std::fs::write(payload.join("ending.usm"), b"dubbed").unwrap();
        Ok(ToolOutput::default())
    }
}

struct Env {
    dir: TempDir,
    game: PathBuf,
    config: InstallerConfig,
}

fn write(path: &Path, bytes: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// Steam library with the game, bundled assets, a bundled 7z and a scratch root
fn env(volume_urls: Vec<String>) -> Env {
    let dir = tempdir().unwrap();
    let steam = dir.path().join("Steam");
    let game = steam.join("steamapps").join("common").join(GAME_FOLDER);
    let target = InstallTarget::from_root(&game);
    write(&target.exe_paths[0], b"MZ");
    write(&target.dt_path(), b"original dt");

    let assets = dir.path().join("assets");
    write(&assets.join("000_Spanishmod_P.pak"), b"pak");
    write(&assets.join("copyright.mp4"), b"video");
    let tools = dir.path().join("tools");
    write(&tools.join("7z.exe"), b"");

    let config = InstallerConfig::default()
        .with_steam_roots(vec![steam])
        .with_epic_roots(vec![])
        .with_install_metadata(false)
        .with_asset_roots(vec![assets])
        .with_tool_roots(vec![tools])
        .with_scratch_root(dir.path().join("scratch"))
        .with_progress_interval(Duration::ZERO)
        .with_volume_urls(volume_urls);

    Env { dir, game, config }
}

fn capture() -> (ProgressCallback, Arc<StdMutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(StdMutex::new(Vec::new()));
    let sink = events.clone();
    (Arc::new(move |e| sink.lock().unwrap().push(e)), events)
}

async fn serve_parts(server: &MockServer) -> Vec<String> {
    Mock::given(method("GET"))
        .and(path_regex(r"^/DT\.part[1-4]\.rar$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
        .mount(server)
        .await;
    (1..=4).map(|n| format!("{}/DT.part{n}.rar", server.uri())).collect()
}

#[tokio::test]
async fn full_pipeline_installs_extracted_payload() {
    let server = MockServer::start().await;
    let env = env(serve_parts(&server).await);
    let installer = Installer::new(env.config.clone())
        .unwrap()
        .with_tool_runner(Arc::new(UnpackingRunner));
    let (cb, events) = capture();

    let result = installer
        .install(&env.game, InstallOptions::default(), Some(cb), CancellationToken::new())
        .await;

    assert!(result.success, "{:?}", result.error);
    let target = InstallTarget::from_root(&env.game);
    assert_eq!(result.installed_path, Some(target.mod_file()));
    assert_eq!(std::fs::read(target.dt_path().join("ending.usm")).unwrap(), b"dubbed");
    assert_eq!(std::fs::read(target.movie_dir.join("dt.backup")).unwrap(), b"original dt");

    let events = events.lock().unwrap();
    let seen: Vec<u32> = events.iter().map(|e| e.percentage).collect();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "not monotonic: {seen:?}");
    assert!(seen.contains(&50));
    assert_eq!(*seen.last().unwrap(), 100);
    assert!(events.iter().all(|e| e.total == INSTALL_STEPS + PIPELINE_STEPS));
    assert_eq!(events.last().unwrap().step, 10);

    // Scratch space is gone once the call returns
    let scratch = env.dir.path().join("scratch");
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}

#[tokio::test]
async fn invalid_game_path_fails_before_download() {
    let server = MockServer::start().await;
    let env = env(serve_parts(&server).await);
    let installer = Installer::new(env.config.clone()).unwrap();

    let result = installer
        .install(&env.dir.path().join("elsewhere"), InstallOptions::default(), None, CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("executable"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn offline_install_then_uninstall_round_trip() {
    let env = env(vec![]);
    let installer = Installer::new(env.config.clone()).unwrap();

    let status = installer.startup_status().await;
    assert!(status.found);
    assert_eq!(status.game_path.as_deref(), Some(env.game.as_path()));
    assert!(!status.mod_installed);

    let result = installer
        .install(&env.game, InstallOptions::offline(), None, CancellationToken::new())
        .await;
    assert!(result.success, "{:?}", result.error);
    assert!(installer.check_mod_installed(&env.game).await);

    let result = installer.uninstall(&env.game, None).await;
    assert!(result.success, "{:?}", result.error);
    assert!(!installer.check_mod_installed(&env.game).await);
    let target = InstallTarget::from_root(&env.game);
    assert_eq!(std::fs::read(target.dt_path()).unwrap(), b"original dt");
}

#[tokio::test]
async fn startup_status_counts_replaced_files_once_mods_dir_exists() {
    let env = env(vec![]);
    let installer = Installer::new(env.config.clone()).unwrap();
    let target = InstallTarget::from_root(&env.game);
    write(&target.copyright_video(), b"video");

    // The game ships dt and copyright.mp4; without ~mods nothing is ours
    let status = installer.startup_status().await;
    assert!(!status.mod_installed);
    assert_eq!(status.installed_mods, Some(InstalledModState::default()));

    std::fs::create_dir_all(&target.mods_dir).unwrap();
    let status = installer.startup_status().await;
    assert!(status.mod_installed);
    let mods = status.installed_mods.unwrap();
    assert!(!mods.dubbing);
    assert!(mods.dt_file);
    assert!(mods.copyright_video);
    assert!(!installer.check_mod_installed(&env.game).await);
}

#[tokio::test]
async fn second_operation_while_busy_is_rejected() {
    let env = env(vec![]);
    let installer = Installer::new(env.config.clone()).unwrap();
    let _held = installer.busy.try_lock().unwrap();

    let err = installer.try_uninstall(&env.game, None).await.unwrap_err();
    assert!(matches!(err, InstallerError::Busy));

    let result = installer
        .install(&env.game, InstallOptions::offline(), None, CancellationToken::new())
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("already in progress"));
}

#[tokio::test]
async fn cancelled_install_cleans_scratch() {
    let server = MockServer::start().await;
    let env = env(serve_parts(&server).await);
    let installer = Installer::new(env.config.clone()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = installer
        .try_install(&env.game, InstallOptions::default(), None, cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    let target = InstallTarget::from_root(&env.game);
    assert!(!target.mod_file().exists());
    assert_eq!(std::fs::read_dir(env.dir.path().join("scratch")).unwrap().count(), 0);
}

#[test]
fn rejects_budgets_over_one_hundred() {
    let mut config = InstallerConfig::default();
    config.download_budget = 95;
    let err = Installer::new(config).err().unwrap();
    assert_eq!(err.category(), "configuration");
}

#[test]
fn operation_result_serializes_like_the_ui_expects() {
    let ok = serde_json::to_value(OperationResult::ok("done")).unwrap();
    assert_eq!(ok, serde_json::json!({ "success": true, "message": "done" }));

    let failed = serde_json::to_value(OperationResult::failed(&InstallerError::Busy)).unwrap();
    assert_eq!(failed["success"], false);
    assert!(failed.get("message").is_none());
}
