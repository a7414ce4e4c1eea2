//! Extractor tests with a scripted tool runner

use super::*;
use crate::files::is_dir_empty;
use crate::progress::{ProgressCallback, ProgressEvent, ProgressSink};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

type Script = Box<dyn Fn(&ExtractionToolCandidate) -> Result<ToolOutput> + Send + Sync>;

/// Records every invocation and answers from a script
struct FakeRunner {
    calls: Mutex<Vec<PathBuf>>,
    script: Script,
}

impl FakeRunner {
    fn new(script: impl Fn(&ExtractionToolCandidate) -> Result<ToolOutput> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            script: Box::new(script),
        })
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(
        &self,
        tool: &ExtractionToolCandidate,
        _args: &[OsString],
        _cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(tool.executable.clone());
        (self.script)(tool)
    }
}

fn spawn_error(tool: &ExtractionToolCandidate) -> ExtractionError {
    ExtractionError::ToolSpawn {
        tool: tool.display_name(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
    }
}

fn install_tool(dir: &Path, name: &str, kind: ToolKind) -> ExtractionToolCandidate {
    std::fs::create_dir_all(dir).unwrap();
    let exe = dir.join(name);
    std::fs::write(&exe, b"").unwrap();
    ExtractionToolCandidate::new(exe, kind)
}

#[tokio::test]
async fn no_usable_tool_names_attempts_and_empties_out_dir() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    std::fs::write(out_dir.join("stale.bin"), b"junk").unwrap();

    let missing = ExtractionToolCandidate::new(dir.path().join("tools").join("UnRAR.exe"), ToolKind::PrimaryArchiver);
    let raw = ExtractionToolCandidate::new(dir.path().join("no-such-unrar"), ToolKind::PrimaryArchiver);
    let runner = FakeRunner::new(|tool| Err(spawn_error(tool)));
    let extractor = ArchiveExtractor::with_candidates(runner.clone(), vec![missing], vec![raw.clone()]);

    let err = extractor
        .extract(&dir.path().join("DT.part1.rar"), &out_dir, &ProgressSink::null(), &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        ExtractionError::AllToolsFailed { attempted, .. } => {
            assert_eq!(attempted, &vec![raw.display_name()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("no-such-unrar"));
    // Missing structured candidates are never run
    assert_eq!(runner.calls(), vec![raw.executable.clone()]);
    assert!(out_dir.is_dir());
    assert!(is_dir_empty(&out_dir).await.unwrap());
}

#[tokio::test]
async fn payload_under_wrapper_dt_is_found() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let seven = install_tool(&dir.path().join("tools"), "7z.exe", ToolKind::SecondaryArchiver);

    let out = out_dir.clone();
    let runner = FakeRunner::new(move |_| {
        let payload = out.join("wrapper").join("DT");
        std::fs::create_dir_all(&payload).unwrap();
        std::fs::write(payload.join("opening.usm"), b"movie").unwrap();
        Ok(ToolOutput::default())
    });

    let events = Arc::new(Mutex::new(Vec::<ProgressEvent>::new()));
    let captured = events.clone();
    let cb: ProgressCallback = Arc::new(move |e| captured.lock().unwrap().push(e));
    let sink = ProgressSink::new(Some(cb), 10).phase(1, 50, 60);

    let extractor = ArchiveExtractor::with_candidates(runner, vec![seven], vec![]);
    let payload = extractor
        .extract(&dir.path().join("DT.part1.rar"), &out_dir, &sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(payload, out_dir.join("wrapper").join("DT"));
    let events = events.lock().unwrap();
    assert_eq!(events.first().unwrap().percentage, 50);
    assert_eq!(events.last().unwrap().percentage, 60);
    assert_eq!(events.last().unwrap().step, 2);
}

#[tokio::test]
async fn falls_through_to_next_candidate() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let tools = dir.path().join("tools");
    let unrar = install_tool(&tools, "UnRAR.exe", ToolKind::PrimaryArchiver);
    let seven = install_tool(&tools, "7z.exe", ToolKind::SecondaryArchiver);

    let out = out_dir.clone();
    let runner = FakeRunner::new(move |tool| match tool.kind {
        ToolKind::PrimaryArchiver => {
            // Partial output from the failed run must not survive
            std::fs::write(out.join("partial.tmp"), b"x").unwrap();
            Err(ExtractionError::ToolFailed {
                tool: tool.display_name(),
                code: Some(3),
                stderr: "CRC failed".into(),
            })
        }
        _ => {
            std::fs::create_dir_all(out.join("dt")).unwrap();
            Ok(ToolOutput::default())
        }
    });

    let extractor = ArchiveExtractor::with_candidates(runner.clone(), vec![unrar.clone(), seven.clone()], vec![]);
    let payload = extractor
        .extract(&dir.path().join("DT.part1.rar"), &out_dir, &ProgressSink::null(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(payload, out_dir.join("dt"));
    assert_eq!(runner.calls(), vec![unrar.executable, seven.executable]);
    assert!(!out_dir.join("partial.tmp").exists());
}

#[tokio::test]
async fn unrecognised_output_is_payload_not_found() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let tar = install_tool(&dir.path().join("System32"), "tar.exe", ToolKind::GenericArchiver);

    let out = out_dir.clone();
    let runner = FakeRunner::new(move |_| {
        std::fs::write(out.join("readme.txt"), b"hello").unwrap();
        Ok(ToolOutput::default())
    });

    let extractor = ArchiveExtractor::with_candidates(runner, vec![tar], vec![]);
    let err = extractor
        .extract(&dir.path().join("DT.part1.rar"), &out_dir, &ProgressSink::null(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::PayloadNotFound { .. }));
    assert!(is_dir_empty(&out_dir).await.unwrap());
}

#[tokio::test]
async fn cancelled_extraction_runs_nothing() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let seven = install_tool(&dir.path().join("tools"), "7z.exe", ToolKind::SecondaryArchiver);
    let runner = FakeRunner::new(|_| Ok(ToolOutput::default()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let extractor = ArchiveExtractor::with_candidates(runner.clone(), vec![seven], raw_for_test());
    let err = extractor
        .extract(&dir.path().join("DT.part1.rar"), &out_dir, &ProgressSink::null(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Cancelled));
    assert!(runner.calls().is_empty());
}

fn raw_for_test() -> Vec<ExtractionToolCandidate> {
    vec![ExtractionToolCandidate::new("unrar", ToolKind::PrimaryArchiver)]
}
