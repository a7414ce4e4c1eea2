//! Extraction tool candidates and their argument templates

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Family an extraction tool belongs to; decides its command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// WinRAR / UnRAR
    PrimaryArchiver,
    /// 7-Zip
    SecondaryArchiver,
    /// bsdtar as shipped with Windows
    GenericArchiver,
}

impl ToolKind {
    /// Arguments extracting the volume set starting at `first_volume` into `out_dir`
    pub fn args(self, first_volume: &Path, out_dir: &Path) -> Vec<OsString> {
        match self {
            ToolKind::PrimaryArchiver => {
                // UnRAR treats a trailing separator as "extract into this directory"
                let mut out = out_dir.as_os_str().to_os_string();
                out.push(std::path::MAIN_SEPARATOR_STR);
                vec!["x".into(), "-o+".into(), "-y".into(), "-inul".into(), first_volume.into(), out]
            }
            ToolKind::SecondaryArchiver => {
                let mut out = OsString::from("-o");
                out.push(out_dir);
                vec!["x".into(), first_volume.into(), out, "-y".into(), "-aoa".into()]
            }
            ToolKind::GenericArchiver => {
                vec!["-xf".into(), first_volume.into(), "-C".into(), out_dir.into()]
            }
        }
    }
}

/// One executable to try, in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionToolCandidate {
    pub executable: PathBuf,
    pub kind: ToolKind,
}

impl ExtractionToolCandidate {
    pub fn new(executable: impl Into<PathBuf>, kind: ToolKind) -> Self {
        Self {
            executable: executable.into(),
            kind,
        }
    }

    pub fn display_name(&self) -> String {
        self.executable.display().to_string()
    }
}

const PROGRAM_FILES: [&str; 2] = [r"C:\Program Files", r"C:\Program Files (x86)"];

/// Candidate list: bundled tools under `tool_roots`, then WinRAR and 7-Zip
/// in both Program Files roots, then the system tar
pub fn structured_candidates(tool_roots: &[PathBuf]) -> Vec<ExtractionToolCandidate> {
    let mut candidates = Vec::new();

    for root in tool_roots {
        candidates.push(ExtractionToolCandidate::new(root.join("UnRAR.exe"), ToolKind::PrimaryArchiver));
        candidates.push(ExtractionToolCandidate::new(root.join("unrar"), ToolKind::PrimaryArchiver));
        candidates.push(ExtractionToolCandidate::new(root.join("7z.exe"), ToolKind::SecondaryArchiver));
        candidates.push(ExtractionToolCandidate::new(root.join("7z"), ToolKind::SecondaryArchiver));
    }

    for program_files in PROGRAM_FILES {
        let winrar = Path::new(program_files).join("WinRAR");
        candidates.push(ExtractionToolCandidate::new(winrar.join("UnRAR.exe"), ToolKind::PrimaryArchiver));
        candidates.push(ExtractionToolCandidate::new(winrar.join("WinRAR.exe"), ToolKind::PrimaryArchiver));
    }
    for program_files in PROGRAM_FILES {
        candidates.push(ExtractionToolCandidate::new(
            Path::new(program_files).join("7-Zip").join("7z.exe"),
            ToolKind::SecondaryArchiver,
        ));
    }

    let system_root = std::env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    candidates.push(ExtractionToolCandidate::new(
        system_root.join("System32").join("tar.exe"),
        ToolKind::GenericArchiver,
    ));

    candidates
}

/// Bare commands resolved through `PATH` once every structured candidate failed
pub fn raw_commands() -> Vec<ExtractionToolCandidate> {
    vec![
        ExtractionToolCandidate::new("unrar", ToolKind::PrimaryArchiver),
        ExtractionToolCandidate::new("7z", ToolKind::SecondaryArchiver),
        ExtractionToolCandidate::new("tar", ToolKind::GenericArchiver),
    ]
}
