//! Writing the patch into the game tree and taking it out again

pub mod engine;
pub mod error;
pub mod managed;


pub use engine::{
    DeploymentEngine, DtPayload, INSTALL_STEPS, InstallReport, PayloadSources, StepOutcome, StepReport,
    UNINSTALL_STEPS, UninstallReport,
};
pub use error::{DeployError, Result};
pub use managed::{InstalledModState, ManagedFile};
