pub mod installation;

pub use installation::{InstallationStatus, OtpOutcome, ProjectInstallation, QualityCheck};
