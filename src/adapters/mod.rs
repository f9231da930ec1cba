// Adapters layer: concrete RemoteSource implementations for the daily export.

pub mod share;
pub mod sftp;

pub use share::ShareSource;
pub use sftp::SftpSource;
