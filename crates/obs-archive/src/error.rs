use thiserror::Error;

/// Container-level failures that stop decoding a bundle.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to read archive: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to read archive member {name}: {source}")]
    Member {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
