use thiserror::Error;

/// Fatal or logged-and-swallowed SSDP failures. Bind failures degrade the
/// subsystem (fall back to a send-only ephemeral socket) rather than
/// aborting the process, per §7's `NetworkBindError` policy.
#[derive(Debug, Error)]
pub enum SsdpError {
    #[error("failed to bind SSDP multicast socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to join multicast group {group}: {source}")]
    JoinMulticast {
        group: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SSDP socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}
