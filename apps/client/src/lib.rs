//! Upload client — a three-state form state machine around a pluggable
//! transport, plus the HTTP transport used by the CLI driver.

pub mod state;
pub mod transport;

pub use state::{StagedFile, Status, TrustedHtml, UploadClient};
pub use transport::{HttpTransport, Transport, TransportError};
