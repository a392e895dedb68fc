//! Instrumented test doubles for the VulnCheck API.

mod server;

pub use server::{RecordingServer, RecordingServerBuilder, RequestRecord};
