//! Content-based hashing for run IDs.

use is_project::schema::{HostDef, ProtocolDef};
use sha2::{Digest, Sha256};

pub fn compute_run_id(
    protocol: &ProtocolDef,
    host: &HostDef,
    run_type: &crate::types::RunType,
    generator_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let protocol_json = serde_json::to_string(protocol).unwrap_or_default();
    hasher.update(protocol_json.as_bytes());

    let host_json = serde_json::to_string(host).unwrap_or_default();
    hasher.update(host_json.as_bytes());

    let run_type_json = serde_json::to_string(run_type).unwrap_or_default();
    hasher.update(run_type_json.as_bytes());

    hasher.update(generator_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
