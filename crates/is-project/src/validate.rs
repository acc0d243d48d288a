//! Protocol file validation logic.
//!
//! Only rejects what cannot be run at all. Values the generator normalizes
//! (non-positive stim time, cycles below one, increment sign) pass.

use crate::schema::{HostDef, LATEST_VERSION, ProtocolDef, ProtocolFile};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_protocol_file(file: &ProtocolFile) -> Result<(), ValidationError> {
    if file.version == 0 || file.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: file.version,
        });
    }

    if file.name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: format!("{:?}", file.name),
            reason: "must not be empty".to_string(),
        });
    }

    validate_protocol(&file.protocol)?;
    validate_host(&file.host)?;
    Ok(())
}

fn validate_protocol(protocol: &ProtocolDef) -> Result<(), ValidationError> {
    for (field, value) in [
        ("protocol.stim_time_ms", protocol.stim_time_ms),
        ("protocol.range_start_pa", protocol.range_start_pa),
        ("protocol.range_end_pa", protocol.range_end_pa),
        ("protocol.increment_pa", protocol.increment_pa),
        (
            "protocol.inter_cycle_interval_s",
            protocol.inter_cycle_interval_s,
        ),
        ("protocol.downtime_s", protocol.downtime_s),
    ] {
        require_finite(field, value)?;
    }
    Ok(())
}

fn validate_host(host: &HostDef) -> Result<(), ValidationError> {
    require_finite("host.period_ms", host.period_ms)?;
    if host.period_ms <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "host.period_ms".to_string(),
            value: host.period_ms.to_string(),
            reason: "must be positive".to_string(),
        });
    }

    for (i, pause) in host.pauses.iter().enumerate() {
        require_finite("host.pauses.start_s", pause.start_s)?;
        require_finite("host.pauses.end_s", pause.end_s)?;
        if pause.start_s < 0.0 || pause.end_s <= pause.start_s {
            return Err(ValidationError::InvalidValue {
                field: format!("host.pauses[{i}]"),
                value: format!("{}..{}", pause.start_s, pause.end_s),
                reason: "window must start at or after 0 and end after it starts".to_string(),
            });
        }
    }
    Ok(())
}

fn require_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be finite".to_string(),
        })
    }
}
