use crate::error::CliError;
use libphoton::Dictionary;
use photon_client::DrainOutcome;

/// One `key=value` line per property, in key order.
pub fn properties_as_lines(values: &Dictionary) -> String {
    values.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("\n")
}

pub fn format_properties(values: &Dictionary, json: bool) -> Result<String, CliError> {
    if json {
        Ok(serde_json::to_string_pretty(values)?)
    } else {
        Ok(properties_as_lines(values))
    }
}

pub fn format_outcome(outcome: &DrainOutcome, json: bool) -> Result<String, CliError> {
    if json {
        Ok(serde_json::to_string_pretty(outcome)?)
    } else {
        Ok(outcome.to_string())
    }
}
