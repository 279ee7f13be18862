//! Load first-run requests from JSON

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::PlanRequest;
use crate::error::LoadError;

/// Load a request from a JSON file
pub fn load_request<P: AsRef<Path>>(path: P) -> Result<PlanRequest, LoadError> {
    let file = File::open(path)?;
    load_request_from_reader(BufReader::new(file))
}

/// Load a request from any reader (e.g., stdin, string buffer, network stream)
pub fn load_request_from_reader<R: Read>(reader: R) -> Result<PlanRequest, LoadError> {
    let request = serde_json::from_reader(reader)?;
    Ok(request)
}
