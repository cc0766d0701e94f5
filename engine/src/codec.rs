use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rpc::Bytes;
use crate::{Result, SigningMaterial};

/// A logical chain call: `module.method(params)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub module: String,
    pub method: String,
    pub params: Vec<Value>,
}

impl Call {
    pub fn new(module: impl Into<String>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Call {
            module: module.into(),
            method: method.into(),
            params,
        }
    }
}

/// Builds and signs extrinsics.
///
/// Signing material and wire encoding both live behind this seam; the engine
/// hands the opaque handle through and never looks inside.
pub trait ExtrinsicCodec: Send + Sync {
    /// Produce the signed extrinsic bytes for `call`, signed by `material`
    /// at `nonce`.
    fn build_signed(&self, call: &Call, material: &SigningMaterial, nonce: u64) -> Result<Bytes>;
}
