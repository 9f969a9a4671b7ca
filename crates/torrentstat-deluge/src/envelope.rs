#![allow(clippy::redundant_pub_crate)]

//! JSON-RPC envelopes spoken by the Deluge Web UI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error code the Web UI reports when the session cookie is missing or stale.
pub(crate) const CODE_NOT_AUTHENTICATED: i64 = 1;

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub(crate) method: &'a str,
    pub(crate) params: &'a [Value],
    pub(crate) id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    pub(crate) result: Value,
    #[serde(default)]
    pub(crate) error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcFault {
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) code: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_positional_params() -> Result<(), serde_json::Error> {
        let params = [json!({}), json!(["name", "ratio"])];
        let request = RpcRequest {
            method: "core.get_torrents_status",
            params: &params,
            id: 7,
        };
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({
                "method": "core.get_torrents_status",
                "params": [{}, ["name", "ratio"]],
                "id": 7
            })
        );
        Ok(())
    }

    #[test]
    fn response_tolerates_missing_members() -> Result<(), serde_json::Error> {
        let ok: RpcResponse =
            serde_json::from_value(json!({"result": true, "error": null, "id": 1}))?;
        assert_eq!(ok.result, json!(true));
        assert!(ok.error.is_none());

        let fault: RpcResponse = serde_json::from_value(json!({
            "result": null,
            "error": {"message": "Not authenticated", "code": 1},
            "id": 2
        }))?;
        let error = fault
            .error
            .ok_or_else(|| <serde_json::Error as serde::de::Error>::custom("missing fault"))?;
        assert_eq!(error.code, Some(CODE_NOT_AUTHENTICATED));
        assert_eq!(error.message, "Not authenticated");
        Ok(())
    }
}
