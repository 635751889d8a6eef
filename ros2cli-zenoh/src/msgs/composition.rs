//! `composition_interfaces` bindings, spoken by component containers.

use super::{parameter::Parameter, service};
use crate::{
    cdr::{CdrDecode, CdrEncode, CdrReader, CdrWriter, Empty},
    error::Result,
};

/// `ListNodes` response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListNodesResponse {
    /// Fully qualified names of the loaded nodes
    pub full_node_names: Vec<String>,
    /// Container-assigned ids, parallel to `full_node_names`
    pub unique_ids: Vec<u64>,
}

impl CdrDecode for ListNodesResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            full_node_names: r.read_seq()?,
            unique_ids: r.read_seq_with(|r| r.read_u64())?,
        })
    }
}

/// `LoadNode` request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadNodeRequest {
    /// Package providing the component
    pub package_name: String,
    /// Component class, e.g. `demo_nodes_cpp::Talker`
    pub plugin_name: String,
    /// Node name override, empty to keep the default
    pub node_name: String,
    /// Node namespace override, empty to keep the default
    pub node_namespace: String,
    /// Log level, 0 to keep the default
    pub log_level: u8,
    /// Remapping rules (`from:=to`)
    pub remap_rules: Vec<String>,
    /// Parameters for the new node
    pub parameters: Vec<Parameter>,
    /// Container specific arguments (`use_intra_process_comms` ...)
    pub extra_arguments: Vec<Parameter>,
}

impl CdrEncode for LoadNodeRequest {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_string(&self.package_name);
        w.write_string(&self.plugin_name);
        w.write_string(&self.node_name);
        w.write_string(&self.node_namespace);
        w.write_u8(self.log_level);
        w.write_seq(&self.remap_rules);
        w.write_seq(&self.parameters);
        w.write_seq(&self.extra_arguments);
    }
}

/// `LoadNode` response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadNodeResponse {
    /// Whether the node was loaded
    pub success: bool,
    /// Reason when it was not
    pub error_message: String,
    /// Name of the loaded node
    pub full_node_name: String,
    /// Id to use with `UnloadNode`
    pub unique_id: u64,
}

impl CdrDecode for LoadNodeResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            success: r.read_bool()?,
            error_message: r.read_string()?,
            full_node_name: r.read_string()?,
            unique_id: r.read_u64()?,
        })
    }
}

/// `UnloadNode` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnloadNodeRequest {
    /// Id returned by `LoadNode`
    pub unique_id: u64,
}

impl CdrEncode for UnloadNodeRequest {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_u64(self.unique_id);
    }
}

/// `UnloadNode` response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnloadNodeResponse {
    /// Whether the node was unloaded
    pub success: bool,
    /// Reason when it was not
    pub error_message: String,
}

impl CdrDecode for UnloadNodeResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            success: r.read_bool()?,
            error_message: r.read_string()?,
        })
    }
}

service!(
    /// `composition_interfaces/srv/ListNodes`
    ListNodes,
    "composition_interfaces/srv/ListNodes",
    Empty,
    ListNodesResponse
);

service!(
    /// `composition_interfaces/srv/LoadNode`
    LoadNode,
    "composition_interfaces/srv/LoadNode",
    LoadNodeRequest,
    LoadNodeResponse
);

service!(
    /// `composition_interfaces/srv/UnloadNode`
    UnloadNode,
    "composition_interfaces/srv/UnloadNode",
    UnloadNodeRequest,
    UnloadNodeResponse
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{from_cdr, to_cdr};

    #[test]
    fn test_decode_list_nodes() {
        let mut w = CdrWriter::new();
        w.write_seq(&["/talker".to_string(), "/listener".to_string()]);
        w.write_seq_with(&[1u64, 2], |w, id| w.write_u64(*id));

        let response: ListNodesResponse = from_cdr(&w.finish()).unwrap();
        assert_eq!(response.full_node_names, ["/talker", "/listener"]);
        assert_eq!(response.unique_ids, [1, 2]);
    }

    #[test]
    fn test_decode_load_node_response() {
        let mut w = CdrWriter::new();
        w.write_bool(true);
        w.write_string("");
        w.write_string("/talker");
        w.write_u64(7);

        let response: LoadNodeResponse = from_cdr(&w.finish()).unwrap();
        assert!(response.success);
        assert_eq!(response.full_node_name, "/talker");
        assert_eq!(response.unique_id, 7);
    }

    #[test]
    fn test_unload_request_alignment() {
        let bytes = to_cdr(&UnloadNodeRequest { unique_id: 3 });
        assert_eq!(bytes.len(), 4 + 8);
        assert_eq!(&bytes[4..], &3u64.to_le_bytes());
    }
}
