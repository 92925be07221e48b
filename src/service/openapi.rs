//! OpenAPI 3 description of the edge routes.
//!
//! Served at `GET /api-docs/openapi.json`. The `maxDepth` parameter carries
//! the running service's default and ceiling.

use serde_json::{json, Value};

use crate::config::EditConfig;

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } }
        }
    })
}

fn message_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/MessageResponse" } }
        }
    })
}

fn edge_body() -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/EdgeRequest" } }
        }
    })
}

/// Build the document for the given budgets.
pub fn openapi_document(config: &EditConfig) -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Edge Forest API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Single-parent, acyclic edges between integer nodes"
        },
        "tags": [{ "name": "edges", "description": "Create and delete edges, fetch subtrees" }],
        "paths": {
            "/api/edges": {
                "post": {
                    "tags": ["edges"],
                    "operationId": "createEdge",
                    "summary": "Add an edge from a parent to a child",
                    "description": "Rejected when the edge exists, the child already has a parent, \
                                    or the edge would close a cycle within the cycle check budget.",
                    "requestBody": edge_body(),
                    "responses": {
                        "200": message_response("Edge created"),
                        "400": error_response(
                            "Invalid ids, second parent, cycle detected or cycle undecidable"
                        ),
                        "409": error_response("Edge already exists")
                    }
                },
                "delete": {
                    "tags": ["edges"],
                    "operationId": "deleteEdge",
                    "summary": "Remove an edge",
                    "requestBody": edge_body(),
                    "responses": {
                        "200": message_response("Edge deleted"),
                        "400": error_response("Invalid ids"),
                        "404": error_response("Edge not found")
                    }
                }
            },
            "/api/edges/{nodeId}": {
                "get": {
                    "tags": ["edges"],
                    "operationId": "getTree",
                    "summary": "Fetch the subtree below a node",
                    "description": "Nodes at the depth limit are returned as leaves.",
                    "parameters": [
                        {
                            "name": "nodeId",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "integer", "format": "int64", "minimum": 1 }
                        },
                        {
                            "name": "maxDepth",
                            "in": "query",
                            "required": false,
                            "description": "Hops to descend below the node",
                            "schema": {
                                "type": "integer",
                                "format": "int32",
                                "minimum": 1,
                                "maximum": config.max_tree_depth.get(),
                                "default": config.default_tree_depth.get()
                            }
                        }
                    ],
                    "responses": {
                        "200": {
                            "description": "Subtree with its node count and depth",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/TreeView" }
                                }
                            }
                        },
                        "400": error_response("Invalid node id or maxDepth"),
                        "404": error_response("Node has no edges")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "EdgeRequest": {
                    "type": "object",
                    "required": ["fromId", "toId"],
                    "properties": {
                        "fromId": { "type": "integer", "format": "int64", "minimum": 1 },
                        "toId": { "type": "integer", "format": "int64", "minimum": 1 }
                    }
                },
                "EdgeNode": {
                    "type": "object",
                    "required": ["id", "children"],
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "children": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/EdgeNode" }
                        }
                    }
                },
                "TreeView": {
                    "type": "object",
                    "required": ["tree", "countNodes", "depth"],
                    "properties": {
                        "tree": { "$ref": "#/components/schemas/EdgeNode" },
                        "countNodes": { "type": "integer" },
                        "depth": { "type": "integer" }
                    }
                },
                "MessageResponse": {
                    "type": "object",
                    "required": ["message"],
                    "properties": { "message": { "type": "string" } }
                },
                "ErrorResponse": {
                    "type": "object",
                    "required": ["error", "code"],
                    "properties": {
                        "error": { "type": "string" },
                        "code": { "type": "string" },
                        "details": { "type": "string" }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DepthBudget;

    #[test]
    fn test_document_lists_edge_routes() {
        let doc = openapi_document(&EditConfig::default());

        assert_eq!(doc["openapi"], "3.0.3");
        assert!(doc["paths"]["/api/edges"]["post"].is_object());
        assert!(doc["paths"]["/api/edges"]["delete"].is_object());
        assert!(doc["paths"]["/api/edges/{nodeId}"]["get"].is_object());
        assert_eq!(doc["paths"]["/api/edges"]["post"]["responses"]["409"]["description"], "Edge already exists");
    }

    #[test]
    fn test_max_depth_reflects_config() {
        let config = EditConfig::default()
            .with_default_tree_depth(DepthBudget::new(7).unwrap())
            .with_max_tree_depth(DepthBudget::new(40).unwrap());
        let doc = openapi_document(&config);

        let schema = &doc["paths"]["/api/edges/{nodeId}"]["get"]["parameters"][1]["schema"];
        assert_eq!(schema["default"], 7);
        assert_eq!(schema["maximum"], 40);
    }
}
