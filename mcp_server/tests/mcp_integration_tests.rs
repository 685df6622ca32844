//! Integration tests for MCP server request/response cycle.
//!
//! Tests the full MCP protocol flow including initialization,
//! tool listing, tool calls, and resource access.

use kube_api::mock::{MockContextStore, MockKubeApi, MockProvider};
use kube_api_interface::ContextInfo;
use kubestellar_shared_types::{BindingPolicy, BindingPolicySpec};
use mcp_server::{
    JsonRpcRequest, JsonRpcResponse, KubestellarMcpServer, INVALID_PARAMS, METHOD_NOT_FOUND,
};
use policy_builder::StaticCatalog;
use serde_json::{json, Value};

type TestServer = KubestellarMcpServer<MockProvider, MockContextStore>;

// ============================================================================
// Test Helpers
// ============================================================================

fn context_store() -> MockContextStore {
    MockContextStore::new(
        vec![
            ContextInfo::new("kind-kubeflex", "kind-kubeflex", "kind-kubeflex"),
            ContextInfo::new("wds1", "kind-kubeflex", "kind-kubeflex"),
            ContextInfo::new("its1", "kind-kubeflex", "kind-kubeflex"),
        ],
        Some("kind-kubeflex"),
    )
}

/// Server plus handles on the shared mock state.
fn create_test_server() -> (TestServer, MockProvider) {
    let provider =
        MockProvider::new(MockKubeApi::new()).with_contexts(["kind-kubeflex", "wds1", "its1"]);
    let server = KubestellarMcpServer::new(
        provider.clone(),
        context_store(),
        StaticCatalog::default(),
    );
    (server, provider)
}

fn make_request(method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(json!(1)),
        method: method.to_string(),
        params,
    }
}

fn tool_call(name: &str, arguments: Value) -> JsonRpcRequest {
    make_request("tools/call", json!({ "name": name, "arguments": arguments }))
}

fn assert_success(response: &JsonRpcResponse) -> &Value {
    assert!(
        response.error.is_none(),
        "Expected success, got error: {:?}",
        response.error
    );
    response.result.as_ref().expect("Expected result")
}

fn assert_error(response: &JsonRpcResponse, expected_code: i32) {
    let error = response.error.as_ref().expect("Expected error");
    assert_eq!(
        error.code, expected_code,
        "Expected error code {}, got {}: {}",
        expected_code, error.code, error.message
    );
}

/// Decode the JSON text of a tool result, returning it with its `isError` flag.
fn tool_payload(response: &JsonRpcResponse) -> (Value, bool) {
    let result = assert_success(response);
    let text = result["content"][0]["text"]
        .as_str()
        .expect("Expected text content");
    let payload = serde_json::from_str(text).expect("Tool text should be JSON");
    (payload, result["isError"].as_bool().unwrap_or(false))
}

fn scenario_args(name: &str, resource_configs: Value, crd_api_groups: Value) -> Value {
    json!({
        "policy_name": name,
        "cluster_labels": {"region": "us"},
        "workload_labels": {"app": "x"},
        "resource_configs": resource_configs,
        "crd_api_groups": crd_api_groups
    })
}

async fn stored_rules(provider: &MockProvider, name: &str) -> Value {
    let policy = provider.api().policy(name).await.expect("policy stored");
    serde_json::to_value(&policy.spec.downsync).unwrap()
}

// ============================================================================
// Protocol Tests
// ============================================================================

#[tokio::test]
async fn test_initialize() {
    let (server, _) = create_test_server();

    let response = server
        .handle_request(make_request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }),
        ))
        .await;

    let result = assert_success(&response);
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "kubestellar-mcp");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
}

#[tokio::test]
async fn test_ping() {
    let (server, _) = create_test_server();
    let response = server.handle_request(make_request("ping", Value::Null)).await;
    assert_eq!(assert_success(&response), &json!({}));
}

#[tokio::test]
async fn test_request_id_preserved() {
    let (server, _) = create_test_server();
    let mut request = make_request("ping", Value::Null);
    request.id = Some(json!("abc-123"));

    let response = server.handle_request(request).await;
    assert_eq!(response.id, Some(json!("abc-123")));
    assert_eq!(response.jsonrpc, "2.0");
}

#[tokio::test]
async fn test_unknown_method() {
    let (server, _) = create_test_server();
    let response = server
        .handle_request(make_request("prompts/list", Value::Null))
        .await;
    assert_error(&response, METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_tools_list() {
    let (server, _) = create_test_server();
    let response = server
        .handle_request(make_request("tools/list", Value::Null))
        .await;

    let tools = assert_success(&response)["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 27);

    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    for expected in [
        "create_binding_policy",
        "list_binding_policies",
        "delete_binding_policy",
        "get_binding_policy_details",
        "get_binding_policy_status",
        "list_all_clusters",
        "get_cluster_logs",
        "create_labelled_namespace",
        "list_pods",
        "describe_pod",
        "list_wds_contexts",
        "switch_wds_context",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }

    for tool in &tools {
        assert!(tool["inputSchema"].is_object());
        assert!(tool["description"].as_str().map_or(false, |d| !d.is_empty()));
    }
}

#[tokio::test]
async fn test_unknown_tool() {
    let (server, _) = create_test_server();
    let response = server
        .handle_request(tool_call("scale_workload", json!({})))
        .await;
    assert_error(&response, METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_tool_call_missing_name() {
    let (server, _) = create_test_server();
    let response = server
        .handle_request(make_request("tools/call", json!({"arguments": {}})))
        .await;
    assert_error(&response, INVALID_PARAMS);
}

// ============================================================================
// Binding Policy Scenarios
// ============================================================================

#[tokio::test]
async fn test_create_builtin_policy() {
    let (server, provider) = create_test_server();

    let response = server
        .handle_request(tool_call(
            "create_binding_policy",
            scenario_args("p1", json!([{"Type": "pods"}]), json!({})),
        ))
        .await;
    let (payload, is_error) = tool_payload(&response);

    assert!(!is_error, "unexpected error: {}", payload);
    assert_eq!(payload["message"], "Created binding policy 'p1' successfully");
    assert_eq!(payload["bindingPolicy"]["name"], "p1");
    assert_eq!(
        stored_rules(&provider, "p1").await,
        json!([{"resources": ["pods"], "objectSelectors": [{"matchLabels": {"app": "x"}}]}])
    );
}

#[tokio::test]
async fn test_create_custom_resource_policy() {
    let (server, provider) = create_test_server();

    let response = server
        .handle_request(tool_call(
            "create_binding_policy",
            scenario_args(
                "p1",
                json!([{"Type": "widgets", "CreateOnly": true}]),
                json!({"widgets": "example.io"}),
            ),
        ))
        .await;
    let (_, is_error) = tool_payload(&response);
    assert!(!is_error);

    let rules = stored_rules(&provider, "p1").await;
    assert_eq!(rules.as_array().unwrap().len(), 1);
    assert_eq!(rules[0]["resources"], json!(["widgets"]));
    assert_eq!(rules[0]["apiGroup"], "example.io");
    assert_eq!(rules[0]["createOnly"], true);
}

#[tokio::test]
async fn test_create_namespaces_rule_first() {
    let (server, provider) = create_test_server();

    let response = server
        .handle_request(tool_call(
            "create_binding_policy",
            scenario_args(
                "p1",
                json!([{"Type": "namespaces"}, {"Type": "pods"}]),
                json!({}),
            ),
        ))
        .await;
    let (_, is_error) = tool_payload(&response);
    assert!(!is_error);

    let rules = stored_rules(&provider, "p1").await;
    let rules = rules.as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["resources"], json!(["namespaces"]));
    assert_eq!(rules[1]["resources"], json!(["pods"]));
    assert!(rules.iter().all(|rule| rule.get("apiGroup").is_none()));
}

#[tokio::test]
async fn test_create_empty_name_is_invalid_input() {
    let (server, provider) = create_test_server();

    let response = server
        .handle_request(tool_call(
            "create_binding_policy",
            scenario_args("", json!([{"Type": "pods"}]), json!({})),
        ))
        .await;
    let (payload, is_error) = tool_payload(&response);

    assert!(is_error);
    assert_eq!(payload["error"], "Invalid input");
    // Shape errors are reported before any client is resolved.
    assert!(provider.requested_contexts().await.is_empty());
}

#[tokio::test]
async fn test_create_existing_policy_skips_create() {
    let (server, provider) = create_test_server();
    provider
        .api()
        .insert_policy(BindingPolicy::new("p1", BindingPolicySpec::default()))
        .await;

    let response = server
        .handle_request(tool_call(
            "create_binding_policy",
            scenario_args("p1", json!([{"Type": "pods"}]), json!({})),
        ))
        .await;
    let (payload, is_error) = tool_payload(&response);

    assert!(is_error);
    assert_eq!(payload["error"], "Policy already exists");
    assert_eq!(provider.api().call_count("create_binding_policy").await, 0);
}

#[tokio::test]
async fn test_policy_lifecycle() {
    let (server, _) = create_test_server();

    server
        .handle_request(tool_call(
            "create_binding_policy",
            scenario_args("p1", json!([{"Type": "deployments"}]), json!({})),
        ))
        .await;

    let (listing, _) = tool_payload(
        &server
            .handle_request(tool_call("list_binding_policies", json!({})))
            .await,
    );
    assert_eq!(listing["totalPolicies"], 1);
    assert_eq!(listing["bindingPolicies"][0]["name"], "p1");

    let (details, is_error) = tool_payload(
        &server
            .handle_request(tool_call(
                "get_binding_policy_details",
                json!({"policy_name": "p1"}),
            ))
            .await,
    );
    assert!(!is_error);
    assert_eq!(details["bindingPolicy"]["metadata"]["name"], "p1");

    let (deleted, is_error) = tool_payload(
        &server
            .handle_request(tool_call("delete_binding_policy", json!({"policy_name": "p1"})))
            .await,
    );
    assert!(!is_error);
    assert_eq!(deleted["message"], "Binding policy 'p1' deleted successfully");

    let (status, is_error) = tool_payload(
        &server
            .handle_request(tool_call(
                "get_binding_policy_status",
                json!({"policy_name": "p1"}),
            ))
            .await,
    );
    assert!(is_error);
    assert!(status["message"]
        .as_str()
        .unwrap()
        .contains("does not exist in the cluster"));
}

// ============================================================================
// Context Selection
// ============================================================================

#[tokio::test]
async fn test_context_forwarded_to_provider() {
    let (server, provider) = create_test_server();

    server
        .handle_request(tool_call("list_namespaces", json!({"context": "wds1"})))
        .await;
    server
        .handle_request(tool_call("list_all_clusters", json!({})))
        .await;

    assert_eq!(
        provider.requested_contexts().await,
        vec![Some("wds1".to_string()), None]
    );
}

#[tokio::test]
async fn test_unknown_context_is_structured_error() {
    let (server, _) = create_test_server();

    let response = server
        .handle_request(tool_call("get_nodes", json!({"context": "wds9"})))
        .await;
    let (payload, is_error) = tool_payload(&response);

    assert!(is_error);
    assert_eq!(payload["error"], "Context 'wds9' not found");
}

#[tokio::test]
async fn test_wds_context_flow() {
    let (server, _) = create_test_server();

    let (created, is_error) = tool_payload(
        &server
            .handle_request(tool_call(
                "create_wds_context",
                json!({"context_name": "wds2", "cluster_name": "kind-kubeflex", "user_name": "kind-kubeflex"}),
            ))
            .await,
    );
    assert!(!is_error);
    assert_eq!(created["name"], "wds2");

    let (names, _) = tool_payload(
        &server
            .handle_request(tool_call("list_wds_contexts", Value::Null))
            .await,
    );
    assert_eq!(names, json!(["wds1", "wds2"]));

    let (switched, _) = tool_payload(
        &server
            .handle_request(tool_call("switch_wds_context", json!({"context_name": "wds2"})))
            .await,
    );
    assert_eq!(switched["message"], "Switched to WDS context 'wds2'.");

    let response = server
        .handle_request(make_request(
            "resources/read",
            json!({"uri": "kubestellar://contexts"}),
        ))
        .await;
    let text = assert_success(&response)["contents"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    let contexts: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(contexts["currentContext"], "wds2");
}

// ============================================================================
// Resources
// ============================================================================

#[tokio::test]
async fn test_resources_list() {
    let (server, _) = create_test_server();
    let response = server
        .handle_request(make_request("resources/list", Value::Null))
        .await;

    let resources = assert_success(&response)["resources"]
        .as_array()
        .unwrap()
        .clone();
    let uris: Vec<&str> = resources.iter().filter_map(|r| r["uri"].as_str()).collect();
    assert!(uris.contains(&"kubestellar://bindingpolicies"));
    assert!(uris.contains(&"kubestellar://contexts/wds"));
}

#[tokio::test]
async fn test_resources_read_policy() {
    let (server, provider) = create_test_server();
    provider
        .api()
        .insert_policy(BindingPolicy::new("p1", BindingPolicySpec::default()))
        .await;

    let response = server
        .handle_request(make_request(
            "resources/read",
            json!({"uri": "kubestellar://bindingpolicies/p1"}),
        ))
        .await;
    let contents = &assert_success(&response)["contents"][0];
    assert_eq!(contents["mimeType"], "application/json");
    assert!(contents["text"].as_str().unwrap().contains("p1"));

    let missing = server
        .handle_request(make_request(
            "resources/read",
            json!({"uri": "kubestellar://bindingpolicies/ghost"}),
        ))
        .await;
    assert_error(&missing, INVALID_PARAMS);
}

#[tokio::test]
async fn test_resources_read_invalid_uri() {
    let (server, _) = create_test_server();
    let response = server
        .handle_request(make_request(
            "resources/read",
            json!({"uri": "k8s://nodes"}),
        ))
        .await;
    assert_error(&response, INVALID_PARAMS);
}
