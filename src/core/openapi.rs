//! OpenAPI description generated from the route tree and handler metadata.
//!
//! The generator never serves a request; it walks the tree the router was built
//! with and asks each bound handler type which dispatch methods it implements.
//! Paths are rooted below the tree's synthetic root element, so the root's own
//! segment never appears in a documented path.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{
    controller::{Controller, DispatchMethod, Endpoints, HandlerMetadata, Verb},
    error::{ApiError, ApiResult},
    exchange::Exchange,
    route_tree::RouteNode,
    router::Router,
};

pub const OPENAPI_VERSION: &str = "3.0.4";

/// Title and version of the described API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: ApiInfo,
    pub paths: IndexMap<String, PathItem>,
}

/// Lower-case verb to operation, in `get, post, patch, put, delete` order.
pub type PathItem = IndexMap<String, Operation>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub summary: String,
    pub responses: IndexMap<String, ResponseDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDoc {
    pub description: String,
}

/// A templated path parameter. Path parameters are always required strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDoc {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: ParameterSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ParameterDoc {
    fn path(name: &str) -> Self {
        Self {
            name: name.to_string(),
            location: "path".to_string(),
            required: true,
            schema: ParameterSchema {
                kind: "string".to_string(),
            },
        }
    }
}

pub struct DocGenerator<'r> {
    router: &'r Router,
}

impl<'r> DocGenerator<'r> {
    pub fn new(router: &'r Router) -> Self {
        Self { router }
    }

    pub fn generate(&self) -> OpenApiDocument {
        let mut paths = IndexMap::new();
        let root = self.router.tree().root();
        for child in root.children() {
            self.visit(child, Vec::new(), Vec::new(), &mut paths);
        }

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.router.info().clone(),
            paths,
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.generate())
    }

    fn visit(
        &self,
        node: &RouteNode,
        mut segments: Vec<String>,
        mut inherited: Vec<ParameterDoc>,
        paths: &mut IndexMap<String, PathItem>,
    ) {
        segments.push(node.name().to_string());
        let metadata = self.router.metadata(node);

        if let Some(metadata) = metadata {
            let item = path_item(node, metadata, &inherited, false);
            if !item.is_empty() {
                paths.insert(path_key(&segments), item);
            }
        }

        if !node.params().is_empty() {
            for param in node.params() {
                segments.push(format!("{{{param}}}"));
                inherited.push(ParameterDoc::path(param));
            }
            // the templated path resolves even when no `_PARAMS` verb is implemented
            if let Some(metadata) = metadata {
                let item = path_item(node, metadata, &inherited, true);
                paths.insert(path_key(&segments), item);
            }
        }

        for child in node.children() {
            self.visit(child, segments.clone(), inherited.clone(), paths);
        }
    }
}

fn path_key(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

fn path_item(
    node: &RouteNode,
    metadata: &HandlerMetadata,
    inherited: &[ParameterDoc],
    with_params: bool,
) -> PathItem {
    Verb::ALL
        .into_iter()
        .map(|verb| DispatchMethod { verb, with_params })
        .filter(|method| metadata.implements(*method))
        .map(|method| {
            (
                method.verb.as_str().to_lowercase(),
                operation(node, metadata, method, inherited),
            )
        })
        .collect()
}

fn operation(
    node: &RouteNode,
    metadata: &HandlerMetadata,
    method: DispatchMethod,
    inherited: &[ParameterDoc],
) -> Operation {
    let meta = metadata.meta(method);
    let non_empty = |s: &Option<String>| s.as_ref().filter(|s| !s.is_empty()).cloned();

    let summary = meta
        .and_then(|m| non_empty(&m.title))
        .unwrap_or_else(|| default_summary(node, metadata, method));

    Operation {
        summary,
        responses: IndexMap::from([(
            "200".to_string(),
            ResponseDoc {
                description: "Found".to_string(),
            },
        )]),
        parameters: inherited.to_vec(),
        description: meta.and_then(|m| non_empty(&m.description)),
        tags: meta.map(|m| m.tags.clone()).unwrap_or_default(),
    }
}

/// `"<Verb> <name>"` for undocumented operations.
///
/// The trailing character of the node name is dropped for single-item
/// (`_PARAMS`) variants and for POST, and a plain GET on a type that also
/// serves `GET_PARAMS` reads as "List".
fn default_summary(node: &RouteNode, metadata: &HandlerMetadata, method: DispatchMethod) -> String {
    let singular = || {
        let mut name = node.name().to_string();
        name.pop();
        name
    };

    let mut action = method.verb.title();
    let mut name = if method.with_params {
        singular()
    } else {
        node.name().to_string()
    };

    if method == DispatchMethod::plain(Verb::Get)
        && metadata.implements(DispatchMethod::with_params(Verb::Get))
    {
        action = "List";
    } else if method.verb == Verb::Post {
        name = singular();
    }

    format!("{action} {name}")
}

/// Serves the generated description on `GET`.
#[derive(Debug, Default)]
pub struct DocsController;

impl DocsController {
    fn describe(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<Value> {
        DocGenerator::new(exchange.router())
            .to_value()
            .map_err(ApiError::internal)
    }
}

impl Controller for DocsController {
    fn endpoints() -> Endpoints<Self> {
        Endpoints::new().get(Self::describe)
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use serde_json::json;

    use super::*;
    use crate::core::{
        controller::EndpointMeta, exchange::ApiRequest, registry::ControllerRegistry,
        route_tree::RouteTree,
    };

    const STRUCTURE: &str = r#"<root>
        <api>
            <shops params="shopId" child-ns="Shops">
                <items params="itemId, variant"/>
            </shops>
            <docs/>
        </api>
    </root>"#;

    #[derive(Default)]
    struct Shops;

    impl Shops {
        fn ok(&mut self, _: &mut Exchange<'_>) -> ApiResult<Value> {
            Ok(Value::Null)
        }
    }

    impl Controller for Shops {
        fn endpoints() -> Endpoints<Self> {
            Endpoints::new()
                .get(Self::ok)
                .post(Self::ok)
                .get_params(Self::ok)
                .delete_params(Self::ok)
                .describe(
                    DispatchMethod::with_params(Verb::Delete),
                    EndpointMeta::new()
                        .title("Close a shop")
                        .description("Permanently")
                        .tags(["Shop"]),
                )
        }
    }

    #[derive(Default)]
    struct Items;

    impl Items {
        fn ok(&mut self, _: &mut Exchange<'_>) -> ApiResult<Value> {
            Ok(Value::Null)
        }
    }

    impl Controller for Items {
        fn endpoints() -> Endpoints<Self> {
            Endpoints::new().get(Self::ok).put_params(Self::ok)
        }
    }

    fn router() -> Router {
        let tree = RouteTree::parse(STRUCTURE, "App").unwrap();
        let registry = ControllerRegistry::new()
            .with::<Shops>("App::Shops")
            .with::<Items>("App::Shops::Items")
            .with::<DocsController>("App::Docs");
        Router::new(tree, &registry).with_info(ApiInfo {
            title: "Shop API".into(),
            version: "1.2.3".into(),
        })
    }

    #[test]
    fn test_document_root() {
        let doc = DocGenerator::new(&router()).to_value().unwrap();
        assert_eq!(doc["openapi"], "3.0.4");
        assert_eq!(doc["info"], json!({"title": "Shop API", "version": "1.2.3"}));
    }

    #[test]
    fn test_paths_are_rooted_below_synthetic_root() {
        let doc = DocGenerator::new(&router()).generate();
        let keys: Vec<_> = doc.paths.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "/api/shops",
                "/api/shops/{shopId}",
                "/api/shops/{shopId}/items",
                "/api/shops/{shopId}/items/{itemId}/{variant}",
                "/api/docs",
            ]
        );
    }

    #[test]
    fn test_default_summaries() {
        let doc = DocGenerator::new(&router()).generate();
        let summary = |path: &str, verb: &str| doc.paths[path][verb].summary.clone();

        assert_eq!(summary("/api/shops", "get"), "List shops");
        assert_eq!(summary("/api/shops", "post"), "Post shop");
        assert_eq!(summary("/api/shops/{shopId}", "get"), "Get shop");
        assert_eq!(summary("/api/shops/{shopId}/items", "get"), "Get items");
        assert_eq!(
            summary("/api/shops/{shopId}/items/{itemId}/{variant}", "put"),
            "Put item"
        );
        assert_eq!(summary("/api/docs", "get"), "Get docs");
    }

    #[test]
    fn test_declared_metadata_wins() {
        let doc = DocGenerator::new(&router()).to_value().unwrap();
        assert_eq!(
            doc["paths"]["/api/shops/{shopId}"]["delete"],
            json!({
                "summary": "Close a shop",
                "responses": {"200": {"description": "Found"}},
                "parameters": [
                    {"name": "shopId", "in": "path", "required": true, "schema": {"type": "string"}}
                ],
                "description": "Permanently",
                "tags": ["Shop"],
            })
        );
    }

    #[test]
    fn test_parameters_are_inherited() {
        let doc = DocGenerator::new(&router()).generate();
        let names: Vec<_> = doc.paths["/api/shops/{shopId}/items/{itemId}/{variant}"]["put"]
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["shopId", "itemId", "variant"]);
        assert!(doc.paths["/api/shops"]["get"].parameters.is_empty());
    }

    #[test]
    fn test_param_owner_without_params_verbs_keeps_templated_entry() {
        let tree = RouteTree::parse(r#"<r><items params="itemId"/></r>"#, "App").unwrap();
        let router = Router::new(tree, &ControllerRegistry::new().with::<Items>("App::Items"));
        let doc = DocGenerator::new(&router).generate();

        let keys: Vec<_> = doc.paths.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/items", "/items/{itemId}"]);
        // Items only serves PUT_PARAMS on the templated path
        assert_eq!(
            doc.paths["/items/{itemId}"].keys().collect::<Vec<_>>(),
            vec!["put"]
        );

        let tree = RouteTree::parse(r#"<r><things params="id"/></r>"#, "App").unwrap();
        let router = Router::new(tree, &ControllerRegistry::new().with::<Things>("App::Things"));
        let doc = DocGenerator::new(&router).generate();
        assert!(doc.paths["/things/{id}"].is_empty());
    }

    #[derive(Default)]
    struct Things;

    impl Things {
        fn list(&mut self, _: &mut Exchange<'_>) -> ApiResult<Value> {
            Ok(Value::Null)
        }
    }

    impl Controller for Things {
        fn endpoints() -> Endpoints<Self> {
            Endpoints::new().get(Self::list)
        }
    }

    #[test]
    fn test_generation_is_stable() {
        let router = router();
        let generator = DocGenerator::new(&router);
        assert_eq!(generator.generate(), generator.generate());
    }

    #[test]
    fn test_docs_controller_serves_document() {
        let router = router();
        let served = router
            .dispatch(ApiRequest::new(Method::GET, "/api/docs"))
            .unwrap();
        assert_eq!(served, DocGenerator::new(&router).to_value().unwrap());
    }
}
