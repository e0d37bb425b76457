//! Declarative route tree.
//!
//! The tree is parsed once from an XML structure document whose element names
//! are path segments:
//!
//! ```xml
//! <routes>
//!   <api>
//!     <houses params="houseId" child-ns="Houses">
//!       <floors params="floorId"/>
//!     </houses>
//!   </api>
//! </routes>
//! ```
//!
//! The root element is synthetic and never matched against a request path.
//! `params` lists, in order, the path parameters a node owns; `child-ns` is a
//! namespace suffix applied when naming the handler types of descendants. A
//! node's handler type name is the effective namespace at its parent joined with
//! the capitalized node name, e.g. `Controllers::Houses::Floors`.
//!
//! After parsing the tree is immutable and can be shared between requests.
use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use quick_xml::{
    Reader,
    events::{BytesStart, Event, attributes::AttrError},
};
use thiserror::Error;

use crate::core::error::{ApiError, ApiResult};

/// Separator between namespace parts in handler type names.
pub const NAMESPACE_SEPARATOR: &str = "::";

const PARAMS_ATTR: &[u8] = b"params";
const CHILD_NS_ATTR: &[u8] = b"child-ns";

/// Path parameter name to the raw segment that filled it, in binding order.
pub type RouterParams = IndexMap<String, String>;

/// Errors detected while parsing a structure document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouteTreeError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] AttrError),

    #[error("Structure document has no root element")]
    Empty,

    #[error("Structure document has more than one root element ('{0}')")]
    MultipleRoots(String),

    #[error("Node '{parent}' declares segment '{segment}' more than once")]
    DuplicateSegment { parent: String, segment: String },

    #[error("Node '{node}' declares parameter '{param}' more than once")]
    DuplicateParam { node: String, param: String },

    #[error(
        "Handler '{handler}' owns path parameters on more than one node of the same path; \
         their bindings would collide"
    )]
    SharedParamOwner { handler: String },
}

/// One node of the route tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteNode {
    id: usize,
    name: String,
    params: Vec<String>,
    child_ns: Option<String>,
    handler: String,
    children: Vec<RouteNode>,
}

impl RouteNode {
    /// Pre-order index of the node, unique within its tree.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Path segment (case-sensitive).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters owned by this node, in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn child_ns(&self) -> Option<&str> {
        self.child_ns.as_deref()
    }

    /// Fully qualified handler type name for this node.
    pub fn handler_name(&self) -> &str {
        &self.handler
    }

    pub fn children(&self) -> &[RouteNode] {
        &self.children
    }

    /// Child whose segment is exactly `segment`.
    pub fn child(&self, segment: &str) -> Option<&RouteNode> {
        self.children.iter().find(|child| child.name == segment)
    }

    fn visit<'a>(&'a self, out: &mut Vec<&'a RouteNode>) {
        out.push(self);
        for child in &self.children {
            child.visit(out);
        }
    }
}

/// A node matched by literal segment during resolution, with the parameters
/// bound while it was the most recently matched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedNode<'t> {
    pub node: &'t RouteNode,
    pub own_params: RouterParams,
}

/// Outcome of walking a path against the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'t> {
    /// Literal matches in path order, root excluded.
    pub matched: Vec<MatchedNode<'t>>,
    /// Every parameter bound during the walk.
    pub params: RouterParams,
}

impl Resolution<'_> {
    /// `(node, handler type name)` pairs in path order.
    pub fn handler_names(&self) -> impl Iterator<Item = (&RouteNode, &str)> {
        self.matched
            .iter()
            .map(|m| (m.node, m.node.handler_name()))
    }
}

/// Immutable route tree plus the base namespace its handler names derive from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTree {
    root: RouteNode,
    namespace: String,
    len: usize,
}

impl RouteTree {
    /// Parse a structure document. `namespace` is the base namespace for handler names.
    pub fn parse(source: &str, namespace: &str) -> Result<Self, RouteTreeError> {
        let mut root = parse_document(source)?;

        let mut next_id = 0;
        assign_names(&mut root, namespace, &mut next_id);
        check_param_owners(&root, &mut Vec::new())?;

        tracing::debug!(
            root = %root.name,
            nodes = next_id,
            namespace,
            "Parsed route tree"
        );

        Ok(Self {
            root,
            namespace: namespace.to_string(),
            len: next_id,
        })
    }

    pub fn root(&self) -> &RouteNode {
        &self.root
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of nodes, root included. Node ids are `0..len()`.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> Vec<&RouteNode> {
        let mut out = Vec::with_capacity(self.len);
        self.root.visit(&mut out);
        out
    }

    /// Walk `path` against the tree.
    ///
    /// The query string is ignored and empty segments are skipped. A segment
    /// naming a child of the current node always descends, even while a
    /// parameter is pending; otherwise it fills the next pending parameter of
    /// the last matched node. A segment that can do neither fails with
    /// [`ApiError::NotFound`].
    pub fn resolve(&self, path: &str) -> ApiResult<Resolution<'_>> {
        let path = path.split('?').next().unwrap_or_default();

        let mut current = &self.root;
        let mut pending: VecDeque<&str> = VecDeque::new();
        let mut matched: Vec<MatchedNode<'_>> = Vec::new();
        let mut params = RouterParams::new();

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if let Some(child) = current.child(segment) {
                current = child;
                pending = child.params.iter().map(String::as_str).collect();
                matched.push(MatchedNode {
                    node: child,
                    own_params: RouterParams::new(),
                });
            } else if let Some(name) = pending.pop_front() {
                params.insert(name.to_string(), segment.to_string());
                if let Some(owner) = matched.last_mut() {
                    owner
                        .own_params
                        .insert(name.to_string(), segment.to_string());
                }
            } else {
                return Err(ApiError::NotFound {
                    segment: segment.to_string(),
                    path: path.to_string(),
                });
            }
        }

        Ok(Resolution { matched, params })
    }
}

fn parse_document(source: &str) -> Result<RouteNode, RouteTreeError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<RouteNode> = Vec::new();
    let mut root: Option<RouteNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(node_from_tag(&start)?),
            Event::Empty(start) => {
                let node = node_from_tag(&start)?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // quick-xml verifies end names, so the stack is never empty here
                if let Some(node) = stack.pop() {
                    attach(node, &mut stack, &mut root)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or(RouteTreeError::Empty)
}

fn node_from_tag(start: &BytesStart<'_>) -> Result<RouteNode, RouteTreeError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut params = Vec::new();
    let mut child_ns = None;

    for attr in start.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            PARAMS_ATTR => {
                for param in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    if params.iter().any(|p| p == param) {
                        return Err(RouteTreeError::DuplicateParam {
                            node: name,
                            param: param.to_string(),
                        });
                    }
                    params.push(param.to_string());
                }
            }
            CHILD_NS_ATTR => {
                let ns = value.trim();
                if !ns.is_empty() {
                    child_ns = Some(ns.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(RouteNode {
        id: 0,
        name,
        params,
        child_ns,
        handler: String::new(),
        children: Vec::new(),
    })
}

fn attach(
    node: RouteNode,
    stack: &mut [RouteNode],
    root: &mut Option<RouteNode>,
) -> Result<(), RouteTreeError> {
    match stack.last_mut() {
        Some(parent) => {
            if parent.child(&node.name).is_some() {
                return Err(RouteTreeError::DuplicateSegment {
                    parent: parent.name.clone(),
                    segment: node.name,
                });
            }
            parent.children.push(node);
        }
        None if root.is_some() => return Err(RouteTreeError::MultipleRoots(node.name)),
        None => *root = Some(node),
    }
    Ok(())
}

fn assign_names(node: &mut RouteNode, namespace: &str, next_id: &mut usize) {
    node.id = *next_id;
    *next_id += 1;
    node.handler = format!("{namespace}{NAMESPACE_SEPARATOR}{}", capitalize(&node.name));

    let child_namespace = match &node.child_ns {
        Some(suffix) => format!("{namespace}{NAMESPACE_SEPARATOR}{suffix}"),
        None => namespace.to_string(),
    };
    for child in &mut node.children {
        assign_names(child, &child_namespace, next_id);
    }
}

/// Two param-owning nodes on one root-to-leaf path must not share a handler
/// type name, otherwise their own-parameter sets could not be told apart.
fn check_param_owners<'a>(
    node: &'a RouteNode,
    owners: &mut Vec<&'a str>,
) -> Result<(), RouteTreeError> {
    let owns = !node.params.is_empty();
    if owns {
        if owners.contains(&node.handler.as_str()) {
            return Err(RouteTreeError::SharedParamOwner {
                handler: node.handler.clone(),
            });
        }
        owners.push(node.handler.as_str());
    }

    for child in &node.children {
        check_param_owners(child, owners)?;
    }

    if owns {
        owners.pop();
    }
    Ok(())
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Handler names that occur on more than one node. Not an error on its own,
/// but worth surfacing when binding handlers.
pub fn duplicate_handler_names(tree: &RouteTree) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for node in tree.nodes() {
        if !seen.insert(node.handler_name()) && !duplicates.contains(&node.handler_name()) {
            duplicates.push(node.handler_name());
        }
    }
    duplicates
}
