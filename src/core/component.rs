//! Component graph - the sub-libraries CLHEP installs and how to link them.
//!
//! CLHEP builds one library per component plus a combined library. The
//! combined library duplicates the components and is removed at package
//! time; consumers wanting everything link the synthetic umbrella component
//! instead, which simply requires every real component.
//!
//! The table in [`COMPONENTS`] is the only authoritative dependency data.
//! Everything else (display names, artifact names, system libraries) is
//! derived from it by pure functions.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::platform::Os;

/// Suffix appended to display names of static builds.
pub const STATIC_SUFFIX: &str = "S";

/// Key of the synthetic component aggregating all others.
pub const UMBRELLA_KEY: &str = "clheplib";

/// Base name of the umbrella (and of the combined library CLHEP installs).
pub const UMBRELLA_BASE: &str = "CLHEP";

/// Host libraries a component needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemLibs {
    None,
    /// libm
    Math,
    /// libpthread
    Threads,
    /// libm + libpthread
    MathThreads,
}

impl SystemLibs {
    /// Library names for an operating system.
    ///
    /// Only Linux needs these spelled out; elsewhere they are part of the C
    /// runtime.
    pub fn for_os(&self, os: Os) -> Vec<String> {
        if os != Os::Linux {
            return Vec::new();
        }
        let libs: &[&str] = match self {
            SystemLibs::None => &[],
            SystemLibs::Math => &["m"],
            SystemLibs::Threads => &["pthread"],
            SystemLibs::MathThreads => &["m", "pthread"],
        };
        libs.iter().map(|s| s.to_string()).collect()
    }
}

/// One row of the component table.
#[derive(Debug, Clone, Copy)]
pub struct ComponentSpec {
    pub key: &'static str,
    pub base: &'static str,
    pub requires: &'static [&'static str],
    pub system_libs: SystemLibs,
}

impl ComponentSpec {
    const fn new(
        key: &'static str,
        base: &'static str,
        requires: &'static [&'static str],
        system_libs: SystemLibs,
    ) -> Self {
        ComponentSpec {
            key,
            base,
            requires,
            system_libs,
        }
    }
}

/// The CLHEP component table.
pub const COMPONENTS: &[ComponentSpec] = &[
    ComponentSpec::new("vector", "Vector", &[], SystemLibs::MathThreads),
    ComponentSpec::new("evaluator", "Evaluator", &[], SystemLibs::MathThreads),
    ComponentSpec::new("genericfunctions", "GenericFunctions", &[], SystemLibs::MathThreads),
    ComponentSpec::new("geometry", "Geometry", &["vector"], SystemLibs::MathThreads),
    ComponentSpec::new("random", "Random", &[], SystemLibs::MathThreads),
    ComponentSpec::new("matrix", "Matrix", &["random", "vector"], SystemLibs::MathThreads),
    ComponentSpec::new(
        "randomobjects",
        "RandomObjects",
        &["random", "matrix", "vector"],
        SystemLibs::Math,
    ),
    ComponentSpec::new("cast", "Cast", &[], SystemLibs::Threads),
    ComponentSpec::new("refcount", "RefCount", &[], SystemLibs::Threads),
    ComponentSpec::new("exceptions", "Exceptions", &["cast", "refcount"], SystemLibs::None),
];

/// Name under which a component is exported for a build mode.
///
/// Shared builds use the base name, static builds append [`STATIC_SUFFIX`].
pub fn display_name(base: &str, shared: bool) -> String {
    if shared {
        base.to_string()
    } else {
        format!("{}{}", base, STATIC_SUFFIX)
    }
}

/// Library name (without prefix/extension) installed for a component.
pub fn artifact_name(display_name: &str, version: &str) -> String {
    format!("CLHEP-{}-{}", display_name, version)
}

/// A resolved component, as exported to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Unique key (e.g., "vector")
    pub key: String,

    /// Name for the active build mode (e.g., "Vector" or "VectorS")
    pub display_name: String,

    /// CMake imported target name
    pub cmake_name: String,

    /// pkg-config module name; the umbrella has none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkg_config_name: Option<String>,

    /// Libraries to link
    pub libs: Vec<String>,

    /// Host libraries to link
    pub system_libs: Vec<String>,

    /// Keys of sibling components this one requires
    pub requires: Vec<String>,
}

impl Component {
    pub fn is_umbrella(&self) -> bool {
        self.key == UMBRELLA_KEY
    }
}

/// Immutable component graph for one build configuration.
#[derive(Debug, Clone)]
pub struct ComponentGraph {
    version: String,
    shared: bool,
    components: Vec<Component>,
    graph: DiGraph<usize, ()>,
    index: HashMap<String, NodeIndex>,
}

impl ComponentGraph {
    /// Build the CLHEP component graph.
    pub fn build(version: &str, shared: bool, os: Os) -> Result<Self, ConfigError> {
        Self::from_specs(COMPONENTS, version, shared, os)
    }

    /// Build a graph from an arbitrary component table.
    ///
    /// Fails if keys repeat, if a component requires an unknown key, or if the
    /// requirements form a cycle.
    pub fn from_specs(
        specs: &[ComponentSpec],
        version: &str,
        shared: bool,
        os: Os,
    ) -> Result<Self, ConfigError> {
        let mut components = Vec::with_capacity(specs.len() + 1);
        let mut index = HashMap::new();
        let mut graph = DiGraph::new();

        for spec in specs {
            if spec.key == UMBRELLA_KEY || index.contains_key(spec.key) {
                return Err(invalid(format!("duplicate component key `{}`", spec.key)));
            }
            let name = display_name(spec.base, shared);
            let node = graph.add_node(components.len());
            index.insert(spec.key.to_string(), node);
            components.push(Component {
                key: spec.key.to_string(),
                display_name: name.clone(),
                cmake_name: name.clone(),
                pkg_config_name: Some(format!("clhep-{}", spec.key)),
                libs: vec![artifact_name(&name, version)],
                system_libs: spec.system_libs.for_os(os),
                requires: spec.requires.iter().map(|s| s.to_string()).collect(),
            });
        }

        let umbrella_name = display_name(UMBRELLA_BASE, shared);
        let umbrella_node = graph.add_node(components.len());
        index.insert(UMBRELLA_KEY.to_string(), umbrella_node);
        components.push(Component {
            key: UMBRELLA_KEY.to_string(),
            display_name: umbrella_name.clone(),
            cmake_name: umbrella_name,
            pkg_config_name: None,
            libs: Vec::new(),
            system_libs: Vec::new(),
            requires: specs.iter().map(|s| s.key.to_string()).collect(),
        });

        for component in &components {
            let from = index[&component.key];
            for dep in &component.requires {
                let to = index.get(dep).ok_or_else(|| {
                    invalid(format!(
                        "component `{}` requires unknown component `{}`",
                        component.key, dep
                    ))
                })?;
                graph.add_edge(from, *to, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            let key = &components[graph[cycle.node_id()]].key;
            return Err(invalid(format!(
                "cycle detected in component graph at `{}`",
                key
            )));
        }

        tracing::debug!(
            "built component graph for CLHEP {} ({} components, shared={})",
            version,
            components.len(),
            shared
        );

        Ok(ComponentGraph {
            version: version.to_string(),
            shared,
            components,
            graph,
            index,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Look up a component (including the umbrella) by key.
    pub fn get(&self, key: &str) -> Option<&Component> {
        self.index.get(key).map(|n| &self.components[self.graph[*n]])
    }

    /// All real components, in table order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| !c.is_umbrella())
    }

    /// All components including the umbrella, in table order.
    pub fn all(&self) -> &[Component] {
        &self.components
    }

    /// The umbrella component.
    pub fn umbrella(&self) -> &Component {
        // Always pushed last by `from_specs`.
        &self.components[self.components.len() - 1]
    }

    /// Components ordered so that every component precedes the ones it
    /// requires, i.e. the order a linker wants them in.
    pub fn link_order(&self) -> Vec<&Component> {
        // The graph was checked for cycles on construction.
        toposort(&self.graph, None)
            .unwrap_or_default()
            .into_iter()
            .map(|n| &self.components[self.graph[n]])
            .collect()
    }

    /// Components ordered so that dependencies come first.
    pub fn build_order(&self) -> Vec<&Component> {
        let mut order = self.link_order();
        order.reverse();
        order
    }

    /// Every component reachable from `key` through `requires` (excluding `key`).
    pub fn transitive_requires(&self, key: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let Some(start) = self.index.get(key) else {
            return seen;
        };

        let mut dfs = petgraph::visit::Dfs::new(&self.graph, *start);
        while let Some(node) = dfs.next(&self.graph) {
            if node != *start {
                seen.insert(self.components[self.graph[node]].key.clone());
            }
        }
        seen
    }

    /// Library file names of the real components for a platform.
    pub fn artifact_files(&self, os: Os) -> Vec<String> {
        let ext = if self.shared {
            os.shared_lib_extension()
        } else {
            os.static_lib_extension()
        };
        self.components()
            .flat_map(|c| c.libs.iter())
            .map(|lib| format!("{}{}.{}", os.lib_prefix(), lib, ext))
            .collect()
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::InvalidRecipe { message }
}
