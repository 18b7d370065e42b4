//! # aci-slice - Configuration Slice Extraction
//!
//! Extracts a self-consistent slice of an ACI policy universe, rooted at a
//! few chosen objects, and turns it into normalized tables that can be
//! replayed against another fabric.
//!
//! ## Modules
//!
//! - **tree**: Addressable index over the raw hierarchical payload
//! - **schema**: Declarative object types, relations and namespaces
//! - **extract**: Dependency closure and projection into tables
//! - **remap**: Identifier substitution across all produced tables
//!
//! ## Quick Start
//!
//! ### Extraction
//!
//! ```rust
//! use aci_slice::{extract, schema::aci, Seed, SliceConfig, TreeIndex};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let payload = json!({"polUni": {"attributes": {}, "children": [
//!     {"fvTenant": {"attributes": {"name": "Prod"}, "children": [
//!         {"fvCtx": {"attributes": {"name": "main"}}},
//!         {"fvBD": {"attributes": {"name": "web"}, "children": [
//!             {"fvRsCtx": {"attributes": {"tnFvCtxName": "main"}}}
//!         ]}},
//!         {"fvAp": {"attributes": {"name": "shop"}, "children": [
//!             {"fvAEPg": {"attributes": {"name": "front"}, "children": [
//!                 {"fvRsBd": {"attributes": {"tnFvBDName": "web"}}}
//!             ]}}
//!         ]}}
//!     ]}}
//! ]}});
//!
//! let tree = TreeIndex::load(&payload)?;
//! let seeds = [Seed::new("fvAEPg", ["Prod", "shop", "front"])];
//! let extraction = extract(&tree, aci::registry(), &seeds, &SliceConfig::default())?;
//!
//! // the EPG pulls in its application profile, bridge domain, VRF and tenant
//! assert_eq!(extraction.closure.len(), 5);
//! let bd = extraction.table("bd").unwrap();
//! assert_eq!(bd.value(0, "vrf"), Some("main"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Conversion
//!
//! ```rust
//! use aci_slice::remap::{self, SubstitutionPlan};
//! use aci_slice::schema::aci;
//! use aci_slice::Row;
//!
//! let mut tenants = aci::registry().table("tenant").unwrap().empty_table();
//! let values = vec!["Prod".to_string(), String::new()];
//! tenants.rows.push(Row { key: tenants.key_of(&values), values });
//!
//! let plan = SubstitutionPlan::new().with("tenant", "Prod", "ProdNew");
//! let (converted, report) = remap::apply(aci::registry(), &[tenants], &plan).unwrap();
//! assert_eq!(converted[0].value(0, "tenant"), Some("ProdNew"));
//! assert_eq!(report.total(), 1);
//! ```

use serde_json::Value;
use tracing::info;

pub mod dn;
pub mod error;
pub mod extract;
pub mod remap;
pub mod schema;
pub mod tree;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{ClosureError, ConfigError, ConversionError, ConversionErrors, SliceError, Warning};
pub use extract::{compute_closure, ClosureEngine, ClosureState, Projection, Projector};
pub use remap::{RemapEngine, RemapReport, SubstitutionPlan};
pub use schema::Registry;
pub use tree::TreeIndex;
pub use types::{Column, ConfigObject, ObjectId, ObjectKey, Row, Seed, SliceConfig, Table};

/// Result of one extraction run
#[derive(Debug, Clone)]
pub struct Extraction {
    pub closure: ClosureState,
    /// One table per registered type, in registry order
    pub tables: Vec<Table>,
    /// Closure warnings followed by projection warnings
    pub warnings: Vec<Warning>,
    pub dropped: usize,
    pub duplicates: usize,
}

impl Extraction {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Main entry point: closure of `seeds`, projected into every registered table
pub fn extract(
    tree: &TreeIndex,
    registry: &Registry,
    seeds: &[Seed],
    config: &SliceConfig,
) -> Result<Extraction, SliceError> {
    let (closure, mut warnings) = compute_closure(tree, registry, seeds, config)?;

    let mut projector = Projector::new(tree, registry);
    let mut tables = Vec::with_capacity(registry.types().len());
    let mut dropped = 0;
    let mut duplicates = 0;
    for projection in projector.project_all(&closure) {
        dropped += projection.dropped;
        duplicates += projection.duplicates;
        warnings.extend(projection.warnings);
        tables.push(projection.table);
    }

    info!(
        rows = tables.iter().map(Table::len).sum::<usize>(),
        dropped,
        duplicates,
        warnings = warnings.len(),
        "extraction complete"
    );
    Ok(Extraction {
        closure,
        tables,
        warnings,
        dropped,
        duplicates,
    })
}

/// Load `payload` and extract from it
pub fn extract_payload(
    payload: &Value,
    registry: &Registry,
    seeds: &[Seed],
    config: &SliceConfig,
) -> Result<Extraction, SliceError> {
    let tree = TreeIndex::load(payload)?;
    extract(&tree, registry, seeds, config)
}
