//! Built-in capability catalogs for Stepwise.
//!
//! The reasoning loop only ever calls tools that appear in its catalog.
//! The default catalog describes the AMap MCP server; a deployment can
//! instead build its catalog from whatever the server advertises (see
//! `stepwise-mcp`).

pub mod amap;

use stepwise_core::error::ToolError;
use stepwise_core::tool::CapabilityCatalog;

/// The compiled-in AMap catalog.
pub fn default_catalog() -> Result<CapabilityCatalog, ToolError> {
    CapabilityCatalog::new(amap::descriptors())
}
