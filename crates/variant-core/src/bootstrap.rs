//! Deriving a new variant from a base
//!
//! Creates the variant container next to the base, a primary node copied
//! from the base root, and the hidden bookkeeping node, then runs the first
//! `apply`.

use crate::config::VariantConfig;
use crate::engine::VariantEngine;
use crate::error::{Result, VariantError};
use crate::state::{VariantState, STATE_FIELD};
use variant_model::{AssetFactory, AssetGuid, FieldValue, NodeFlags, NodeHandle, StoreError};
use variant_ref::StableReference;
use variant_sync::{ApplyReport, DiagnosticSink, TracingSink};

/// Handles of a freshly derived variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedVariant {
    pub container: AssetGuid,
    pub asset_path: String,
    pub root: NodeHandle,
    pub bookkeeping: NodeHandle,
    pub report: ApplyReport,
}

/// Derive a variant of `base_root`, reporting through `tracing`
///
/// # Errors
/// See [`derive_variant_with_sink`]
pub fn derive_variant<S: AssetFactory + ?Sized>(
    store: &mut S,
    base_root: NodeHandle,
    config: &VariantConfig,
) -> Result<DerivedVariant> {
    let sink = TracingSink::new(config.diagnostic_level);
    derive_variant_with_sink(store, base_root, config, sink)
}

/// Derive a variant of `base_root`
///
/// The container is created at `<base dir>/<base name><suffix>.<base ext>`,
/// made unique if taken.
///
/// # Errors
/// Fails if `base_root` is not the persisted primary node of its
/// container, or on store failures
pub fn derive_variant_with_sink<S: AssetFactory + ?Sized, D: DiagnosticSink>(
    store: &mut S,
    base_root: NodeHandle,
    config: &VariantConfig,
    sink: D,
) -> Result<DerivedVariant> {
    let base_container = store
        .container_of(base_root)
        .ok_or(VariantError::NotPersistent(base_root))?;
    if !store.is_primary_node(base_root) {
        return Err(VariantError::InvalidBase(format!(
            "{base_root} is not the primary node of its container"
        )));
    }
    let base_path = store
        .asset_path(&base_container)
        .ok_or(StoreError::UnknownContainer(base_container))?;

    let (dir, file) = base_path.rsplit_once('/').unwrap_or(("", base_path.as_str()));
    let (stem, ext) = match file.rfind('.') {
        Some(dot) => file.split_at(dot),
        None => (file, ""),
    };
    let base_name = store
        .name(base_root)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| stem.to_string());
    let name = format!("{base_name}{}", config.variant_suffix);
    let wanted = if dir.is_empty() {
        format!("{name}{ext}")
    } else {
        format!("{dir}/{name}{ext}")
    };
    let asset_path = store.unique_asset_path(&wanted);
    let container = store.create_container(&asset_path)?;

    let root = store.instantiate_copy(base_root)?;
    store.set_name(root, &name)?;
    store.add_sub_node(&container, root)?;
    store.set_primary(root)?;

    let state = VariantState::new(StableReference::identify(store, base_root));
    let bookkeeping = store.create_node(&config.bookkeeping_type);
    store.set_name(bookkeeping, &config.bookkeeping_type)?;
    store.set_flags(
        bookkeeping,
        NodeFlags {
            hidden: true,
            ..NodeFlags::default()
        },
    )?;
    store.define_field(bookkeeping, STATE_FIELD, FieldValue::Data(state.to_value()?))?;
    store.add_sub_node(&container, bookkeeping)?;

    let report = VariantEngine::with_sink(&mut *store, config.clone(), sink).apply(root)?;
    Ok(DerivedVariant {
        container,
        asset_path,
        root,
        bookkeeping,
        report,
    })
}
