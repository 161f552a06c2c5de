//! Carrying custom corner normals through subdivision.
//!
//! Backends only interpolate generic corner layers. Before realizing, the
//! current corner normals are copied into the [`CUSTOM_NORMAL_LAYER`]; the
//! layer is interpolated like any other and turned back into normalized
//! custom normals on the result.
use subsurf_mesh::{Mesh, Result};

/// Name of the temporary corner layer holding normals.
pub const CUSTOM_NORMAL_LAYER: &str = "custom_normal";

/// Returns a copy of `mesh` with its corner normals stored in
/// [`CUSTOM_NORMAL_LAYER`].
pub fn snapshot(mesh: &Mesh) -> Result<Mesh> {
    let mut base = mesh.clone();
    base.add_corner_layer(CUSTOM_NORMAL_LAYER, mesh.corner_normals())?;
    Ok(base)
}

/// Turns the interpolated layer on `result` back into custom normals and
/// drops the layer.
///
/// A result without the layer ends up without custom normals.
pub fn restore(result: &mut Mesh) -> Result<()> {
    match result.remove_corner_layer(CUSTOM_NORMAL_LAYER) {
        Some(normals) => result.set_custom_normals_normalized(&normals),
        None => {
            result.clear_custom_normals();
            Ok(())
        }
    }
}
