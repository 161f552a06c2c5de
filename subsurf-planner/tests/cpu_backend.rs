//! Refinement results of the built-in CPU backend.
use approx::assert_abs_diff_eq;
use subsurf_mesh::{EdgeCrease, Mesh};
use subsurf_planner::cpu::CpuBackend;
use subsurf_planner::settings::{ToCcgSettings, ToMeshSettings};
use subsurf_planner::{
    BoundarySmooth, DescriptorBuilder, Error, MeshRealizer, ModifierConfig, SubdivSettings,
    SubdivisionType,
};

mod test_utils;
use test_utils::*;

/// Catmull-Clark without limit surface projection.
fn approximating() -> ModifierConfig {
    ModifierConfig {
        use_limit_surface: false,
        ..Default::default()
    }
}

fn subdivide(mesh: &Mesh, config: &ModifierConfig, level: u32) -> Mesh {
    let backend = CpuBackend;
    let descriptor = backend
        .build(mesh, &SubdivSettings::new(config, level))
        .unwrap();
    backend
        .to_mesh(
            &descriptor,
            &ToMeshSettings {
                resolution: (1 << level) + 1,
                use_optimal_display: true,
            },
            mesh,
        )
        .unwrap()
}

#[test]
fn test_cube_element_counts() {
    init_logging();
    let level_1 = subdivide(&cube(), &ModifierConfig::default(), 1);
    assert_eq!(level_1.vertex_count(), 26);
    assert_eq!(level_1.face_count(), 24);

    let level_2 = subdivide(&cube(), &ModifierConfig::default(), 2);
    assert_eq!(level_2.vertex_count(), 98);
    assert_eq!(level_2.face_count(), 96);
    assert_eq!(level_2.corner_count(), 384);
    assert!(level_2.faces().all(|face| face.len() == 4));
}

#[test]
fn test_stencils_are_affine() {
    let descriptor = CpuBackend
        .build(&cube(), &SubdivSettings::new(&ModifierConfig::default(), 2))
        .unwrap();
    let stencils = descriptor.vertex_stencils();
    assert_eq!(stencils.len(), 98);
    assert_eq!(stencils.control_vertex_count(), 8);

    for i in 0..stencils.len() {
        let stencil = stencils.stencil(i).unwrap();
        assert_eq!(stencil.indices().len(), stencil.weights().len());
        assert_abs_diff_eq!(stencil.weights().iter().sum::<f32>(), 1.0, epsilon = 1.0e-5);
    }
    assert!(stencils.stencil(98).is_none());
}

#[test]
fn test_catmull_clark_points() {
    let mesh = subdivide(&cube(), &approximating(), 1);
    let positions = mesh.positions();

    // Coarse vertices keep their index.
    assert_point_eq(positions[0], [-5.0 / 18.0; 3]);
    // Edge point of the first edge, (0, 1).
    assert_point_eq(positions[8], [0.0, -0.375, -0.375]);
    // Face point of the first face.
    assert_point_eq(positions[20], [0.0, 0.0, -0.5]);
}

#[test]
fn test_limit_surface_projection() {
    let mesh = subdivide(&cube(), &ModifierConfig::default(), 1);
    assert_point_eq(mesh.positions()[0], [-0.25; 3]);
    for p in mesh.positions() {
        assert!(p.iter().all(|c| c.abs() < 0.5));
    }
}

#[test]
fn test_simple_subdivision_stays_on_cage() {
    let config = ModifierConfig {
        subdivision_type: SubdivisionType::Simple,
        ..Default::default()
    };
    let mesh = subdivide(&cube(), &config, 2);

    assert_eq!(mesh.face_count(), 96);
    assert_point_eq(mesh.positions()[0], [-0.5; 3]);
    for p in mesh.positions() {
        let max = p.iter().fold(0.0f32, |max, c| max.max(c.abs()));
        assert_abs_diff_eq!(max, 0.5, epsilon = 1.0e-6);
    }
}

#[test]
fn test_boundary_corners() {
    let smooth = subdivide(&quad(), &approximating(), 1);
    assert_point_eq(smooth.positions()[0], [0.125, 0.125, 0.0]);
    // Boundary edge points are midpoints.
    assert_point_eq(smooth.positions()[4], [0.5, 0.0, 0.0]);

    let config = ModifierConfig {
        boundary_smooth: BoundarySmooth::PreserveCorners,
        ..approximating()
    };
    let preserved = subdivide(&quad(), &config, 1);
    assert_point_eq(preserved.positions()[0], [0.0, 0.0, 0.0]);

    let config = ModifierConfig {
        boundary_smooth: BoundarySmooth::PreserveCorners,
        ..Default::default()
    };
    let limit = subdivide(&quad(), &config, 3);
    assert_point_eq(limit.positions()[2], [1.0, 1.0, 0.0]);
}

#[test]
fn test_creases() {
    let creased = cube()
        .with_creases(vec![EdgeCrease::new(0, 1, 1.0)])
        .unwrap();

    let sharp = subdivide(&creased, &approximating(), 1);
    assert_point_eq(sharp.positions()[8], [0.0, -0.5, -0.5]);

    let partial = cube()
        .with_creases(vec![EdgeCrease::new(0, 1, 0.3)])
        .unwrap();
    let blended = subdivide(&partial, &approximating(), 1);
    assert_point_eq(blended.positions()[8], [0.0, -0.4875, -0.4875]);

    let ignored = ModifierConfig {
        use_creases: false,
        ..approximating()
    };
    let smooth = subdivide(&creased, &ignored, 1);
    assert_point_eq(smooth.positions()[8], [0.0, -0.375, -0.375]);
}

#[test]
fn test_degenerate_topology_is_rejected() {
    let settings = SubdivSettings::new(&ModifierConfig::default(), 1);

    assert!(CpuBackend.build(&Mesh::default(), &settings).is_none());

    let two_sided = Mesh::new(vec![[0.0; 3], [1.0, 0.0, 0.0]], &[2], vec![0, 1]).unwrap();
    assert!(CpuBackend.build(&two_sided, &settings).is_none());

    let repeated = Mesh::new(
        vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
        &[4],
        vec![0, 1, 2, 1],
    )
    .unwrap();
    assert!(CpuBackend.build(&repeated, &settings).is_none());
}

#[test]
fn test_display_edges_follow_cage() {
    let mesh = subdivide(&cube(), &ModifierConfig::default(), 1);
    let display = mesh.display_edges().unwrap();
    assert_eq!(display.len(), 24);
    assert!(display.contains(&[0, 8]));

    let level_2 = subdivide(&cube(), &ModifierConfig::default(), 2);
    assert_eq!(level_2.display_edges().unwrap().len(), 48);

    let descriptor = CpuBackend
        .build(&cube(), &SubdivSettings::new(&ModifierConfig::default(), 1))
        .unwrap();
    let all_edges = CpuBackend
        .to_mesh(
            &descriptor,
            &ToMeshSettings {
                resolution: 3,
                use_optimal_display: false,
            },
            &cube(),
        )
        .unwrap();
    assert!(all_edges.display_edges().is_none());
}

#[test]
fn test_corner_layers_are_interpolated() {
    let mut mesh = quad();
    mesh.add_corner_layer(
        "uv",
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
    )
    .unwrap();

    let result = subdivide(&mesh, &ModifierConfig::default(), 1);
    let uv = result.corner_layer("uv").unwrap();
    assert_eq!(uv.len(), result.corner_count());
    assert_point_eq(uv[0], [0.0, 0.0, 0.0]);
    assert_point_eq(uv[1], [0.5, 0.0, 0.0]);
    assert_point_eq(uv[2], [0.5, 0.5, 0.0]);
    assert_point_eq(uv[3], [0.0, 0.5, 0.0]);
}

#[test]
fn test_ccg_grids() {
    let backend = CpuBackend;
    let mesh = cube();
    let descriptor = backend
        .build(&mesh, &SubdivSettings::new(&ModifierConfig::default(), 2))
        .unwrap();
    let result = backend
        .to_ccg(
            &descriptor,
            &ToCcgSettings {
                resolution: 5,
                need_normal: true,
                need_mask: false,
            },
            &mesh,
        )
        .unwrap();

    let grids = result.grids().unwrap();
    assert_eq!(grids.grid_size, 3);
    assert_eq!(grids.grid_count, 24);
    assert_eq!(grids.faces_per_grid(), 4);
    assert_eq!(grids.grid_faces(23), Some(92..96));
    assert_eq!(grids.grid_count * grids.faces_per_grid(), result.face_count());

    let normals = grids.vertex_normals.as_ref().unwrap();
    assert_eq!(normals.len(), result.vertex_count());
    normals.iter().for_each(|&n| assert_unit_length(n));
}

#[test]
fn test_deform_matches_limit_positions() {
    let backend = CpuBackend;
    let mesh = cube();
    let descriptor = backend
        .build(&mesh, &SubdivSettings::new(&ModifierConfig::default(), 1))
        .unwrap();

    let mut positions = mesh.positions().to_vec();
    backend.deform_coarse_vertices(&descriptor, &mesh, &mut positions);

    let limit = subdivide(&mesh, &ModifierConfig::default(), 1);
    for (deformed, expected) in positions.iter().zip(&limit.positions()[..8]) {
        assert_point_eq(*deformed, *expected);
    }

    // Wrong vertex count leaves positions alone.
    let mut short = vec![[1.0; 3]; 3];
    backend.deform_coarse_vertices(&descriptor, &mesh, &mut short);
    assert_eq!(short, vec![[1.0; 3]; 3]);
}

#[test]
fn test_reuse_rules() {
    let backend = CpuBackend;
    let config = ModifierConfig::default();
    let settings = SubdivSettings::new(&config, 1);
    let descriptor = backend.build(&cube(), &settings).unwrap();

    let mut moved = cube();
    moved.positions_mut()[0] = [-2.0; 3];
    assert!(backend.is_reusable(&descriptor, &moved, &settings));
    assert!(!backend.is_reusable(&descriptor, &quad(), &settings));
    assert!(!backend.is_reusable(&descriptor, &cube(), &SubdivSettings::new(&config, 2)));

    let creased = cube()
        .with_creases(vec![EdgeCrease::new(2, 3, 0.5)])
        .unwrap();
    assert!(!backend.is_reusable(&descriptor, &creased, &settings));

    let no_creases = SubdivSettings::new(
        &ModifierConfig {
            use_creases: false,
            ..config
        },
        1,
    );
    let descriptor = backend.build(&cube(), &no_creases).unwrap();
    assert!(backend.is_reusable(&descriptor, &creased, &no_creases));
}

#[test]
fn test_realizing_foreign_mesh_fails() {
    let backend = CpuBackend;
    let descriptor = backend
        .build(&cube(), &SubdivSettings::new(&ModifierConfig::default(), 1))
        .unwrap();

    let result = backend.to_mesh(
        &descriptor,
        &ToMeshSettings {
            resolution: 3,
            use_optimal_display: false,
        },
        &quad(),
    );
    assert!(matches!(
        result,
        Err(Error::DescriptorMismatch {
            expected: 8,
            actual: 4
        })
    ));
}
