use cgmath::{Deg, Point3, Quaternion, Rotation3, SquareMatrix, Vector3, Vector4};
use scene_viewer::{
    bootstrap,
    data_structures::{
        instance::{InstanceRaw, Transform},
        model::{Color, Geometry, StandardMaterial},
        scene_graph::{Mesh, Node, Scene},
    },
    pipelines::light::LightUniform,
};

fn unit_mesh() -> Mesh {
    Mesh::new(Geometry::cuboid(1.0, 1.0, 1.0), StandardMaterial::default())
}

#[test]
fn should_compose_world_transforms() {
    let mut scene = Scene::new();
    let mut parent =
        Node::group("parent").with_transform(Transform::from_position(1.0, 0.0, 0.0));
    parent.add_child(
        Node::mesh("child", unit_mesh()).with_transform(Transform::from_position(0.0, 2.0, 0.0)),
    );
    scene.add(parent);

    let mut worlds = Vec::new();
    scene.visit_meshes(|_, world| worlds.push(world));
    assert_eq!(worlds.len(), 1);
    let origin = worlds[0] * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert_eq!(origin.truncate(), Vector3::new(1.0, 2.0, 0.0));
}

#[test]
fn should_compose_rotated_child_under_stretched_parent() {
    let mut parent = Node::group("stretched");
    parent.transform.scale = Vector3::new(2.0, 1.0, 1.0);
    let mut child = Node::mesh("turned", unit_mesh());
    child.transform.rotation = Quaternion::from_angle_z(Deg(90.0));
    let expected = parent.transform.to_matrix() * child.transform.to_matrix();
    parent.add_child(child);
    let mut scene = Scene::new();
    scene.add(parent);

    let mut worlds = Vec::new();
    scene.visit_meshes(|_, world| worlds.push(world));
    assert_eq!(worlds, vec![expected]);

    // the child's rotation happens before the parent's stretch along X
    let p = worlds[0] * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert!(p.x.abs() < 1e-5 && (p.y - 1.0).abs() < 1e-5 && p.z.abs() < 1e-5, "{:?}", p);
}

#[test]
fn should_rotate_ground_into_xz_plane() {
    let scene = bootstrap::base_scene();
    let mut normal = None;
    scene.visit_meshes(|mesh, world| {
        let n: Vector3<f32> = mesh.geometry.vertices[0].normal.into();
        normal = Some((world * n.extend(0.0)).truncate());
    });
    let normal = normal.expect("ground mesh");
    assert!(normal.x.abs() < 1e-5);
    assert!((normal.y - 1.0).abs() < 1e-5);
    assert!(normal.z.abs() < 1e-5);
}

#[test]
fn should_pack_clamped_material_into_instance() {
    let material = StandardMaterial {
        color: Color::new(0.5, 0.25, 1.0),
        metalness: 1.5,
        roughness: -0.5,
        map: None,
    };
    let raw = InstanceRaw::new(cgmath::Matrix4::identity(), &material, true);
    let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&raw));

    assert_eq!(floats.len(), 33);
    assert_eq!(&floats[25..29], &[0.5, 0.25, 1.0, 1.0]);
    assert_eq!(&floats[29..33], &[1.0, 0.0, 1.0, 0.0]);
    assert_eq!(raw.model(), cgmath::Matrix4::identity());
}

#[test]
fn should_premultiply_light_intensity() {
    let scene = bootstrap::base_scene();
    let uniform = LightUniform::from_scene(&scene);

    assert_eq!(uniform.ambient, [0.4, 0.4, 0.4, 0.0]);
    assert_eq!(uniform.color, [0.6, 0.6, 0.6, 1.0]);
    assert_eq!(uniform.direction[3], 1.0);
    assert_eq!(uniform.environment[0], 0.0);
    assert_eq!(uniform.environment[2], 1.0 / 1024.0);

    let to_light = Point3::new(5.0f32, 10.0, 7.0) - Point3::new(0.0, 0.0, 0.0);
    let len = (to_light.x * to_light.x + to_light.y * to_light.y + to_light.z * to_light.z).sqrt();
    assert!((uniform.direction[0] - to_light.x / len).abs() < 1e-6);
}

#[test]
fn should_leave_lights_dark_in_empty_scene() {
    let uniform = LightUniform::from_scene(&Scene::default());
    assert_eq!(uniform.color[3], 0.0);
    assert_eq!(uniform.ambient, [0.0; 4]);
}
