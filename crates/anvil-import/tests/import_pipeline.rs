use anvil_core::DiagnosticKind;
use anvil_import::{import_xmodel, ImportOptions, COLOR_LAYER, UV_LAYER};
use anvil_scene::{MaterialId, Scene};
use glam::Vec2;
use std::path::{Path, PathBuf};

/// Double-sided quad: two front faces and their reversed twins
const GUN: &str = r#"// Export filename: 'gun.xmodel_export'
MODEL
VERSION 6

NUMBONES 2
BONE 0 -1 "tag_origin"
BONE 1 0 "J_Gun"

BONE 0
OFFSET 0.000000, 0.000000, 0.000000
X 1.000000, 0.000000, 0.000000
Y 0.000000, 1.000000, 0.000000
Z 0.000000, 0.000000, 1.000000

BONE 1
OFFSET 0.000000, 0.000000, 1.000000
X 1.000000, 0.000000, 0.000000
Y 0.000000, 1.000000, 0.000000
Z 0.000000, 0.000000, 1.000000

NUMVERTS 4
VERT 0
OFFSET 0.000000, 0.000000, 0.000000
BONES 1
BONE 1 1.000000
VERT 1
OFFSET 1.000000, 0.000000, 0.000000
BONES 1
BONE 1 1.000000
VERT 2
OFFSET 1.000000, 1.000000, 0.000000
BONES 2
BONE 0 0.250000
BONE 1 0.750000
VERT 3
OFFSET 0.000000, 1.000000, 0.000000
BONES 1
BONE 1 1.000000

NUMFACES 4
TRI 0 0 0 0
VERT 0
NORMAL 0.000000 0.000000 1.000000
COLOR 1.000000 0.000000 0.000000 1.000000
UV 1 0.000000 0.250000
VERT 1
NORMAL 0.000000 0.000000 1.000000
COLOR 1.000000 0.000000 0.000000 1.000000
UV 1 1.000000 0.250000
VERT 2
NORMAL 0.000000 0.000000 1.000000
COLOR 1.000000 0.000000 0.000000 1.000000
UV 1 1.000000 0.000000
TRI 0 0 0 0
VERT 0
NORMAL 0.000000 0.000000 1.000000
UV 1 0.000000 0.250000
VERT 2
NORMAL 0.000000 0.000000 1.000000
UV 1 1.000000 0.000000
VERT 3
NORMAL 0.000000 0.000000 1.000000
UV 1 0.000000 0.000000
TRI 0 2 0 0
VERT 2
NORMAL 0.000000 0.000000 -1.000000
UV 1 1.000000 0.000000
VERT 1
NORMAL 0.000000 0.000000 -1.000000
UV 1 1.000000 0.250000
VERT 0
NORMAL 0.000000 0.000000 -1.000000
UV 1 0.000000 0.250000
TRI 0 2 0 0
VERT 3
NORMAL 0.000000 0.000000 -1.000000
UV 1 0.000000 0.000000
VERT 2
NORMAL 0.000000 0.000000 -1.000000
UV 1 1.000000 0.000000
VERT 0
NORMAL 0.000000 0.000000 -1.000000
UV 1 0.000000 0.250000

NUMOBJECTS 1
OBJECT 0 "gun"

NUMMATERIALS 3
MATERIAL 0 "mtl_gun" "Lambert" "color:images\gun_c.png"
COLOR 0.000000 0.000000 0.000000 1.000000
MATERIAL 1 "mtl_unused" "Lambert" "unknown"
MATERIAL 2 "mtl_back" "Lambert" "color:GUN_C.png"
"#;

const HANDS: &str = r#"MODEL
VERSION 7

NUMBONES 2
BONE 0 -1 "tag_origin"
BONE 1 0 "tag_weapon"

BONE 0
OFFSET 0.000000, 0.000000, 0.000000
X 1.000000, 0.000000, 0.000000
Y 0.000000, 1.000000, 0.000000
Z 0.000000, 0.000000, 1.000000

BONE 1
OFFSET 0.000000, 0.000000, 10.000000
X 1.000000, 0.000000, 0.000000
Y 0.000000, 1.000000, 0.000000
Z 0.000000, 0.000000, 1.000000

NUMVERTS 3
VERT 0
OFFSET 0.000000, 0.000000, 0.000000
BONES 1
BONE 0 1.000000
VERT 1
OFFSET 1.000000, 0.000000, 0.000000
BONES 1
BONE 0 1.000000
VERT 2
OFFSET 0.000000, 1.000000, 0.000000
BONES 1
BONE 1 1.000000

NUMFACES 1
TRI 0 0 0 0
VERT 0
NORMAL 0.000000 0.000000 1.000000
UV 1 0.000000 0.000000
VERT 1
NORMAL 0.000000 0.000000 1.000000
UV 1 1.000000 0.000000
VERT 2
NORMAL 0.000000 0.000000 1.000000
UV 1 0.000000 1.000000

NUMOBJECTS 1
OBJECT 0 "hands"

NUMMATERIALS 1
MATERIAL 0 "mtl_hands" "Lambert" "unknown"
"#;

fn write_assets(dir: &Path) -> (PathBuf, PathBuf) {
    let images = dir.join("images");
    std::fs::create_dir_all(&images).unwrap();
    image::RgbImage::new(8, 4)
        .save(images.join("gun_c.png"))
        .unwrap();

    let gun = dir.join("gun.xmodel_export");
    let hands = dir.join("hands.xmodel_export");
    std::fs::write(&gun, GUN).unwrap();
    std::fs::write(&hands, HANDS).unwrap();
    (gun, hands)
}

fn material_names(scene: &Scene, slots: &[Option<MaterialId>]) -> Vec<String> {
    slots
        .iter()
        .map(|slot| scene.materials.get(slot.unwrap()).unwrap().name.clone())
        .collect()
}

#[test]
fn double_sided_gun_imports_with_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let (gun, _) = write_assets(dir.path());
    let mut scene = Scene::new();

    let report = import_xmodel(&mut scene, &gun, &ImportOptions::default()).unwrap();
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let obj = scene.get(report.meshes[0].object).unwrap();
    let mesh = obj.mesh().unwrap();
    assert_eq!(mesh.vertices.len(), 8);
    assert_eq!(mesh.faces.len(), 4);
    assert_eq!(report.meshes[0].stats.duplicate_vertices, 4);
    for face in &mesh.faces {
        let [a, b, c] = face.vertices;
        assert!(a != b && b != c && a != c);
    }

    // mtl_unused is compacted away, the remaining slots keep their order
    assert_eq!(material_names(&scene, &mesh.materials), vec!["mtl_gun", "mtl_back"]);
    let indices: Vec<u16> = mesh.faces.iter().map(|f| f.material_index).collect();
    assert_eq!(indices, vec![0, 0, 1, 1]);

    // First loop is corner 0 of the first face: UV (0, 0.25) flipped
    let uvs = &mesh.uv_layer(UV_LAYER).unwrap().data;
    assert!((uvs[0] - Vec2::new(0.0, 0.75)).length() < 1e-6);
    assert_eq!(mesh.color_layer(COLOR_LAYER).unwrap().data[0], [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(mesh.custom_normals.as_ref().unwrap().len(), 12);

    // Duplicates carry their source vertex weights
    assert_eq!(mesh.vertex_weights(2).len(), 2);
    let dup_of_2 = mesh
        .faces
        .iter()
        .skip(2)
        .flat_map(|f| f.vertices)
        .find(|&v| mesh.vertices[v as usize] == mesh.vertices[2])
        .unwrap();
    assert_eq!(mesh.vertex_weights(dup_of_2 as usize), mesh.vertex_weights(2));

    // Both materials point at the same image, found under images/
    assert_eq!(scene.images.len(), 1);
    let (_, image) = scene.images.iter().next().unwrap();
    assert_eq!(image.size, Some((8, 4)));
    assert_eq!(report.color_images[0], report.color_images[2]);
    assert_eq!(report.color_images[1], None);

    let skel = scene.get(report.skeleton.unwrap()).unwrap();
    let arm = skel.armature().unwrap();
    assert_eq!(skel.name, "gun_skel");
    assert_eq!(arm.find_bone("j_gun").unwrap().parent, arm.find("tag_origin"));
    assert_eq!(obj.vertex_groups, vec!["tag_origin", "j_gun"]);
}

#[test]
fn disabling_dup_tris_drops_back_faces() {
    let dir = tempfile::tempdir().unwrap();
    let (gun, _) = write_assets(dir.path());
    let mut scene = Scene::new();
    let options = ImportOptions {
        use_dup_tris: false,
        ..Default::default()
    };

    let report = import_xmodel(&mut scene, &gun, &options).unwrap();
    let mesh = scene.get(report.meshes[0].object).unwrap().mesh().unwrap();
    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.faces.len(), 2);
    assert_eq!(material_names(&scene, &mesh.materials), vec!["mtl_gun"]);

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Geometry);
    assert!(report.warning_summary().unwrap().contains("Dropped 2"));
}

#[test]
fn importing_twice_creates_independent_objects() {
    let dir = tempfile::tempdir().unwrap();
    let (gun, _) = write_assets(dir.path());
    let mut scene = Scene::new();

    let first = import_xmodel(&mut scene, &gun, &ImportOptions::default()).unwrap();
    let second = import_xmodel(&mut scene, &gun, &ImportOptions::default()).unwrap();

    assert_eq!(first.meshes[0].name, "gun");
    assert_eq!(second.meshes[0].name, "gun.001");
    assert_ne!(first.meshes[0].object, second.meshes[0].object);
    assert_eq!(first.source_hash, second.source_hash);

    let a = scene.get(first.meshes[0].object).unwrap().mesh().unwrap();
    let b = scene.get(second.meshes[0].object).unwrap().mesh().unwrap();
    assert_eq!(a.vertices, b.vertices);
    assert_eq!(a.faces, b.faces);
    assert_eq!(a.materials, b.materials);

    // Materials already in the scene are reused, images are not reloaded
    assert_eq!(scene.materials.len(), 3);
    assert_eq!(scene.images.len(), 1);
    assert_eq!(
        second
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Material)
            .count(),
        3
    );
}

#[test]
fn gun_attaches_to_active_hands() {
    let dir = tempfile::tempdir().unwrap();
    let (gun, hands) = write_assets(dir.path());
    let mut scene = Scene::new();

    let hands_report = import_xmodel(&mut scene, &hands, &ImportOptions::default()).unwrap();
    let hands_skel = hands_report.skeleton.unwrap();
    assert_eq!(scene.active(), Some(hands_skel));

    let options = ImportOptions {
        attach_model: true,
        ..Default::default()
    };
    let report = import_xmodel(&mut scene, &gun, &options).unwrap();
    assert_eq!(report.attached_to.as_deref(), Some("tag_origin"));

    let gun_skel = scene.get(report.skeleton.unwrap()).unwrap();
    assert_eq!(gun_skel.parent, Some(hands_skel));
    assert_eq!(gun_skel.parent_bone.as_deref(), Some("tag_origin"));
}

#[test]
fn gun_merges_into_hands_skeleton() {
    let dir = tempfile::tempdir().unwrap();
    let (gun, hands) = write_assets(dir.path());
    let mut scene = Scene::new();

    let hands_report = import_xmodel(&mut scene, &hands, &ImportOptions::default()).unwrap();
    let hands_skel = hands_report.skeleton.unwrap();

    let options = ImportOptions {
        attach_model: true,
        merge_skeleton: true,
        ..Default::default()
    };
    let report = import_xmodel(&mut scene, &gun, &options).unwrap();

    let merge = report.merge.clone().unwrap();
    assert_eq!(merge.bones_merged, 1);
    assert_eq!(merge.meshes_moved, 1);
    assert_eq!(report.skeleton, Some(hands_skel));
    assert!(scene.find_by_name("gun_skel").is_none());
    assert_eq!(scene.active(), Some(hands_skel));

    let arm = scene.get(hands_skel).unwrap().armature().unwrap();
    let names: Vec<&str> = arm.bones().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["tag_origin", "tag_weapon", "j_gun"]);
    assert_eq!(arm.find_bone("j_gun").unwrap().parent, arm.find("tag_weapon"));

    let gun_mesh = scene.get(report.meshes[0].object).unwrap();
    assert_eq!(gun_mesh.parent, Some(hands_skel));
    assert_eq!(gun_mesh.skin.map(|s| s.target), Some(hands_skel));
    assert_eq!(scene.skinned_by(hands_skel).len(), 2);
}
