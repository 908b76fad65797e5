//! End-to-end exports through the public API.

use glam::Vec3;
use scene_export::{
    export_document, load_document_from_str, status_line, Color, DrawCommand, Endcap, ExportFormat, OutputTarget,
    SceneContext, SceneDocument, SurfaceMesh,
};

const RED: Color = Color::rgb(255, 0, 0);

fn document(commands: Vec<DrawCommand>) -> SceneDocument {
    SceneDocument {
        context: SceneContext::default(),
        commands,
    }
}

fn export(format: ExportFormat, commands: Vec<DrawCommand>) -> String {
    export_document(format, OutputTarget::Buffer, &document(commands))
        .unwrap()
        .contents
        .unwrap()
}

fn bond(a: Vec3, b: Vec3) -> DrawCommand {
    DrawCommand::Bond {
        a,
        b,
        radius: 0.2,
        endcap: Endcap::None,
        color_a: RED,
        color_b: RED,
    }
}

#[test]
fn test_single_sphere_defined_once() {
    let atom = DrawCommand::Atom {
        center: Vec3::ZERO,
        radius: 1.0,
        color: RED,
    };

    let idtf = export(ExportFormat::Idtf, vec![atom.clone()]);
    assert_eq!(idtf.matches("MODEL_TYPE \"MESH\"").count(), 1);
    assert!(idtf.contains(
        "NODE_NAME \"Sphere_FFFF0000\"\nPARENT_LIST {\nPARENT_COUNT 1\nPARENT 0 {\nPARENT_NAME \"Scene\"\n\
         PARENT_TM {\n1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n}"
    ));

    let x3d = export(ExportFormat::X3d, vec![atom]);
    assert_eq!(x3d.matches("<Sphere ").count(), 1);
    assert!(x3d.contains("<Transform translation='0 0 0'>\n<Shape DEF='_0'><Sphere radius='1'/>"));
}

#[test]
fn test_identical_cylinders_share_a_definition() {
    let commands = vec![
        bond(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0)),
        bond(Vec3::new(3.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 2.0)),
    ];

    let idtf = export(ExportFormat::Idtf, commands.clone());
    assert_eq!(idtf.matches("RESOURCE_NAME \"Cylinder_Mesh\"\nMODEL_TYPE").count(), 1);
    assert_eq!(idtf.matches("RESOURCE_NAME \"Shader_FFFF0000\"").count(), 1);
    assert!(idtf.contains("NODE_NAME \"Cylinder_FFFF0000\"\nPARENT_LIST {\nPARENT_COUNT 2\n"));
    assert!(idtf.contains("0 0 0 1\n}"));
    assert!(idtf.contains("3 0 0 1\n}"));

    let x3d = export(ExportFormat::X3d, commands);
    assert_eq!(x3d.matches("<Cylinder ").count(), 1);
    assert_eq!(x3d.matches("<Material ").count(), 1);
    assert_eq!(x3d.matches("<Shape USE=").count(), 1);
}

#[test]
fn test_quad_surface_splits_on_diagonal() {
    let quad = || {
        DrawCommand::Surface(SurfaceMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![vec![0, 1, 2, 3]],
            RED,
        ))
    };

    let x3d = export(ExportFormat::X3d, vec![quad()]);
    assert!(x3d.contains("coordIndex='\n0 1 2 -1\n0 2 3 -1\n'"));

    let tachyon = export(ExportFormat::Tachyon, vec![quad()]);
    assert!(tachyon.contains("TriMesh 2\n0 1 2\n0 2 3\n"));

    let idtf = export(ExportFormat::Idtf, vec![quad()]);
    assert!(idtf.contains("FACE_COUNT 2\n"));
    assert!(idtf.contains("MESH_FACE_POSITION_LIST { 0 1 2 0 2 3 }"));
}

#[test]
fn test_zero_radius_writes_nothing() {
    let degenerate = vec![
        DrawCommand::Atom {
            center: Vec3::ZERO,
            radius: 0.0,
            color: RED,
        },
        DrawCommand::Bond {
            a: Vec3::ZERO,
            b: Vec3::X,
            radius: 0.0,
            endcap: Endcap::Flat,
            color_a: RED,
            color_b: RED,
        },
        DrawCommand::Sphere {
            center: Vec3::new(250.0, 250.0, 750.0),
            diameter: 0.0,
            color: RED,
        },
    ];
    for format in ExportFormat::ALL {
        let empty = export(format, vec![]);
        let with_degenerate = export(format, degenerate.clone());
        assert_eq!(empty, with_degenerate, "{}", format);
    }
}

#[test]
fn test_offscreen_quads_write_nothing() {
    let off = |x: f32| {
        [
            Vec3::new(x, 10.0, 750.0),
            Vec3::new(x + 20.0, 10.0, 750.0),
            Vec3::new(x + 20.0, 30.0, 750.0),
            Vec3::new(x, 30.0, 750.0),
        ]
    };
    let [a, b, c, d] = off(-100.0);
    let commands = vec![
        DrawCommand::Quad { a, b, c, d, color: RED },
        DrawCommand::LabelBackground {
            corners: off(900.0),
            color: RED,
        },
    ];
    assert_eq!(
        export(ExportFormat::Tachyon, vec![]),
        export(ExportFormat::Tachyon, commands)
    );
}

#[test]
fn test_document_from_json() {
    let json = r##"{
        "context": {"title": "water"},
        "commands": [
            {"kind": "atom", "center": [0, 0, 0], "radius": 0.7, "color": "#FF0000"},
            {"kind": "atom", "center": [0.96, 0, 0], "radius": 0.5, "color": "#FFFFFF"},
            {"kind": "bond", "a": [0, 0, 0], "b": [0.96, 0, 0], "radius": 0.15,
             "color_a": "#FF0000", "color_b": "#FFFFFF"}
        ]
    }"##;
    let doc = load_document_from_str(json).unwrap();
    assert_eq!(doc.commands.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("water.x3d");
    let result = export_document(ExportFormat::X3d, OutputTarget::file(&path), &doc);
    let line = status_line(&result);
    assert!(line.starts_with("OK "), "{}", line);
    assert!(line.ends_with("water.x3d"), "{}", line);
    let x3d = std::fs::read_to_string(&path).unwrap();
    assert!(x3d.contains("content='water'"));
}
