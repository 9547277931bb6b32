//! Integration tests for encoding models and decoding them back.

use glam::{Vec2, Vec3};
use mod3::export::{encode, BoundsMode, ExportOptions};
use mod3::format::{Header, HEADER_SIZE, REGION_ALIGNMENT};
use mod3::import::{decode, ImportOptions};
use mod3::model::{
    Bone, BoundingBox, GroupFunction, MaterialSlot, MeshPart, Model, ReferenceKind, Skeleton,
    Transform, Vertex,
};
use mod3::stream::{ByteReader, ByteWriter};
use mod3::util::BBox3f;
use mod3::weights::WeightScheme;
use mod3::ErrorKind;

/// Two-bone skeleton with one weighted triangle spanning x in [-1, 2].
fn skinned_triangle() -> Model {
    let skeleton = Skeleton::from_bones(vec![
        Bone::new(0, None, Transform::default()),
        Bone::new(1, Some(0), Transform::from_translation(Vec3::new(0.0, 1.0, 0.0))),
    ])
    .expect("valid skeleton");

    let n = Vec3::Z;
    let part = MeshPart {
        lod: 1,
        group_id: 3,
        material: 0,
        ..MeshPart::new(
            vec![
                Vertex::new(Vec3::new(-1.0, 0.0, 0.0))
                    .with_normal(n)
                    .with_uv(Vec2::new(0.0, 0.0))
                    .with_weight(0, 1.0),
                Vertex::new(Vec3::new(2.0, 0.0, 0.0))
                    .with_normal(n)
                    .with_uv(Vec2::new(1.0, 0.0))
                    .with_weight(0, 0.75)
                    .with_weight(1, 0.25),
                Vertex::new(Vec3::new(0.0, 1.0, 0.0))
                    .with_normal(n)
                    .with_uv(Vec2::new(0.5, 1.0))
                    .with_weight(1, 1.0),
            ],
            vec![0, 1, 2],
        )
    };

    Model {
        skeleton: Some(skeleton),
        mesh_parts: vec![part],
        materials: vec![MaterialSlot::new("pl000_body")],
        ..Model::default()
    }
}

fn unweighted_quad(lod: u32) -> MeshPart {
    MeshPart {
        lod,
        ..MeshPart::new(
            vec![
                Vertex::new(Vec3::new(0.0, 0.0, 0.0)).with_normal(Vec3::Y),
                Vertex::new(Vec3::new(1.0, 0.0, 0.0)).with_normal(Vec3::Y),
                Vertex::new(Vec3::new(1.0, 0.0, 1.0)).with_normal(Vec3::Y),
                Vertex::new(Vec3::new(0.0, 0.0, 1.0)).with_normal(Vec3::Y),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }
}

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

#[test]
fn test_roundtrip_group_weights() {
    let model = skinned_triangle();
    let encoded = encode(&model, &ExportOptions::default()).expect("encode");
    assert!(!encoded.report.has_errors());

    let decoded = decode(&encoded.bytes, &ImportOptions::everything()).expect("decode");
    assert_eq!(decoded.mesh_parts.len(), 1);
    assert_eq!(decoded.num_bones(), 2);
    assert_eq!(decoded.materials[0].name, "pl000_body");

    let original = &model.mesh_parts[0];
    let part = &decoded.mesh_parts[0];
    assert_eq!(part.indices, original.indices);
    assert_eq!(part.group_id, 3);
    assert_eq!(part.num_vertices(), 3);

    for (a, b) in original.vertices.iter().zip(&part.vertices) {
        assert_eq!(a.position, b.position);
        let n = b.normal.expect("normal stream");
        assert!(n.abs_diff_eq(Vec3::Z, 0.01), "normal {:?}", n);
        assert!(a.uvs[0].abs_diff_eq(b.uvs[0], 1e-3));

        // Same bones, same weights within half-float precision, heaviest first
        assert_eq!(a.weights.len(), b.weights.len());
        let mut expected = a.weights.to_vec();
        expected.sort_by(|x, y| y.weight.total_cmp(&x.weight));
        for (x, y) in expected.iter().zip(&b.weights) {
            assert_eq!(x.bone, y.bone);
            assert!(approx(x.weight, y.weight, 1e-3));
        }
    }

    let bone = &decoded.skeleton.as_ref().expect("skeleton").bones()[1];
    assert_eq!(bone.parent, Some(0));
    assert!(bone.local.translation.abs_diff_eq(Vec3::Y, 1e-5));
}

#[test]
fn test_lod_rewritten_on_export() {
    let model = skinned_triangle();
    let encoded = encode(&model, &ExportOptions::default()).expect("encode");
    let decoded = decode(&encoded.bytes, &ImportOptions::everything()).expect("decode");
    assert_eq!(decoded.mesh_parts[0].lod, 0);

    let encoded = encode(&model, &ExportOptions::preserving()).expect("encode");
    let decoded = decode(&encoded.bytes, &ImportOptions::everything()).expect("decode");
    assert_eq!(decoded.mesh_parts[0].lod, 1);
}

#[test]
fn test_only_highest_lod() {
    let skeleton = Skeleton::from_bones(vec![
        Bone::new(10, None, Transform::default()),
        Bone::new(11, Some(0), Transform::from_translation(Vec3::Y)),
        Bone::new(12, Some(1), Transform::from_translation(Vec3::Y)),
    ])
    .expect("valid skeleton");
    let weighted = |lod: u32, bone: u16| {
        let mut part = unweighted_quad(lod);
        for v in &mut part.vertices {
            *v = v.clone().with_weight(bone, 1.0);
        }
        part
    };
    let model = Model {
        skeleton: Some(skeleton),
        mesh_parts: vec![weighted(1, 2), weighted(0, 1), weighted(1, 0)],
        materials: vec![MaterialSlot::new("floor")],
        ..Model::default()
    };
    let encoded = encode(&model, &ExportOptions::preserving()).expect("encode");

    let all = decode(&encoded.bytes, &ImportOptions::everything()).expect("decode");
    assert_eq!(all.mesh_parts.len(), 3);

    let options = ImportOptions {
        only_highest_lod: true,
        ..ImportOptions::everything()
    };
    let highest = decode(&encoded.bytes, &options).expect("decode");
    assert_eq!(highest.mesh_parts.len(), 1);
    let kept = &highest.mesh_parts[0];
    assert_eq!(kept.lod, 0);

    // Dropped parts leave the bone table and its numbering alone
    let skeleton = highest.skeleton.as_ref().expect("skeleton");
    assert_eq!(skeleton.len(), 3);
    assert_eq!(kept.referenced_bones().into_iter().collect::<Vec<_>>(), vec![1]);
    assert_eq!(skeleton.get(1).map(|b| b.function), Some(11));
    assert!(highest.unresolved.is_empty());
}

#[test]
fn test_calculated_bounds_cover_part() {
    let encoded = encode(&skinned_triangle(), &ExportOptions::default()).expect("encode");
    let decoded = decode(&encoded.bytes, &ImportOptions::everything()).expect("decode");

    let part = &decoded.mesh_parts[0];
    assert_eq!(part.bounding_boxes.len(), 1);
    let b = &decoded.bounding_boxes[part.bounding_boxes[0]];
    assert_eq!(b.bounds.min.x, -1.0);
    assert_eq!(b.bounds.max.x, 2.0);
    assert_eq!(b.bounds.max.y, 1.0);
    // Bone 0 carries 1.75 of the part's weight, bone 1 carries 1.25
    assert_eq!(b.bone, Some(0));

    let header = decoded.header.expect("header properties");
    let min = header.iter().find(|p| p.key == "boundingBoxMin").expect("bbox min");
    assert_eq!(min.value, mod3::format::HeaderValue::Vector(vec![-1.0, 0.0, 0.0, 0.0]));
}

#[test]
fn test_explicit_bounds_and_groups_preserved() {
    let mut model = skinned_triangle();
    let bounds = BBox3f::new(Vec3::new(-5.0, -5.0, -5.0), Vec3::new(5.0, 5.0, 5.0));
    model.bounding_boxes = vec![
        BoundingBox { bone: Some(1), bounds },
        BoundingBox { bone: None, bounds },
    ];
    model.mesh_parts[0].bounding_boxes = vec![1, 0];
    model.group_functions = vec![GroupFunction { group_id: 7, bounds }];

    let options = ExportOptions {
        bounding_box: BoundsMode::Explicit,
        ..ExportOptions::default()
    };
    let encoded = encode(&model, &options).expect("encode");
    let decoded = decode(&encoded.bytes, &ImportOptions::everything()).expect("decode");

    let boxes: Vec<_> = decoded.mesh_parts[0]
        .bounding_boxes
        .iter()
        .map(|&i| decoded.bounding_boxes[i])
        .collect();
    assert_eq!(boxes, vec![model.bounding_boxes[1], model.bounding_boxes[0]]);
    assert_eq!(decoded.group_functions, model.group_functions);
}

#[test]
fn test_omit_unused_groups() {
    let mut model = skinned_triangle();
    let bounds = BBox3f::new(Vec3::ZERO, Vec3::ONE);
    model.skeleton = Skeleton::from_bones(vec![
        Bone::new(0, None, Transform::default()),
        Bone::new(1, Some(0), Transform::default()),
        Bone::new(2, Some(0), Transform::default()),
    ])
    .ok();
    model.bounding_boxes = vec![
        BoundingBox { bone: Some(0), bounds },
        BoundingBox { bone: Some(2), bounds },
    ];
    model.mesh_parts[0].bounding_boxes = vec![0, 1];

    let options = ExportOptions::preserving();
    let encoded = encode(&model, &options).expect("encode");

    let kept = decode(&encoded.bytes, &ImportOptions::everything()).expect("decode");
    assert_eq!(kept.bounding_boxes.len(), 2);

    let import = ImportOptions {
        omit_unused_groups: true,
        ..ImportOptions::everything()
    };
    let omitted = decode(&encoded.bytes, &import).expect("decode");
    assert_eq!(omitted.bounding_boxes.len(), 1);
    assert_eq!(omitted.bounding_boxes[0].bone, Some(0));
    assert_eq!(omitted.mesh_parts[0].bounding_boxes, vec![0]);
}

#[test]
fn test_signed_scheme_keeps_negative_weight() {
    let mut model = skinned_triangle();
    model.mesh_parts[0].vertices[0].weights.clear();
    let v = &mut model.mesh_parts[0].vertices[0];
    *v = v.clone().with_weight(0, 0.6).with_weight(0, -0.9).with_weight(1, 1.3);

    let options = ExportOptions::default().with_weights(WeightScheme::Signed);
    let encoded = encode(&model, &options).expect("encode");
    let import = ImportOptions::everything().with_weights(WeightScheme::Signed);
    let decoded = decode(&encoded.bytes, &import).expect("decode");

    let w = &decoded.mesh_parts[0].vertices[0].weights;
    assert_eq!(w.len(), 2);
    assert_eq!(w[0].bone, 1);
    assert_eq!(w[1].bone, 0);
    assert!(approx(w[1].weight, -0.3, 1e-3));
}

#[test]
fn test_trailing_bytes_preserved() {
    let mut model = skinned_triangle();
    model.trailing = b"MOD3 trailer".to_vec();
    let encoded = encode(&model, &ExportOptions::default()).expect("encode");
    let decoded = decode(&encoded.bytes, &ImportOptions::everything()).expect("decode");
    assert_eq!(decoded.trailing, model.trailing);
}

#[test]
fn test_region_layout() {
    let encoded = encode(&skinned_triangle(), &ExportOptions::default()).expect("encode");
    let header = Header::read(&mut ByteReader::new(&encoded.bytes)).expect("header");

    let o = header.offsets;
    let regions = [o.bones, o.groups, o.materials, o.meshes, o.vertices, o.faces, o.trailing];
    assert!(regions[0] >= HEADER_SIZE as u64);
    for pair in regions.windows(2) {
        assert!(pair[0] <= pair[1], "regions out of order: {:?}", regions);
    }
    for offset in regions {
        assert_eq!(offset % REGION_ALIGNMENT, 0);
    }
    assert_eq!(header.bone_count, 2);
    assert_eq!(header.mesh_count, 1);
    assert_eq!(header.vertex_count, 3);
    assert_eq!(header.index_count, 3);
    assert_eq!(o.trailing, encoded.bytes.len() as u64);
}

#[test]
fn test_truncated_bone_table() {
    let encoded = encode(&skinned_triangle(), &ExportOptions::default()).expect("encode");
    let mut header = Header::read(&mut ByteReader::new(&encoded.bytes)).expect("header");

    // Claim far more bones than the file holds
    header.bone_count = 200;
    let mut w = ByteWriter::new();
    header.write(&mut w).expect("header write");
    let mut bytes = encoded.bytes.clone();
    bytes[..HEADER_SIZE].copy_from_slice(&w.into_inner()[..HEADER_SIZE]);

    let err = decode(&bytes, &ImportOptions::everything()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);

    // Cutting the file inside the bone region fails the same way
    let cut = &encoded.bytes[..header.offsets.bones as usize + 16];
    let err = decode(cut, &ImportOptions::everything()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

/// Encode `model` and patch the bytes in place before decoding.
fn patched(model: &Model, patch: impl FnOnce(&Header, &mut Vec<u8>)) -> Vec<u8> {
    let encoded = encode(model, &ExportOptions::default()).expect("encode");
    let header = Header::read(&mut ByteReader::new(&encoded.bytes)).expect("header");
    let mut bytes = encoded.bytes;
    patch(&header, &mut bytes);
    bytes
}

#[test]
fn test_dangling_pair_is_recorded() {
    let mut model = skinned_triangle();
    if let Some(skeleton) = model.skeleton.as_mut() {
        *skeleton = Skeleton::from_bones(vec![
            Bone::new(0, None, Transform::default()),
            Bone {
                pair: Some(0),
                ..Bone::new(1, Some(0), Transform::from_translation(Vec3::Y))
            },
        ])
        .expect("valid skeleton");
    }
    // Bone 1's pair byte points past the two-bone table
    let bytes = patched(&model, |header, bytes| {
        bytes[header.offsets.bones as usize + 24 + 3] = 7;
    });

    let decoded = decode(&bytes, &ImportOptions::everything()).expect("decode");
    let skeleton = decoded.skeleton.as_ref().expect("skeleton");
    assert_eq!(skeleton.len(), 2);
    assert_eq!(skeleton.get(1).and_then(|b| b.pair), None);
    assert_eq!(decoded.mesh_parts.len(), 1);

    assert_eq!(decoded.unresolved.len(), 1);
    assert_eq!(decoded.unresolved[0].kind, ReferenceKind::Bone);
    assert_eq!(decoded.unresolved[0].index, 7);
}

#[test]
fn test_wide_box_bone_is_recorded() {
    let bytes = patched(&skinned_triangle(), |header, bytes| {
        // First box record sits right after the mesh table
        let at = header.offsets.meshes as usize + header.mesh_count as usize * 48;
        bytes[at..at + 4].copy_from_slice(&0x10000u32.to_le_bytes());
    });

    let decoded = decode(&bytes, &ImportOptions::everything()).expect("decode");
    assert_eq!(decoded.bounding_boxes.len(), 1);
    assert_eq!(decoded.bounding_boxes[0].bone, None);
    assert_eq!(decoded.bounding_boxes[0].bounds.max.x, 2.0);

    let bones: Vec<_> = decoded
        .unresolved
        .iter()
        .filter(|r| r.kind == ReferenceKind::Bone)
        .collect();
    assert_eq!(bones.len(), 1);
    assert_eq!(bones[0].index, 0x10000);

    // Decoded models with dangling bones still refuse to encode
    let mut model = decoded.clone();
    model.bounding_boxes[0].bone = Some(9);
    let strict = ExportOptions {
        bounding_box: BoundsMode::Explicit,
        ..ExportOptions::default()
    };
    assert_eq!(encode(&model, &strict).unwrap_err().kind(), ErrorKind::Reference);
}

#[test]
fn test_empty_input_is_format_error() {
    let err = decode(&[], &ImportOptions::everything()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}
