//! Vertex stream codec.
//!
//! A vertex is laid out as position, then the optional streams in blocktype
//! order. Weight slots store bone bytes first, then half-float weights; a slot
//! whose weight is zero is empty.

use glam::{Vec2, Vec3, Vec4};

use super::blocktype::Blocktype;
use crate::model::{Vertex, WeightBinding};
use crate::stream::{ByteReader, ByteWriter, Endian};
use crate::util::{from_snorm8, to_snorm8, Error, Result};

fn read_snorm4(r: &mut ByteReader<'_>) -> Result<Vec4> {
    let mut v = [0f32; 4];
    for c in &mut v {
        *c = from_snorm8(r.read_i8()?);
    }
    Ok(Vec4::from_array(v))
}

fn write_snorm4(w: &mut ByteWriter, v: Vec4) -> Result<()> {
    for c in v.to_array() {
        w.write_i8(to_snorm8(c))?;
    }
    Ok(())
}

/// Decode one vertex. Weight slots are returned raw, in slot order.
pub fn read_vertex(r: &mut ByteReader<'_>, bt: &Blocktype) -> Result<Vertex> {
    let start = r.pos();
    let [x, y, z] = r.read_f32s::<Endian, 3>()?;
    let mut v = Vertex::new(Vec3::new(x, y, z));

    if bt.normals {
        v.normal = Some(read_snorm4(r)?.truncate());
    }
    if bt.tangents {
        let t = read_snorm4(r)?;
        let handedness = if t.w < 0.0 { -1.0 } else { 1.0 };
        v.tangent = Some(t.truncate().extend(handedness));
    }
    for _ in 0..bt.uv_channels {
        let u = r.read_f16::<Endian>()?;
        let w = r.read_f16::<Endian>()?;
        v.uvs.push(Vec2::new(u, w));
    }
    for _ in 0..bt.color_channels {
        v.colors.push(r.read_array::<4>()?);
    }
    if bt.weight_slots > 0 {
        let slots = bt.weight_slots as usize;
        let bones = r.take(slots)?;
        for &bone in bones {
            let weight = r.read_f16::<Endian>()?;
            if weight != 0.0 {
                v.weights.push(WeightBinding::new(bone as u16, weight));
            }
        }
    }

    r.seek((start + bt.stride()) as u64)?;
    Ok(v)
}

/// Encode one vertex. Missing streams are zero-filled; the caller guarantees
/// the weights already fit the blocktype capacity.
pub fn write_vertex(w: &mut ByteWriter, bt: &Blocktype, v: &Vertex) -> Result<()> {
    let start = w.pos();
    w.write_f32s::<Endian>(&v.position.to_array())?;

    if bt.normals {
        write_snorm4(w, v.normal.unwrap_or(Vec3::Y).extend(0.0))?;
    }
    if bt.tangents {
        write_snorm4(w, v.tangent.unwrap_or(Vec4::new(1.0, 0.0, 0.0, 1.0)))?;
    }
    for channel in 0..bt.uv_channels as usize {
        let uv = v.uvs.get(channel).copied().unwrap_or(Vec2::ZERO);
        w.write_f16::<Endian>(uv.x)?;
        w.write_f16::<Endian>(uv.y)?;
    }
    for channel in 0..bt.color_channels as usize {
        let color = v.colors.get(channel).copied().unwrap_or([0xFF; 4]);
        w.write_bytes(&color)?;
    }
    if bt.weight_slots > 0 {
        let slots = bt.weight_slots as usize;
        if v.weights.len() > slots {
            return Err(Error::invalid(format!(
                "Vertex has {} weights but the blocktype holds {}",
                v.weights.len(),
                slots
            )));
        }
        for slot in 0..slots {
            let bone = v.weights.get(slot).map_or(0, |b| b.bone);
            let bone = u8::try_from(bone)
                .map_err(|_| Error::invalid(format!("Bone index {} does not fit a byte", bone)))?;
            w.write_u8(bone)?;
        }
        for slot in 0..slots {
            w.write_f16::<Endian>(v.weights.get(slot).map_or(0.0, |b| b.weight))?;
        }
    }

    let written = (w.pos() - start) as usize;
    w.write_zeros(bt.stride() - written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_blocktype() -> Blocktype {
        Blocktype {
            normals: true,
            tangents: true,
            uv_channels: 2,
            color_channels: 1,
            weight_slots: 4,
        }
    }

    #[test]
    fn test_vertex_stride_respected() {
        let bt = full_blocktype();
        let v = Vertex::new(Vec3::new(1.0, 2.0, 3.0))
            .with_normal(Vec3::Z)
            .with_tangent(Vec4::new(1.0, 0.0, 0.0, -1.0))
            .with_uv(Vec2::new(0.25, 0.5))
            .with_uv(Vec2::new(1.0, 0.0))
            .with_color([1, 2, 3, 4])
            .with_weight(3, 0.75)
            .with_weight(5, 0.25);
        let mut w = ByteWriter::new();
        write_vertex(&mut w, &bt, &v).unwrap();
        assert_eq!(w.len() as usize, bt.stride());

        let bytes = w.into_inner();
        let back = read_vertex(&mut ByteReader::new(&bytes), &bt).unwrap();
        assert_eq!(back.position, v.position);
        assert!((back.normal.unwrap() - Vec3::Z).length() < 1e-2);
        assert_eq!(back.tangent.unwrap().w, -1.0);
        assert_eq!(back.uvs.as_slice(), v.uvs.as_slice());
        assert_eq!(back.colors.as_slice(), &[[1, 2, 3, 4]]);
        assert_eq!(back.weights.as_slice(), v.weights.as_slice());
    }

    #[test]
    fn test_empty_slots_skipped() {
        let bt = Blocktype { weight_slots: 4, ..Default::default() };
        let v = Vertex::new(Vec3::ZERO).with_weight(0, 1.0);
        let mut w = ByteWriter::new();
        write_vertex(&mut w, &bt, &v).unwrap();
        let bytes = w.into_inner();
        let back = read_vertex(&mut ByteReader::new(&bytes), &bt).unwrap();
        assert_eq!(back.weights.len(), 1);
    }

    #[test]
    fn test_too_many_weights_rejected() {
        let bt = Blocktype { weight_slots: 1, ..Default::default() };
        let v = Vertex::new(Vec3::ZERO).with_weight(0, 0.5).with_weight(1, 0.5);
        let mut w = ByteWriter::new();
        assert!(write_vertex(&mut w, &bt, &v).is_err());
    }

    #[test]
    fn test_truncated_vertex() {
        let bt = full_blocktype();
        let bytes = vec![0u8; bt.stride() - 1];
        assert!(read_vertex(&mut ByteReader::new(&bytes), &bt).is_err());
    }
}
