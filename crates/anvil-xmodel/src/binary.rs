//! Binary XModel reader (`.xmodel_bin`)
//!
//! The binary variant carries the same records as the text variant as a
//! little-endian chunk stream:
//!
//! ```text
//! magic        "XMB1"
//! chunk        u16 tag, u16 reserved, payload
//! string       UTF-8 bytes, NUL terminator, zero padding to a 4-byte boundary
//! ```
//!
//! | tag    | record       | payload                                                   |
//! |--------|--------------|-----------------------------------------------------------|
//! | 0x0001 | VERSION      | u32 version                                               |
//! | 0x0010 | NUMBONES     | u32 count                                                 |
//! | 0x0011 | BONE         | u32 index, i32 parent, string name                        |
//! | 0x0012 | BONE info    | u32 index, f32x3 offset, f32x3 scale, f32x9 rows X Y Z    |
//! | 0x0020 | NUMVERTS     | u32 count                                                 |
//! | 0x0021 | VERT         | u32 index, f32x3 offset, u32 n, n x (u32 bone, f32 weight) |
//! | 0x0030 | NUMFACES     | u32 count                                                 |
//! | 0x0031 | TRI          | u32 object, u32 material, 3 x corner                      |
//! | 0x0040 | NUMOBJECTS   | u32 count                                                 |
//! | 0x0041 | OBJECT       | u32 index, string name                                    |
//! | 0x0050 | NUMMATERIALS | u32 count                                                 |
//! | 0x0051 | MATERIAL     | u32 index, string name, string type, image list           |
//! | 0xFFFF | END          | none                                                      |
//!
//! A corner is `u32 vertex, f32x3 normal, f32x4 color, f32x2 uv`.
//! An image list is `u32 n` followed by n `(string channel, string file)` pairs.

use crate::model::{Bone, Face, FaceIndex, Material, ParsedModel, Vert};
use anvil_core::{AnvilError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

pub const MAGIC: &[u8; 4] = b"XMB1";

/// Smallest encoded size of each counted record, chunk header included
mod min_size {
    pub const BONE: usize = 4 + 8 + 1;
    pub const VERT: usize = 4 + 4 + 12 + 4;
    pub const WEIGHT: usize = 8;
    pub const TRI: usize = 4 + 8 + 3 * 40;
    pub const OBJECT: usize = 4 + 4 + 1;
    pub const MATERIAL: usize = 4 + 4 + 2 + 4;
}

pub mod tag {
    pub const VERSION: u16 = 0x0001;
    pub const NUMBONES: u16 = 0x0010;
    pub const BONE: u16 = 0x0011;
    pub const BONE_INFO: u16 = 0x0012;
    pub const NUMVERTS: u16 = 0x0020;
    pub const VERT: u16 = 0x0021;
    pub const NUMFACES: u16 = 0x0030;
    pub const TRI: u16 = 0x0031;
    pub const NUMOBJECTS: u16 = 0x0040;
    pub const OBJECT: u16 = 0x0041;
    pub const NUMMATERIALS: u16 = 0x0050;
    pub const MATERIAL: u16 = 0x0051;
    pub const END: u16 = 0xFFFF;
}

struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BinaryReader<'a> {
    fn error(&self, message: impl Into<String>) -> AnvilError {
        AnvilError::BinaryParseError {
            offset: self.cursor.position(),
            message: message.into(),
        }
    }

    fn truncated(&self, _: std::io::Error) -> AnvilError {
        self.error("unexpected end of data")
    }

    fn at_end(&self) -> bool {
        self.cursor.position() as usize >= self.cursor.get_ref().len()
    }

    fn u16(&mut self) -> Result<u16> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|e| self.truncated(e))
    }

    fn u32(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| self.truncated(e))
    }

    fn index(&mut self) -> Result<usize> {
        Ok(self.u32()? as usize)
    }

    /// A record count. Counts the remaining bytes cannot hold are rejected
    /// before anything is allocated for them.
    fn count(&mut self, record_size: usize, what: &str) -> Result<usize> {
        let count = self.index()?;
        let remaining = self
            .cursor
            .get_ref()
            .len()
            .saturating_sub(self.cursor.position() as usize);
        if count.saturating_mul(record_size) > remaining {
            return Err(self.error(format!(
                "{} count {} does not fit in the remaining {} bytes",
                what, count, remaining
            )));
        }
        Ok(count)
    }

    fn i32(&mut self) -> Result<i32> {
        self.cursor
            .read_i32::<LittleEndian>()
            .map_err(|e| self.truncated(e))
    }

    fn f32(&mut self) -> Result<f32> {
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|e| self.truncated(e))
    }

    fn vec2(&mut self) -> Result<[f32; 2]> {
        Ok([self.f32()?, self.f32()?])
    }

    fn vec3(&mut self) -> Result<[f32; 3]> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    fn vec4(&mut self) -> Result<[f32; 4]> {
        Ok([self.f32()?, self.f32()?, self.f32()?, self.f32()?])
    }

    /// NUL-terminated string padded to a 4-byte boundary
    fn string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.cursor.read_u8().map_err(|e| self.truncated(e))?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }

        let padding = (4 - (self.cursor.position() % 4)) % 4;
        for _ in 0..padding {
            self.cursor.read_u8().map_err(|e| self.truncated(e))?;
        }

        String::from_utf8(bytes).map_err(|_| self.error("string is not valid UTF-8"))
    }

    fn corner(&mut self) -> Result<FaceIndex> {
        let mut corner = FaceIndex::new(self.index()?);
        corner.normal = self.vec3()?;
        corner.color = self.vec4()?;
        corner.uv = self.vec2()?;
        Ok(corner)
    }
}

/// Parse the binary variant of an XModel
pub(crate) fn parse(data: &[u8]) -> Result<ParsedModel> {
    let mut reader = BinaryReader {
        cursor: Cursor::new(data),
    };

    let mut magic = [0u8; 4];
    reader
        .cursor
        .read_exact(&mut magic)
        .map_err(|e| reader.truncated(e))?;
    if &magic != MAGIC {
        return Err(AnvilError::UnsupportedFormat(
            "missing XMB1 magic in binary xmodel".to_string(),
        ));
    }

    let mut model = ParsedModel::default();
    let mut bones: Vec<Option<Bone>> = Vec::new();
    let mut verts: Vec<Option<Vert>> = Vec::new();
    let mut materials: Vec<Option<Material>> = Vec::new();
    let mut face_count = 0usize;
    let mut ended = false;

    while !reader.at_end() {
        let chunk = reader.u16()?;
        let _reserved = reader.u16()?;

        match chunk {
            tag::VERSION => model.version = reader.u32()?,
            tag::NUMBONES => bones = vec![None; reader.count(min_size::BONE, "bone")?],
            tag::BONE => {
                let index = reader.index()?;
                let parent = reader.i32()?;
                let name = reader.string()?;
                let parent = match parent {
                    -1 => None,
                    p if p >= 0 => Some(p as usize),
                    p => {
                        return Err(AnvilError::InvalidIndex {
                            what: "bone parent",
                            index: p as i64,
                            count: bones.len(),
                        })
                    }
                };
                *slot(&mut bones, index, "bone")? = Some(Bone::new(name, parent));
            }
            tag::BONE_INFO => {
                let index = reader.index()?;
                let offset = reader.vec3()?;
                let scale = reader.vec3()?;
                let matrix = [reader.vec3()?, reader.vec3()?, reader.vec3()?];
                let count = bones.len();
                let bone = slot(&mut bones, index, "bone")?.as_mut().ok_or(
                    AnvilError::InvalidIndex {
                        what: "undeclared bone",
                        index: index as i64,
                        count,
                    },
                )?;
                bone.offset = offset;
                bone.scale = scale;
                bone.matrix = matrix;
            }
            tag::NUMVERTS => verts = vec![None; reader.count(min_size::VERT, "vertex")?],
            tag::VERT => {
                let index = reader.index()?;
                let offset = reader.vec3()?;
                let weight_count = reader.count(min_size::WEIGHT, "weight")?;
                let mut weights = Vec::with_capacity(weight_count);
                for _ in 0..weight_count {
                    weights.push((reader.index()?, reader.f32()?));
                }
                *slot(&mut verts, index, "vertex")? = Some(Vert { offset, weights });
            }
            tag::NUMFACES => {
                face_count = reader.count(min_size::TRI, "face")?;
                model.faces = Vec::with_capacity(face_count);
            }
            tag::TRI => {
                let object_index = reader.index()?;
                let material_id = reader.index()?;
                let indices = [reader.corner()?, reader.corner()?, reader.corner()?];
                model.faces.push(Face {
                    indices,
                    material_id,
                    object_index,
                });
            }
            tag::NUMOBJECTS => {
                model.objects = vec![String::new(); reader.count(min_size::OBJECT, "object")?]
            }
            tag::OBJECT => {
                let index = reader.index()?;
                let name = reader.string()?;
                *slot(&mut model.objects, index, "object")? = name;
            }
            tag::NUMMATERIALS => {
                materials = vec![None; reader.count(min_size::MATERIAL, "material")?]
            }
            tag::MATERIAL => {
                let index = reader.index()?;
                let mut material = Material {
                    name: reader.string()?,
                    kind: reader.string()?,
                    ..Default::default()
                };
                let image_count = reader.index()?;
                for _ in 0..image_count {
                    let channel = reader.string()?;
                    let file = reader.string()?;
                    material.images.insert(channel, file);
                }
                *slot(&mut materials, index, "material")? = Some(material);
            }
            tag::END => {
                ended = true;
                break;
            }
            other => return Err(reader.error(format!("unknown chunk tag 0x{:04x}", other))),
        }
    }

    if !ended {
        return Err(reader.error("missing END chunk"));
    }
    if model.faces.len() != face_count {
        return Err(reader.error(format!(
            "expected {} faces, found {}",
            face_count,
            model.faces.len()
        )));
    }

    model.bones = collect_declared(bones, "missing bone")?;
    model.verts = collect_declared(verts, "missing vertex")?;
    model.materials = collect_declared(materials, "missing material")?;
    Ok(model)
}

fn slot<'v, T>(items: &'v mut [T], index: usize, what: &'static str) -> Result<&'v mut T> {
    let count = items.len();
    items.get_mut(index).ok_or(AnvilError::InvalidIndex {
        what,
        index: index as i64,
        count,
    })
}

fn collect_declared<T>(items: Vec<Option<T>>, what: &'static str) -> Result<Vec<T>> {
    let count = items.len();
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            item.ok_or(AnvilError::InvalidIndex {
                what,
                index: i as i64,
                count,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Little-endian chunk builder for tests
    #[derive(Default)]
    pub(crate) struct ChunkWriter {
        pub bytes: Vec<u8>,
    }

    impl ChunkWriter {
        pub fn new() -> Self {
            Self {
                bytes: MAGIC.to_vec(),
            }
        }

        pub fn tag(&mut self, tag: u16) -> &mut Self {
            self.bytes.extend_from_slice(&tag.to_le_bytes());
            self.bytes.extend_from_slice(&0u16.to_le_bytes());
            self
        }

        pub fn u32(&mut self, v: u32) -> &mut Self {
            self.bytes.extend_from_slice(&v.to_le_bytes());
            self
        }

        pub fn i32(&mut self, v: i32) -> &mut Self {
            self.bytes.extend_from_slice(&v.to_le_bytes());
            self
        }

        pub fn floats(&mut self, values: &[f32]) -> &mut Self {
            for v in values {
                self.bytes.extend_from_slice(&v.to_le_bytes());
            }
            self
        }

        pub fn string(&mut self, s: &str) -> &mut Self {
            self.bytes.extend_from_slice(s.as_bytes());
            self.bytes.push(0);
            while self.bytes.len() % 4 != 0 {
                self.bytes.push(0);
            }
            self
        }

        pub fn corner(&mut self, vertex: u32, uv: [f32; 2]) -> &mut Self {
            self.u32(vertex)
                .floats(&[0.0, 0.0, 1.0])
                .floats(&[1.0, 1.0, 1.0, 1.0])
                .floats(&uv)
        }
    }

    /// One bone, three vertices, one triangle, one material
    pub(crate) fn triangle_bytes() -> Vec<u8> {
        let mut w = ChunkWriter::new();
        w.tag(tag::VERSION).u32(7);
        w.tag(tag::NUMBONES).u32(1);
        w.tag(tag::BONE).u32(0).i32(-1).string("tag_origin");
        w.tag(tag::BONE_INFO)
            .u32(0)
            .floats(&[0.0, 0.0, 0.0])
            .floats(&[1.0, 1.0, 1.0])
            .floats(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        w.tag(tag::NUMVERTS).u32(3);
        for (i, x) in [0.0f32, 1.0, 0.0].iter().enumerate() {
            let y = if i == 2 { 1.0 } else { 0.0 };
            w.tag(tag::VERT)
                .u32(i as u32)
                .floats(&[*x, y, 0.0])
                .u32(1)
                .u32(0)
                .floats(&[1.0]);
        }
        w.tag(tag::NUMFACES).u32(1);
        w.tag(tag::TRI).u32(0).u32(0);
        w.corner(0, [0.0, 0.0]).corner(1, [1.0, 0.0]).corner(2, [0.0, 1.0]);
        w.tag(tag::NUMOBJECTS).u32(1);
        w.tag(tag::OBJECT).u32(0).string("tri");
        w.tag(tag::NUMMATERIALS).u32(1);
        w.tag(tag::MATERIAL)
            .u32(0)
            .string("mtl_tri")
            .string("lambert")
            .u32(1)
            .string("color")
            .string("tri_c.tga");
        w.tag(tag::END);
        w.bytes
    }

    #[test]
    fn parses_triangle_stream() {
        let model = parse(&triangle_bytes()).unwrap();
        assert_eq!(model.version, 7);
        assert_eq!(model.bones[0].name, "tag_origin");
        assert_eq!(model.bones[0].parent, None);
        assert_eq!(model.verts.len(), 3);
        assert_eq!(model.verts[2].offset, [0.0, 1.0, 0.0]);
        assert_eq!(model.faces.len(), 1);
        assert_eq!(model.faces[0].vertex_indices(), [0, 1, 2]);
        assert_eq!(model.faces[0].indices[1].uv, [1.0, 0.0]);
        assert_eq!(model.objects, vec!["tri"]);
        assert_eq!(
            model.materials[0].images.get("color").map(String::as_str),
            Some("tri_c.tga")
        );
    }

    #[test]
    fn bad_magic_is_unsupported() {
        let err = parse(b"LZ4\0\0\0\0\0").unwrap_err();
        assert!(matches!(err, AnvilError::UnsupportedFormat(_)));
    }

    #[test]
    fn truncated_stream_reports_offset() {
        let bytes = triangle_bytes();
        let err = parse(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, AnvilError::BinaryParseError { .. }));
    }

    #[test]
    fn oversized_counts_are_rejected() {
        for chunk in [
            tag::NUMBONES,
            tag::NUMVERTS,
            tag::NUMFACES,
            tag::NUMOBJECTS,
            tag::NUMMATERIALS,
        ] {
            let mut w = ChunkWriter::new();
            w.tag(chunk).u32(u32::MAX);
            let err = parse(&w.bytes).unwrap_err();
            assert!(
                matches!(err, AnvilError::BinaryParseError { .. }),
                "chunk 0x{:04x}: {:?}",
                chunk,
                err
            );
        }
    }

    #[test]
    fn weight_count_is_bounded_by_data() {
        let mut w = ChunkWriter::new();
        w.tag(tag::NUMVERTS).u32(1);
        w.tag(tag::VERT).u32(0).floats(&[0.0, 0.0, 0.0]).u32(1_000_000);
        w.tag(tag::END);
        let err = parse(&w.bytes).unwrap_err();
        assert!(err.to_string().contains("weight count"));
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let mut w = ChunkWriter::new();
        w.tag(0x7777);
        let err = parse(&w.bytes).unwrap_err();
        assert!(err.to_string().contains("0x7777"));
    }
}
