//! Text XModel reader (`.xmodel_export`)

use crate::model::{Bone, Face, FaceIndex, Material, ParsedModel, Vert};
use anvil_core::{AnvilError, Result};

/// Material property lines that follow a `MATERIAL` header. They describe
/// shading parameters the importer does not use.
const MATERIAL_PROPERTIES: &[&str] = &[
    "COLOR",
    "TRANSPARENCY",
    "AMBIENTCOLOR",
    "INCANDESCENCE",
    "COEFFS",
    "GLOW",
    "REFRACTIVE",
    "SPECULARCOLOR",
    "REFLECTIVECOLOR",
    "REFLECTIVE",
    "BLINN",
    "PHONG",
];

const SUPPORTED_VERSIONS: &[u32] = &[6, 7];

/// A tokenized source line
#[derive(Debug)]
struct Line {
    number: usize,
    tokens: Vec<String>,
}

impl Line {
    fn keyword(&self) -> &str {
        self.tokens.first().map_or("", String::as_str)
    }

    fn arg(&self, i: usize) -> Result<&str> {
        self.tokens.get(i + 1).map(String::as_str).ok_or_else(|| {
            AnvilError::parse(
                self.number,
                format!("{} expects at least {} arguments", self.keyword(), i + 1),
            )
        })
    }

    fn usize_arg(&self, i: usize) -> Result<usize> {
        let s = self.arg(i)?;
        s.parse()
            .map_err(|_| AnvilError::parse(self.number, format!("invalid index '{}'", s)))
    }

    fn i64_arg(&self, i: usize) -> Result<i64> {
        let s = self.arg(i)?;
        s.parse()
            .map_err(|_| AnvilError::parse(self.number, format!("invalid integer '{}'", s)))
    }

    fn f32_arg(&self, i: usize) -> Result<f32> {
        let s = self.arg(i)?;
        s.parse()
            .map_err(|_| AnvilError::parse(self.number, format!("invalid number '{}'", s)))
    }

    fn vec3_args(&self, start: usize) -> Result<[f32; 3]> {
        Ok([
            self.f32_arg(start)?,
            self.f32_arg(start + 1)?,
            self.f32_arg(start + 2)?,
        ])
    }

    fn vec4_args(&self, start: usize) -> Result<[f32; 4]> {
        Ok([
            self.f32_arg(start)?,
            self.f32_arg(start + 1)?,
            self.f32_arg(start + 2)?,
            self.f32_arg(start + 3)?,
        ])
    }
}

/// Split a line into tokens. Whitespace and commas separate tokens; double
/// quotes delimit names that may contain either.
fn tokenize(number: usize, text: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut token = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => token.push(ch),
                    None => return Err(AnvilError::parse(number, "unterminated string")),
                }
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == ',' || ch == '"' {
                    break;
                }
                token.push(ch);
                chars.next();
            }
            tokens.push(token);
        }
    }

    Ok(tokens)
}

struct TextParser {
    lines: Vec<Line>,
    pos: usize,
    model: ParsedModel,
}

/// Parse the text variant of an XModel
pub(crate) fn parse(source: &str) -> Result<ParsedModel> {
    let mut lines = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let tokens = tokenize(i + 1, trimmed)?;
        // Separator-only lines carry nothing
        if tokens.is_empty() {
            continue;
        }
        lines.push(Line {
            number: i + 1,
            tokens,
        });
    }

    let mut parser = TextParser {
        lines,
        pos: 0,
        model: ParsedModel::default(),
    };
    parser.run()?;
    Ok(parser.model)
}

impl TextParser {
    fn peek(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    fn next_line(&mut self) -> Result<&Line> {
        let last = self.lines.last().map(|l| l.number).unwrap_or(0);
        let line = self
            .lines
            .get(self.pos)
            .ok_or_else(|| AnvilError::parse(last, "unexpected end of file"))?;
        self.pos += 1;
        Ok(line)
    }

    /// Consume the next line, which must start with one of `keywords`
    fn expect(&mut self, keywords: &[&str]) -> Result<&Line> {
        let line = self.next_line()?;
        if !keywords.contains(&line.keyword()) {
            return Err(AnvilError::parse(
                line.number,
                format!("expected {}, found '{}'", keywords.join(" or "), line.keyword()),
            ));
        }
        Ok(line)
    }

    /// Read a `NUM*` count line. Every record takes at least `lines_per_record`
    /// lines, so a count the rest of the file cannot hold is rejected before
    /// anything is allocated for it.
    fn read_count(&mut self, lines_per_record: usize) -> Result<usize> {
        let line = self.next_line()?;
        let number = line.number;
        let keyword = line.keyword().to_string();
        let count = line.usize_arg(0)?;

        let remaining = self.lines.len() - self.pos;
        if count.saturating_mul(lines_per_record) > remaining {
            return Err(AnvilError::parse(
                number,
                format!(
                    "{} declares {} records but only {} lines follow",
                    keyword, count, remaining
                ),
            ));
        }
        Ok(count)
    }

    fn peek_is(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|l| l.keyword() == keyword)
    }

    fn run(&mut self) -> Result<()> {
        while let Some(line) = self.peek() {
            let number = line.number;
            let keyword = line.keyword().to_string();
            match keyword.as_str() {
                "MODEL" => {
                    self.pos += 1;
                }
                "VERSION" => {
                    let version = self.next_line()?.usize_arg(0)? as u32;
                    if !SUPPORTED_VERSIONS.contains(&version) {
                        return Err(AnvilError::UnsupportedFormat(format!(
                            "xmodel version {} (supported: 6, 7)",
                            version
                        )));
                    }
                    self.model.version = version;
                }
                "NUMBONES" => self.read_bone_list()?,
                "BONE" => self.read_bone_info()?,
                "NUMVERTS" | "NUMVERTS32" => self.read_verts()?,
                "NUMFACES" => self.read_faces()?,
                "NUMOBJECTS" => self.read_objects()?,
                "NUMMATERIALS" => self.read_materials()?,
                other => {
                    return Err(AnvilError::parse(
                        number,
                        format!("unexpected keyword '{}'", other),
                    ))
                }
            }
        }
        Ok(())
    }

    fn read_bone_list(&mut self) -> Result<()> {
        let count = self.read_count(1)?;
        let mut bones = vec![None; count];

        for _ in 0..count {
            let line = self.expect(&["BONE"])?;
            let index = line.usize_arg(0)?;
            let parent = line.i64_arg(1)?;
            let name = line.arg(2)?.to_string();
            let number = line.number;

            let parent = match parent {
                -1 => None,
                p if p >= 0 => Some(p as usize),
                p => {
                    return Err(AnvilError::InvalidIndex {
                        what: "bone parent",
                        index: p,
                        count,
                    })
                }
            };
            let slot = bones.get_mut(index).ok_or(AnvilError::InvalidIndex {
                what: "bone",
                index: index as i64,
                count,
            })?;
            if slot.is_some() {
                return Err(AnvilError::parse(
                    number,
                    format!("bone {} declared twice", index),
                ));
            }
            *slot = Some(Bone::new(name, parent));
        }

        self.model.bones = bones
            .into_iter()
            .enumerate()
            .map(|(i, b)| {
                b.ok_or(AnvilError::InvalidIndex {
                    what: "missing bone",
                    index: i as i64,
                    count,
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    /// `BONE i` followed by OFFSET, optional SCALE, and the X/Y/Z rows
    fn read_bone_info(&mut self) -> Result<()> {
        let line = self.next_line()?;
        let index = line.usize_arg(0)?;
        let count = self.model.bones.len();
        if index >= count {
            return Err(AnvilError::InvalidIndex {
                what: "bone",
                index: index as i64,
                count,
            });
        }

        let offset = self.expect(&["OFFSET"])?.vec3_args(0)?;
        let scale = if self.peek_is("SCALE") {
            self.next_line()?.vec3_args(0)?
        } else {
            [1.0; 3]
        };
        let x = self.expect(&["X"])?.vec3_args(0)?;
        let y = self.expect(&["Y"])?.vec3_args(0)?;
        let z = self.expect(&["Z"])?.vec3_args(0)?;

        let bone = &mut self.model.bones[index];
        bone.offset = offset;
        bone.scale = scale;
        bone.matrix = [x, y, z];
        Ok(())
    }

    fn read_verts(&mut self) -> Result<()> {
        // VERT, OFFSET
        let count = self.read_count(2)?;
        let mut verts = vec![None; count];

        for _ in 0..count {
            let index = self.expect(&["VERT", "VERT32"])?.usize_arg(0)?;
            let offset = self.expect(&["OFFSET"])?.vec3_args(0)?;

            let mut weights = Vec::new();
            if self.peek_is("BONES") {
                let weight_count = self.read_count(1)?;
                for _ in 0..weight_count {
                    let line = self.expect(&["BONE"])?;
                    weights.push((line.usize_arg(0)?, line.f32_arg(1)?));
                }
            }

            let slot = verts.get_mut(index).ok_or(AnvilError::InvalidIndex {
                what: "vertex",
                index: index as i64,
                count,
            })?;
            *slot = Some(Vert { offset, weights });
        }

        self.model.verts = verts
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or(AnvilError::InvalidIndex {
                    what: "missing vertex",
                    index: i as i64,
                    count,
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn read_faces(&mut self) -> Result<()> {
        // TRI, then VERT, NORMAL and UV per corner
        let count = self.read_count(10)?;
        let mut faces = Vec::with_capacity(count);

        for _ in 0..count {
            let tri = self.expect(&["TRI", "TRI16"])?;
            let object_index = tri.usize_arg(0)?;
            let material_id = tri.usize_arg(1)?;

            let indices = [
                self.read_corner()?,
                self.read_corner()?,
                self.read_corner()?,
            ];
            faces.push(Face {
                indices,
                material_id,
                object_index,
            });
        }

        self.model.faces = faces;
        Ok(())
    }

    fn read_corner(&mut self) -> Result<FaceIndex> {
        let vertex = self.expect(&["VERT", "VERT32"])?.usize_arg(0)?;
        let mut corner = FaceIndex::new(vertex);

        corner.normal = self.expect(&["NORMAL"])?.vec3_args(0)?;
        if self.peek_is("COLOR") {
            corner.color = self.next_line()?.vec4_args(0)?;
        }
        let uv = self.expect(&["UV"])?;
        let sets = uv.usize_arg(0)?;
        if sets > 0 {
            corner.uv = [uv.f32_arg(1)?, uv.f32_arg(2)?];
        }
        Ok(corner)
    }

    fn read_objects(&mut self) -> Result<()> {
        let count = self.read_count(1)?;
        let mut objects = vec![String::new(); count];

        for _ in 0..count {
            let line = self.expect(&["OBJECT"])?;
            let index = line.usize_arg(0)?;
            let name = line.arg(1)?.to_string();
            let slot = objects.get_mut(index).ok_or(AnvilError::InvalidIndex {
                what: "object",
                index: index as i64,
                count,
            })?;
            *slot = name;
        }

        self.model.objects = objects;
        Ok(())
    }

    fn read_materials(&mut self) -> Result<()> {
        let count = self.read_count(1)?;
        let mut materials = vec![None; count];

        for _ in 0..count {
            let line = self.expect(&["MATERIAL"])?;
            let index = line.usize_arg(0)?;
            let mut material = Material {
                name: line.arg(1)?.to_string(),
                kind: line.tokens.get(3).cloned().unwrap_or_default(),
                ..Default::default()
            };
            for token in line.tokens.iter().skip(4) {
                add_image_token(&mut material, token);
            }

            let slot = materials.get_mut(index).ok_or(AnvilError::InvalidIndex {
                what: "material",
                index: index as i64,
                count,
            })?;
            *slot = Some(material);

            while self
                .peek()
                .is_some_and(|l| MATERIAL_PROPERTIES.contains(&l.keyword()))
            {
                self.pos += 1;
            }
        }

        self.model.materials = materials
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                m.ok_or(AnvilError::InvalidIndex {
                    what: "missing material",
                    index: i as i64,
                    count,
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }
}

/// Parse an image token of the form `channel:file`. A bare filename binds the
/// color channel.
fn add_image_token(material: &mut Material, token: &str) {
    if token.is_empty() || token.eq_ignore_ascii_case("unknown") {
        return;
    }

    let (channel, file) = match token.split_once(':') {
        // A drive letter ("c:\...") is not a channel
        Some((channel, file)) if channel.len() > 1 => (channel.to_string(), file.to_string()),
        _ => ("color".to_string(), token.to_string()),
    };

    if !file.is_empty() {
        material.images.insert(channel, file);
    }
}
