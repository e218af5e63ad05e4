//! Mesh records
//!
//! Meshes are fully expanded primitive lists: one [`Vertex`] per face corner,
//! no index buffer.
//!
//! # Layout (current revision)
//! ```text
//! material_index  u32
//! bounding_box    6 × f32 (min.xyz, max.xyz)      - minor >= 1
//! vertex_format   VertexFormat                    - minor >= 2
//! primitive_type  u8 (1 point, 2 line, 4 triangle) - minor >= 2
//! vertex_count    u32
//! vertices        vertex_count × Vertex
//! ```
//!
//! Before minor 2 the vertex format is stored once for the whole model and
//! every mesh is a triangle list.

use std::io::{Read, Write};

use super::binary::{ReadBinaryExt, WriteBinaryExt};
use super::{BinarySerializable, Version, VertexFormat};
use crate::error::{FormatError, Result};
use crate::math::{Vec2, Vec3};

/// Minor version that introduced per-mesh bounding boxes.
pub const MINOR_VERSION_BOUNDING_BOX: u8 = 1;
/// Minor version that moved the vertex format into each mesh.
pub const MINOR_VERSION_MESH_FORMAT: u8 = 2;

/// Maximum number of bone influences per vertex.
pub const MAX_BONE_INFLUENCES: usize = 4;

/// How consecutive vertices form primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PrimitiveType {
    PointList = 1,
    LineList = 2,
    #[default]
    TriangleList = 4,
}

impl PrimitiveType {
    /// Number of corners per primitive.
    pub fn corners(self) -> usize {
        match self {
            PrimitiveType::PointList => 1,
            PrimitiveType::LineList => 2,
            PrimitiveType::TriangleList => 3,
        }
    }

    /// Primitive type with `corners` corners per face, if any.
    pub fn from_corners(corners: usize) -> Option<Self> {
        match corners {
            1 => Some(PrimitiveType::PointList),
            2 => Some(PrimitiveType::LineList),
            3 => Some(PrimitiveType::TriangleList),
            _ => None,
        }
    }
}

impl TryFrom<u8> for PrimitiveType {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(PrimitiveType::PointList),
            2 => Ok(PrimitiveType::LineList),
            4 => Ok(PrimitiveType::TriangleList),
            other => Err(FormatError::InvalidPrimitiveType(other)),
        }
    }
}

/// Axis-aligned bounds of a mesh's raw (bind pose) positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Bounds of a set of points, `None` when empty.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bbox = Self {
            min: first,
            max: first,
        };
        for point in points {
            bbox.extend(point);
        }
        Some(bbox)
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

impl BinarySerializable for BoundingBox {
    const SIZE: usize = 24;

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_vec3(self.min)?;
        w.write_vec3(self.max)
    }

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            min: r.read_vec3()?,
            max: r.read_vec3()?,
        })
    }
}

/// One face corner.
///
/// Only the fields enabled in the owning mesh's [`VertexFormat`] are
/// serialized; the rest keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv0: Vec2,
    pub uv1: Vec2,
    /// Packed ARGB color, see [`pack_color`].
    pub color: u32,
    pub tangent: Vec3,
    /// `1.0` or `-1.0`.
    pub bitangent_sign: f32,
    pub bone_indices: [u32; MAX_BONE_INFLUENCES],
    pub bone_weights: [f32; MAX_BONE_INFLUENCES],
    pub id: i32,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv0: Vec2::ZERO,
            uv1: Vec2::ZERO,
            color: 0,
            tangent: Vec3::ZERO,
            bitangent_sign: 1.0,
            bone_indices: [0; MAX_BONE_INFLUENCES],
            bone_weights: [0.0; MAX_BONE_INFLUENCES],
            id: 0,
        }
    }
}

impl Vertex {
    pub fn write<W: Write>(&self, w: &mut W, format: &VertexFormat) -> Result<()> {
        if format.position {
            w.write_vec3(self.position)?;
        }
        if format.normal {
            w.write_vec3(self.normal)?;
        }
        if format.uv0 {
            w.write_vec2(self.uv0)?;
        }
        if format.uv1 {
            w.write_vec2(self.uv1)?;
        }
        if format.color {
            w.write_u32_le(self.color)?;
        }
        if format.tangent {
            w.write_vec3(self.tangent)?;
            w.write_f32_le(self.bitangent_sign)?;
        }
        if format.bones {
            // Bone indices are stored as floats
            for index in self.bone_indices {
                w.write_f32_le(index as f32)?;
            }
            for weight in self.bone_weights {
                w.write_f32_le(weight)?;
            }
        }
        if format.ids {
            w.write_i32_le(self.id)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R, format: &VertexFormat) -> Result<Self> {
        let mut vertex = Vertex::default();
        if format.position {
            vertex.position = r.read_vec3()?;
        }
        if format.normal {
            vertex.normal = r.read_vec3()?;
        }
        if format.uv0 {
            vertex.uv0 = r.read_vec2()?;
        }
        if format.uv1 {
            vertex.uv1 = r.read_vec2()?;
        }
        if format.color {
            vertex.color = r.read_u32_le()?;
        }
        if format.tangent {
            vertex.tangent = r.read_vec3()?;
            vertex.bitangent_sign = r.read_f32_le()?;
        }
        if format.bones {
            for index in &mut vertex.bone_indices {
                *index = r.read_index("bone")?;
            }
            for weight in &mut vertex.bone_weights {
                *weight = r.read_f32_le()?;
            }
        }
        if format.ids {
            vertex.id = r.read_i32_le()?;
        }
        Ok(vertex)
    }
}

/// Pack a normalized RGBA color as `A << 24 | B << 16 | G << 8 | R`.
pub fn pack_color(rgba: [f32; 4]) -> u32 {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u32;
    let [r, g, b, a] = rgba;
    (channel(a) << 24) | (channel(b) << 16) | (channel(g) << 8) | channel(r)
}

/// Inverse of [`pack_color`].
pub fn unpack_color(packed: u32) -> [f32; 4] {
    let channel = |shift: u32| ((packed >> shift) & 0xFF) as f32 / 255.0;
    [channel(0), channel(8), channel(16), channel(24)]
}

/// A primitive list with one material.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Index into the model's material name table.
    pub material_index: u32,
    pub primitive_type: PrimitiveType,
    /// Missing only for meshes decoded from files older than minor 1.
    pub bounding_box: Option<BoundingBox>,
    pub vertex_format: VertexFormat,
    pub vertices: Vec<Vertex>,
}

impl Mesh {
    /// Bounds of the vertex positions, `None` for an empty mesh.
    pub fn compute_bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|v| v.position))
    }

    /// Number of complete primitives.
    pub fn primitive_count(&self) -> usize {
        self.vertices.len() / self.primitive_type.corners()
    }

    /// Write in the current layout.
    ///
    /// A missing bounding box is computed from the vertices.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.material_index)?;
        let bbox = self
            .bounding_box
            .or_else(|| self.compute_bounding_box())
            .unwrap_or(BoundingBox {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            });
        bbox.write_to(w)?;
        self.vertex_format.write(w)?;
        w.write_byte(self.primitive_type as u8)?;
        w.write_count(self.vertices.len(), "vertex")?;
        for vertex in &self.vertices {
            vertex.write(w, &self.vertex_format)?;
        }
        Ok(())
    }

    /// Read a mesh written by `version`.
    ///
    /// `model_format` is the model-wide vertex format of files older than
    /// minor 2; it is copied into the mesh.
    pub fn read<R: Read>(
        r: &mut R,
        version: Version,
        model_format: Option<VertexFormat>,
    ) -> Result<Self> {
        let material_index = r.read_u32_le()?;

        let bounding_box = if version.minor >= MINOR_VERSION_BOUNDING_BOX {
            Some(BoundingBox::read_from(r)?)
        } else {
            None
        };

        let (vertex_format, primitive_type) = if version.minor >= MINOR_VERSION_MESH_FORMAT {
            let format = VertexFormat::read(r, version)?;
            let primitive_type = PrimitiveType::try_from(r.read_byte()?)?;
            (format, primitive_type)
        } else {
            (model_format.unwrap_or_default(), PrimitiveType::TriangleList)
        };

        let vertex_count = r.read_u32_le()?;
        let mut vertices = Vec::new();
        for _ in 0..vertex_count {
            vertices.push(Vertex::read(r, &vertex_format)?);
        }

        Ok(Self {
            material_index,
            primitive_type,
            bounding_box,
            vertex_format,
            vertices,
        })
    }
}
