//! Binary buffer packing with one view and accessor per attribute.

use gltf_json as json;
use json::accessor::{ComponentType, GenericComponentType, Type};
use json::buffer::Target;
use json::validation::Checked::Valid;

#[derive(Default)]
pub(crate) struct BufferBuilder {
    pub data: Vec<u8>,
    pub views: Vec<json::buffer::View>,
    pub accessors: Vec<json::Accessor>,
}

impl BufferBuilder {
    /// Append `bytes` as a new view and describe it with an accessor.
    /// Returns the accessor index.
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        bytes: &[u8],
        count: usize,
        component_type: ComponentType,
        type_: Type,
        target: Option<Target>,
        min: Option<json::Value>,
        max: Option<json::Value>,
    ) -> json::Index<json::Accessor> {
        while !self.data.len().is_multiple_of(4) {
            self.data.push(0);
        }
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);

        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: bytes.len().into(),
            byte_offset: Some(offset.into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: target.map(Valid),
        });
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(self.views.len() as u32 - 1)),
            byte_offset: Some(0u64.into()),
            count: count.into(),
            component_type: Valid(GenericComponentType(component_type)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min,
            max,
            name: None,
            normalized: false,
            sparse: None,
        });
        json::Index::new(self.accessors.len() as u32 - 1)
    }

    /// POSITION accessor; glTF requires its bounds.
    pub fn positions(&mut self, positions: &[[f32; 3]]) -> json::Index<json::Accessor> {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        self.push(
            bytemuck::cast_slice(positions),
            positions.len(),
            ComponentType::F32,
            Type::Vec3,
            Some(Target::ArrayBuffer),
            Some(bounds(&min)),
            Some(bounds(&max)),
        )
    }

    pub fn vec2(&mut self, values: &[[f32; 2]]) -> json::Index<json::Accessor> {
        self.push(
            bytemuck::cast_slice(values),
            values.len(),
            ComponentType::F32,
            Type::Vec2,
            Some(Target::ArrayBuffer),
            None,
            None,
        )
    }

    pub fn vec3(&mut self, values: &[[f32; 3]]) -> json::Index<json::Accessor> {
        self.push(
            bytemuck::cast_slice(values),
            values.len(),
            ComponentType::F32,
            Type::Vec3,
            Some(Target::ArrayBuffer),
            None,
            None,
        )
    }

    /// Animation output or weights; no buffer target.
    pub fn vec4(&mut self, values: &[[f32; 4]], target: Option<Target>) -> json::Index<json::Accessor> {
        self.push(
            bytemuck::cast_slice(values),
            values.len(),
            ComponentType::F32,
            Type::Vec4,
            target,
            None,
            None,
        )
    }

    pub fn joints(&mut self, joints: &[[u8; 4]]) -> json::Index<json::Accessor> {
        self.push(
            bytemuck::cast_slice(joints),
            joints.len(),
            ComponentType::U8,
            Type::Vec4,
            Some(Target::ArrayBuffer),
            None,
            None,
        )
    }

    pub fn indices(&mut self, indices: &[u16]) -> json::Index<json::Accessor> {
        self.push(
            bytemuck::cast_slice(indices),
            indices.len(),
            ComponentType::U16,
            Type::Scalar,
            Some(Target::ElementArrayBuffer),
            None,
            None,
        )
    }

    pub fn matrices(&mut self, matrices: &[[f32; 16]]) -> json::Index<json::Accessor> {
        self.push(
            bytemuck::cast_slice(matrices),
            matrices.len(),
            ComponentType::F32,
            Type::Mat4,
            None,
            None,
            None,
        )
    }

    /// Animation input; glTF requires its bounds.
    pub fn times(&mut self, times: &[f32]) -> json::Index<json::Accessor> {
        let min = times.iter().copied().fold(f32::MAX, f32::min);
        let max = times.iter().copied().fold(f32::MIN, f32::max);
        self.push(
            bytemuck::cast_slice(times),
            times.len(),
            ComponentType::F32,
            Type::Scalar,
            None,
            Some(bounds(&[min])),
            Some(bounds(&[max])),
        )
    }

    pub fn animation_vec3(&mut self, values: &[[f32; 3]]) -> json::Index<json::Accessor> {
        self.push(
            bytemuck::cast_slice(values),
            values.len(),
            ComponentType::F32,
            Type::Vec3,
            None,
            None,
            None,
        )
    }
}

fn bounds(values: &[f32]) -> json::Value {
    json::Value::Array(values.iter().copied().map(json::Value::from).collect())
}
