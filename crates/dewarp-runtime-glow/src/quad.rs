use dewarp_core::EngineError;
use dewarp_passes::{A_POSITION, A_TEXCOORD};

use crate::backend::GpuBackend;
use crate::program::ShaderProgram;

/// Two triangles covering clip space, z = 0.
const POSITIONS: [f32; 18] = [
    -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, -1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0,
];

const TEXCOORDS: [f32; 12] = [
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, //
    0.0, 1.0, 1.0, 0.0, 1.0, 1.0,
];

pub const QUAD_VERTICES: i32 = 6;

/// Full-screen quad wired to one program's attribute slots.
#[derive(Debug)]
pub struct QuadMesh<B: GpuBackend> {
    vao: B::VertexArray,
    buffers: Vec<B::Buffer>,
}

impl<B: GpuBackend> QuadMesh<B> {
    /// `a_position` must be active; `a_texcoord` is optional (a stage may ignore it).
    pub unsafe fn new(gpu: &B, program: &ShaderProgram<B>) -> Result<Self, EngineError> {
        let position = program
            .attribute(A_POSITION)
            .ok_or_else(|| EngineError::MissingAttribute {
                origin: program.origin().to_string(),
                name: A_POSITION.to_string(),
            })?;

        let vao = gpu.create_vertex_array()?;
        let mut mesh = Self {
            vao,
            buffers: Vec::with_capacity(2),
        };

        let mut attrs = vec![(position, 3, &POSITIONS[..])];
        if let Some(slot) = program.attribute(A_TEXCOORD) {
            attrs.push((slot, 2, &TEXCOORDS[..]));
        }
        for (slot, components, data) in attrs {
            match gpu.create_vertex_buffer(vao, slot, components, data) {
                Ok(buf) => mesh.buffers.push(buf),
                Err(e) => {
                    mesh.destroy(gpu);
                    return Err(e);
                }
            }
        }
        Ok(mesh)
    }

    pub unsafe fn draw(&self, gpu: &B) {
        gpu.draw_triangles(self.vao, QUAD_VERTICES);
    }

    pub unsafe fn destroy(&mut self, gpu: &B) {
        for b in self.buffers.drain(..) {
            gpu.delete_buffer(b);
        }
        gpu.delete_vertex_array(self.vao);
    }
}
