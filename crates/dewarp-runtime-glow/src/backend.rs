//! The slice of a GL-like API the pipeline needs, and its glow implementation.
//!
//! Everything above this trait is backend-agnostic, which lets tests run the full
//! pipeline on a CPU implementation.

use std::fmt::Debug;

use glow::HasContext;

use dewarp_core::{numbered_listing, EngineError};
use dewarp_graph::UniformValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// How pixel data reaches an existing texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Re-specify storage every upload (`glTexImage2D`).
    Respecify,
    /// Update in place (`glTexSubImage2D`); size must match the allocation.
    SubImage,
}

/// GPU operations used by the render graph.
///
/// All methods are `unsafe`: implementations talk to a context that must be current on
/// the calling thread, and handles must come from the same backend instance.
pub trait GpuBackend {
    type Texture: Copy + Debug + PartialEq;
    type Framebuffer: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type VertexArray: Copy + Debug;
    type Buffer: Copy + Debug;
    type UniformLocation: Clone + Debug;

    /// RGBA8 texture, clamp-to-edge, contents undefined.
    unsafe fn create_texture(
        &self,
        w: i32,
        h: i32,
        filter: TextureFilter,
    ) -> Result<Self::Texture, EngineError>;
    unsafe fn upload_rgba(&self, tex: Self::Texture, w: i32, h: i32, rgba: &[u8], mode: UploadMode);
    unsafe fn delete_texture(&self, tex: Self::Texture);

    /// Framebuffer with `tex` as color attachment 0. Fails if incomplete.
    unsafe fn create_framebuffer(&self, tex: Self::Texture) -> Result<Self::Framebuffer, EngineError>;
    unsafe fn delete_framebuffer(&self, fbo: Self::Framebuffer);

    /// Compile both stages and link. Errors carry `origin`, the log and a numbered listing.
    unsafe fn link_program(
        &self,
        vert: &str,
        frag: &str,
        origin: &str,
    ) -> Result<Self::Program, EngineError>;
    unsafe fn delete_program(&self, program: Self::Program);
    unsafe fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    unsafe fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;

    unsafe fn create_vertex_array(&self) -> Result<Self::VertexArray, EngineError>;
    /// Upload `data` as a float attribute of `components` wide into `slot` of `vao`.
    unsafe fn create_vertex_buffer(
        &self,
        vao: Self::VertexArray,
        slot: u32,
        components: i32,
        data: &[f32],
    ) -> Result<Self::Buffer, EngineError>;
    unsafe fn delete_vertex_array(&self, vao: Self::VertexArray);
    unsafe fn delete_buffer(&self, buffer: Self::Buffer);

    /// Bind `target` (or the default framebuffer), set the viewport and clear to black.
    unsafe fn begin_pass(&self, target: Option<Self::Framebuffer>, w: i32, h: i32);
    unsafe fn use_program(&self, program: Self::Program);
    unsafe fn bind_texture(&self, unit: u32, tex: Self::Texture);
    unsafe fn upload_uniform(&self, location: &Self::UniformLocation, value: &UniformValue);
    unsafe fn draw_triangles(&self, vao: Self::VertexArray, count: i32);
}

unsafe fn compile_stage(
    gl: &glow::Context,
    kind: u32,
    src: &str,
    origin: &str,
) -> Result<glow::NativeShader, EngineError> {
    let shader = gl
        .create_shader(kind)
        .map_err(|e| EngineError::GlCreate(format!("create_shader({origin}) failed: {e:?}")))?;
    gl.shader_source(shader, src);
    gl.compile_shader(shader);
    if gl.get_shader_compile_status(shader) {
        return Ok(shader);
    }
    let log = gl.get_shader_info_log(shader);
    gl.delete_shader(shader);
    let origin = origin.to_string();
    let source_text = numbered_listing(src);
    Err(if kind == glow::VERTEX_SHADER {
        EngineError::VertexCompile { origin, log, source_text }
    } else {
        EngineError::FragmentCompile { origin, log, source_text }
    })
}

impl GpuBackend for glow::Context {
    type Texture = glow::NativeTexture;
    type Framebuffer = glow::NativeFramebuffer;
    type Program = glow::NativeProgram;
    type VertexArray = glow::NativeVertexArray;
    type Buffer = glow::NativeBuffer;
    type UniformLocation = glow::NativeUniformLocation;

    unsafe fn create_texture(
        &self,
        w: i32,
        h: i32,
        filter: TextureFilter,
    ) -> Result<Self::Texture, EngineError> {
        let tex = HasContext::create_texture(self)
            .map_err(|e| EngineError::GlCreate(format!("create_texture failed: {e:?}")))?;
        let f = match filter {
            TextureFilter::Nearest => glow::NEAREST,
            TextureFilter::Linear => glow::LINEAR,
        } as i32;
        HasContext::bind_texture(self, glow::TEXTURE_2D, Some(tex));
        self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, f);
        self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, f);
        self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        self.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            w.max(1),
            h.max(1),
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            None,
        );
        HasContext::bind_texture(self, glow::TEXTURE_2D, None);
        Ok(tex)
    }

    unsafe fn upload_rgba(&self, tex: Self::Texture, w: i32, h: i32, rgba: &[u8], mode: UploadMode) {
        HasContext::bind_texture(self, glow::TEXTURE_2D, Some(tex));
        self.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        match mode {
            UploadMode::Respecify => self.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                w,
                h,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(rgba),
            ),
            UploadMode::SubImage => self.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                w,
                h,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(rgba),
            ),
        }
        HasContext::bind_texture(self, glow::TEXTURE_2D, None);
    }

    unsafe fn delete_texture(&self, tex: Self::Texture) {
        HasContext::delete_texture(self, tex);
    }

    unsafe fn create_framebuffer(&self, tex: Self::Texture) -> Result<Self::Framebuffer, EngineError> {
        let fbo = HasContext::create_framebuffer(self)
            .map_err(|e| EngineError::GlCreate(format!("create_framebuffer failed: {e:?}")))?;
        self.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        self.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(tex),
            0,
        );
        let status = self.check_framebuffer_status(glow::FRAMEBUFFER);
        self.bind_framebuffer(glow::FRAMEBUFFER, None);
        if status != glow::FRAMEBUFFER_COMPLETE {
            HasContext::delete_framebuffer(self, fbo);
            return Err(EngineError::GlCreate(format!(
                "framebuffer incomplete: 0x{status:x}"
            )));
        }
        Ok(fbo)
    }

    unsafe fn delete_framebuffer(&self, fbo: Self::Framebuffer) {
        HasContext::delete_framebuffer(self, fbo);
    }

    unsafe fn link_program(
        &self,
        vert: &str,
        frag: &str,
        origin: &str,
    ) -> Result<Self::Program, EngineError> {
        let vs = compile_stage(self, glow::VERTEX_SHADER, vert, origin)?;
        let fs = match compile_stage(self, glow::FRAGMENT_SHADER, frag, origin) {
            Ok(fs) => fs,
            Err(e) => {
                self.delete_shader(vs);
                return Err(e);
            }
        };

        let program = match self.create_program() {
            Ok(p) => p,
            Err(e) => {
                self.delete_shader(vs);
                self.delete_shader(fs);
                return Err(EngineError::GlCreate(format!("create_program failed: {e:?}")));
            }
        };
        self.attach_shader(program, vs);
        self.attach_shader(program, fs);
        HasContext::link_program(self, program);

        self.detach_shader(program, vs);
        self.detach_shader(program, fs);
        self.delete_shader(vs);
        self.delete_shader(fs);

        if !self.get_program_link_status(program) {
            let log = self.get_program_info_log(program);
            HasContext::delete_program(self, program);
            return Err(EngineError::Link {
                origin: origin.to_string(),
                log,
            });
        }
        Ok(program)
    }

    unsafe fn delete_program(&self, program: Self::Program) {
        HasContext::delete_program(self, program);
    }

    unsafe fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        self.get_attrib_location(program, name)
    }

    unsafe fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        self.get_uniform_location(program, name)
    }

    unsafe fn create_vertex_array(&self) -> Result<Self::VertexArray, EngineError> {
        HasContext::create_vertex_array(self)
            .map_err(|e| EngineError::GlCreate(format!("create_vertex_array: {e}")))
    }

    unsafe fn create_vertex_buffer(
        &self,
        vao: Self::VertexArray,
        slot: u32,
        components: i32,
        data: &[f32],
    ) -> Result<Self::Buffer, EngineError> {
        let vbo = self
            .create_buffer()
            .map_err(|e| EngineError::GlCreate(format!("create_buffer: {e}")))?;
        self.bind_vertex_array(Some(vao));
        self.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        self.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(data), glow::STATIC_DRAW);
        self.enable_vertex_attrib_array(slot);
        self.vertex_attrib_pointer_f32(slot, components, glow::FLOAT, false, 0, 0);
        self.bind_buffer(glow::ARRAY_BUFFER, None);
        self.bind_vertex_array(None);
        Ok(vbo)
    }

    unsafe fn delete_vertex_array(&self, vao: Self::VertexArray) {
        HasContext::delete_vertex_array(self, vao);
    }

    unsafe fn delete_buffer(&self, buffer: Self::Buffer) {
        HasContext::delete_buffer(self, buffer);
    }

    unsafe fn begin_pass(&self, target: Option<Self::Framebuffer>, w: i32, h: i32) {
        self.bind_framebuffer(glow::FRAMEBUFFER, target);
        self.viewport(0, 0, w, h);
        self.disable(glow::DEPTH_TEST);
        self.disable(glow::BLEND);
        self.clear_color(0.0, 0.0, 0.0, 1.0);
        self.clear(glow::COLOR_BUFFER_BIT);
    }

    unsafe fn use_program(&self, program: Self::Program) {
        HasContext::use_program(self, Some(program));
    }

    unsafe fn bind_texture(&self, unit: u32, tex: Self::Texture) {
        self.active_texture(glow::TEXTURE0 + unit);
        HasContext::bind_texture(self, glow::TEXTURE_2D, Some(tex));
    }

    unsafe fn upload_uniform(&self, location: &Self::UniformLocation, value: &UniformValue) {
        let loc = Some(location);
        match *value {
            UniformValue::Float(v) => self.uniform_1_f32(loc, v),
            UniformValue::Vec2(v) => self.uniform_2_f32(loc, v.x, v.y),
            UniformValue::Vec3(v) => self.uniform_3_f32(loc, v.x, v.y, v.z),
            UniformValue::Vec4(v) => self.uniform_4_f32(loc, v.x, v.y, v.z, v.w),
            UniformValue::Mat4(m) => self.uniform_matrix_4_f32_slice(loc, false, &m.to_cols_array()),
            UniformValue::Sampler2D(unit) => self.uniform_1_i32(loc, unit),
            UniformValue::Uint(v) => self.uniform_1_u32(loc, v),
        }
    }

    unsafe fn draw_triangles(&self, vao: Self::VertexArray, count: i32) {
        self.bind_vertex_array(Some(vao));
        self.draw_arrays(glow::TRIANGLES, 0, count);
        self.bind_vertex_array(None);
    }
}
