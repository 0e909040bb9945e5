use dewarp_core::EngineError;

use crate::backend::{GpuBackend, TextureFilter};

/// Offscreen render target (FBO + color texture).
#[derive(Debug)]
pub struct RenderTarget<B: GpuBackend> {
    pub fbo: B::Framebuffer,
    pub tex: B::Texture,
    pub w: i32,
    pub h: i32,
}

impl<B: GpuBackend> RenderTarget<B> {
    pub unsafe fn create(gpu: &B, w: i32, h: i32) -> Result<Self, EngineError> {
        let (w, h) = (w.max(1), h.max(1));
        let tex = gpu.create_texture(w, h, TextureFilter::Linear)?;
        let fbo = match gpu.create_framebuffer(tex) {
            Ok(fbo) => fbo,
            Err(e) => {
                gpu.delete_texture(tex);
                return Err(e);
            }
        };
        Ok(Self { fbo, tex, w, h })
    }

    pub unsafe fn destroy(self, gpu: &B) {
        gpu.delete_framebuffer(self.fbo);
        gpu.delete_texture(self.tex);
    }
}
