use std::collections::HashMap;

use dewarp_core::EngineError;
use dewarp_graph::{PassKind, ShaderStage, StageManifest, UniformKind, UniformValue};

use crate::backend::GpuBackend;

#[derive(Debug, Clone)]
struct UniformBinding<L> {
    kind: UniformKind,
    location: L,
}

/// A linked program plus the bindings the linker actually resolved.
///
/// Built from the stages' static manifests. Declared entries the linker optimized away
/// are pruned, never stored as empty slots.
#[derive(Debug)]
pub struct ShaderProgram<B: GpuBackend> {
    pub program: B::Program,
    origin: String,
    attributes: HashMap<&'static str, u32>,
    uniforms: HashMap<&'static str, UniformBinding<B::UniformLocation>>,
}

impl<B: GpuBackend> ShaderProgram<B> {
    /// Compile and link. A missing stage falls back to the passthrough quad stage.
    pub unsafe fn compile(
        gpu: &B,
        vert: Option<&ShaderStage>,
        frag: Option<&ShaderStage>,
        origin: &str,
    ) -> Result<Self, EngineError> {
        let vert = vert.copied().unwrap_or(dewarp_passes::QUAD);
        let frag = frag.copied().unwrap_or(dewarp_passes::PASSTHROUGH);

        let program = gpu.link_program(vert.source, frag.source, origin)?;

        let mut attributes = HashMap::new();
        for a in vert.manifest.attributes {
            match gpu.attrib_location(program, a.name) {
                Some(slot) => {
                    attributes.insert(a.name, slot);
                }
                None => tracing::debug!(origin, attribute = a.name, "pruned inactive attribute"),
            }
        }

        let mut uniforms = HashMap::new();
        for u in StageManifest::merged_uniforms(&vert.manifest, &frag.manifest) {
            match gpu.uniform_location(program, u.name) {
                Some(location) => {
                    uniforms.insert(u.name, UniformBinding { kind: u.kind, location });
                }
                None => tracing::debug!(origin, uniform = u.name, "pruned inactive uniform"),
            }
        }

        Ok(Self {
            program,
            origin: origin.to_string(),
            attributes,
            uniforms,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Upload `value` if `name` survived linking. Returns whether anything was sent.
    ///
    /// A value whose kind disagrees with the declaration is dropped with a warning.
    pub unsafe fn set_uniform(&self, gpu: &B, name: &str, value: &UniformValue) -> bool {
        let Some(binding) = self.uniforms.get(name) else {
            return false;
        };
        if binding.kind != value.kind() {
            tracing::warn!(
                origin = %self.origin,
                uniform = name,
                declared = binding.kind.glsl_name(),
                given = value.kind().glsl_name(),
                "uniform type mismatch; skipped"
            );
            return false;
        }
        gpu.upload_uniform(&binding.location, value);
        true
    }

    pub unsafe fn destroy(&mut self, gpu: &B) {
        gpu.delete_program(self.program);
        self.attributes.clear();
        self.uniforms.clear();
    }
}

/// One compiled program per built-in pass.
#[derive(Debug)]
pub struct ShaderRegistry<B: GpuBackend> {
    programs: HashMap<PassKind, ShaderProgram<B>>,
}

impl<B: GpuBackend> Default for ShaderRegistry<B> {
    fn default() -> Self {
        Self {
            programs: HashMap::new(),
        }
    }
}

impl<B: GpuBackend> ShaderRegistry<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the built-in stages for `kind` under origin `builtin:<label>`.
    pub unsafe fn compile(&mut self, gpu: &B, kind: PassKind) -> Result<(), EngineError> {
        let (vert, frag) = dewarp_passes::stages_for(kind);
        let origin = format!("builtin:{}", kind.label());
        let program = ShaderProgram::compile(gpu, Some(&vert), Some(&frag), &origin)?;
        if let Some(mut old) = self.programs.insert(kind, program) {
            old.destroy(gpu);
        }
        Ok(())
    }

    /// Compile every built-in pass. On failure, programs built so far are released.
    pub unsafe fn compile_all(gpu: &B) -> Result<Self, EngineError> {
        let mut reg = Self::new();
        for kind in PassKind::ALL {
            if let Err(e) = reg.compile(gpu, kind) {
                reg.destroy(gpu);
                return Err(e);
            }
        }
        Ok(reg)
    }

    pub fn get(&self, kind: PassKind) -> Option<&ShaderProgram<B>> {
        self.programs.get(&kind)
    }

    pub unsafe fn destroy(&mut self, gpu: &B) {
        for (_, mut p) in self.programs.drain() {
            p.destroy(gpu);
        }
    }
}
