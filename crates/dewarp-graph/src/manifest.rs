use crate::UniformKind;

/// A vertex attribute a stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub components: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
}

/// What a shader stage declares. Checked against the linker's resolved locations when a
/// program is built; entries the linker dropped are pruned there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageManifest {
    pub attributes: &'static [AttributeDecl],
    pub uniforms: &'static [UniformDecl],
}

impl StageManifest {
    /// Merge two stage manifests into one per-program list, vertex first.
    ///
    /// A uniform declared in both stages appears once.
    pub fn merged_uniforms(vert: &StageManifest, frag: &StageManifest) -> Vec<UniformDecl> {
        let mut out: Vec<UniformDecl> = vert.uniforms.to_vec();
        for u in frag.uniforms {
            if !out.iter().any(|o| o.name == u.name) {
                out.push(*u);
            }
        }
        out
    }
}

/// GLSL source plus its manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderStage {
    pub source: &'static str,
    pub manifest: StageManifest,
}
