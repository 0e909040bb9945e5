//! CPU stand-in for a GL context.
//!
//! Tracks every object it hands out, emulates the linker's pruning of unused bindings,
//! and runs each built-in stage on the CPU (nearest sampling, clamp to edge) so tests can
//! inspect pixels. Using a deleted handle panics; deleting twice is counted.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use dewarp_core::{numbered_listing, EngineError};
use dewarp_graph::UniformValue;
use dewarp_lens::{DewarpParams, LensProfile};
use dewarp_runtime_glow::{GpuBackend, TextureFilter, UploadMode};
use glam::{Mat4, Vec2, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftTexture(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftFramebuffer(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftProgram(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftVertexArray(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftBuffer(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftUniform {
    program: u32,
    name: Rc<str>,
}

/// One `draw_triangles` call.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub origin: String,
    /// `None` for the default framebuffer.
    pub target: Option<SoftFramebuffer>,
    pub uniforms: HashMap<String, UniformValue>,
}

impl DrawRecord {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRecord {
    pub texture: SoftTexture,
    pub mode: UploadMode,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone)]
struct Image {
    w: i32,
    h: i32,
    texels: Vec<Vec4>,
}

impl Image {
    fn new(w: i32, h: i32) -> Self {
        Self {
            w,
            h,
            texels: vec![Vec4::ZERO; (w.max(0) * h.max(0)) as usize],
        }
    }

    fn clear(&mut self, color: Vec4) {
        self.texels.iter_mut().for_each(|t| *t = color);
    }

    /// Nearest texel, clamp to edge. Row 0 is `v = 0`.
    fn sample(&self, uv: Vec2) -> Vec4 {
        if self.w <= 0 || self.h <= 0 {
            return Vec4::ZERO;
        }
        let x = ((uv.x * self.w as f32).floor() as i32).clamp(0, self.w - 1);
        let y = ((uv.y * self.h as f32).floor() as i32).clamp(0, self.h - 1);
        self.texels[(y * self.w + x) as usize]
    }

    fn size(&self) -> Vec2 {
        Vec2::new(self.w as f32, self.h as f32)
    }
}

#[derive(Debug)]
struct ProgramState {
    origin: String,
    vert: String,
    frag: String,
    uniforms: HashMap<String, UniformValue>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    textures: HashMap<u32, Image>,
    framebuffers: HashMap<u32, u32>,
    programs: HashMap<u32, ProgramState>,
    vertex_arrays: HashSet<u32>,
    buffers: HashSet<u32>,
    double_frees: u32,

    fail_origin: Option<String>,
    texture_budget: Option<usize>,

    target: Option<u32>,
    current_program: Option<u32>,
    units: HashMap<u32, u32>,
    screen: Option<Image>,
    passes_begun: usize,

    uploads: Vec<UploadRecord>,
    draws: Vec<DrawRecord>,
}

impl State {
    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn texture(&self, id: u32) -> &Image {
        self.textures
            .get(&id)
            .unwrap_or_else(|| panic!("use of deleted texture {id}"))
    }
}

type PassHook = Box<dyn FnMut(usize)>;

/// Shared handle; clones see the same objects.
#[derive(Clone, Default)]
pub struct SoftGpu {
    state: Rc<RefCell<State>>,
    hook: Rc<RefCell<Option<PassHook>>>,
}

impl fmt::Debug for SoftGpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("SoftGpu")
            .field("live_objects", &self.live_objects())
            .field("draws", &s.draws.len())
            .field("double_frees", &s.double_frees)
            .finish()
    }
}

impl SoftGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make linking fail for programs built under `origin`.
    pub fn fail_compile(&self, origin: &str) {
        self.state.borrow_mut().fail_origin = Some(origin.to_string());
    }

    /// Fail texture creation once `n` textures are live.
    pub fn limit_textures(&self, n: usize) {
        self.state.borrow_mut().texture_budget = Some(n);
    }

    /// Called at the start of every pass with the pass index since the last `clear_draws`.
    pub fn set_pass_hook(&self, hook: impl FnMut(usize) + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }

    pub fn live_objects(&self) -> usize {
        let s = self.state.borrow();
        s.textures.len()
            + s.framebuffers.len()
            + s.programs.len()
            + s.vertex_arrays.len()
            + s.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn double_frees(&self) -> u32 {
        self.state.borrow().double_frees
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.state.borrow().uploads.clone()
    }

    pub fn clear_draws(&self) {
        let mut s = self.state.borrow_mut();
        s.draws.clear();
        s.passes_begun = 0;
    }

    pub fn screen_size(&self) -> Option<(i32, i32)> {
        self.state.borrow().screen.as_ref().map(|i| (i.w, i.h))
    }

    /// Default-framebuffer pixel; `y = 0` is the bottom row.
    pub fn screen_pixel(&self, x: i32, y: i32) -> Option<[f32; 4]> {
        let s = self.state.borrow();
        let img = s.screen.as_ref()?;
        if x < 0 || y < 0 || x >= img.w || y >= img.h {
            return None;
        }
        Some(img.texels[(y * img.w + x) as usize].to_array())
    }

    pub fn screen_rgba(&self) -> Vec<[f32; 4]> {
        self.state
            .borrow()
            .screen
            .as_ref()
            .map(|i| i.texels.iter().map(|t| t.to_array()).collect())
            .unwrap_or_default()
    }

    /// Texel contents of a live texture, row 0 first.
    pub fn texture_rgba(&self, tex: SoftTexture) -> Vec<[f32; 4]> {
        self.state.borrow().texture(tex.0).texels.iter().map(|t| t.to_array()).collect()
    }

    fn note_free(&self, removed: bool) {
        if !removed {
            self.state.borrow_mut().double_frees += 1;
        }
    }
}

/// Occurrences of `ident` in `src` not embedded in a longer identifier.
fn count_ident(src: &str, ident: &str) -> usize {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    src.match_indices(ident)
        .filter(|(i, _)| {
            let before = src[..*i].chars().next_back();
            let after = src[i + ident.len()..].chars().next();
            !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
        })
        .count()
}

fn declares(src: &str, prefix: &str, ident: &str) -> bool {
    src.lines().any(|l| {
        let l = l.trim();
        l.starts_with(prefix) && l.trim_end_matches(';').split_whitespace().last() == Some(ident)
    })
}

fn float(u: &HashMap<String, UniformValue>, name: &str, default: f32) -> f32 {
    u.get(name).and_then(UniformValue::as_f32).unwrap_or(default)
}

fn vec2(u: &HashMap<String, UniformValue>, name: &str) -> Vec2 {
    match u.get(name) {
        Some(UniformValue::Vec2(v)) => *v,
        _ => Vec2::ZERO,
    }
}

fn mat4(u: &HashMap<String, UniformValue>, name: &str) -> Mat4 {
    match u.get(name) {
        Some(UniformValue::Mat4(m)) => *m,
        _ => Mat4::IDENTITY,
    }
}

fn noise(co: Vec2) -> f32 {
    let x = co.dot(Vec2::new(12.9898, 78.233)).sin() * 43758.5453;
    x - x.floor()
}

fn opaque(rgb: Vec3) -> Vec4 {
    rgb.extend(1.0)
}

/// Model-space texcoord of the quad point seen through NDC `ndc`, if the ray hits it.
fn unproject_quad(inv: Mat4, ndc: Vec2) -> Option<Vec2> {
    let near = inv.project_point3(ndc.extend(-1.0));
    let far = inv.project_point3(ndc.extend(1.0));
    let dz = far.z - near.z;
    if dz.abs() < 1e-9 {
        return None;
    }
    let t = -near.z / dz;
    let p = near + (far - near) * t;
    (p.x.abs() <= 1.0 && p.y.abs() <= 1.0).then(|| (p.truncate() + Vec2::ONE) * 0.5)
}

/// Run the stage named by `origin` for one output pixel at `uv`.
fn shade(origin: &str, u: &HashMap<String, UniformValue>, src: &Image, uv: Vec2, mvp_inv: Mat4) -> Vec4 {
    match origin {
        "builtin:dewarp" => {
            let profile = match u.get("u_lens_profile") {
                Some(UniformValue::Vec4(v)) => LensProfile::from_coefficients(&v.to_array()),
                _ => LensProfile::default(),
            };
            let rotation = match u.get("u_rotation") {
                Some(UniformValue::Vec3(v)) => *v,
                _ => Vec3::ZERO,
            };
            let params = DewarpParams {
                profile,
                rotation,
                tan_half_fov: float(u, "u_tan_half_fov", 1.0),
                lambda_offset: float(u, "u_lambda_offset", 0.0),
                video_size: vec2(u, "u_video_size"),
            };
            match params.source_uv(uv) {
                Some(tab) => opaque(src.sample(tab).truncate()),
                None => Vec4::new(0.0, 0.0, 0.0, 1.0),
            }
        }
        "builtin:perspective" => {
            let ndc = uv * 2.0 - Vec2::ONE;
            match unproject_quad(mvp_inv, ndc) {
                Some(tc) => src.sample(tc),
                None => Vec4::new(0.0, 0.0, 0.0, 1.0),
            }
        }
        "builtin:sharpen" => {
            let texel = Vec2::ONE / src.size();
            let at = |d: Vec2| src.sample(uv + d).truncate();
            let c = at(Vec2::ZERO);
            let n = at(Vec2::new(0.0, -texel.y));
            let e = at(Vec2::new(texel.x, 0.0));
            let s = at(Vec2::new(0.0, texel.y));
            let w = at(Vec2::new(-texel.x, 0.0));
            let max_g = c.y.max(n.y.max(e.y)).max(s.y.max(w.y));
            let min_g = c.y.min(n.y.min(e.y)).min(s.y.min(w.y));
            let sharpness = float(u, "u_sharpness", 0.0);
            let mut a = ((min_g.min(1.0 - max_g)).max(0.0) / max_g.max(1e-5)).sqrt();
            a *= -0.125 - 0.075 * sharpness;
            opaque((c + (n + e + s + w) * a) / (1.0 + 4.0 * a))
        }
        "builtin:grain" => {
            let c = src.sample(uv).truncate();
            let frame = match u.get("u_frame_counter") {
                Some(UniformValue::Uint(n)) => *n as f32,
                _ => 0.0,
            };
            let offset = frame / 15.0;
            let g = noise(Vec2::new(uv.x + offset, uv.y - offset));
            opaque(c.lerp(Vec3::splat(g), float(u, "u_grain_strength", 0.0)))
        }
        "builtin:edge_detect" => {
            let t = vec2(u, "u_texel");
            let i = |dx: f32, dy: f32| src.sample(uv + Vec2::new(dx * t.x, dy * t.y)).truncate().length();
            let (tl, l, bl) = (i(-1.0, 1.0), i(-1.0, 0.0), i(-1.0, -1.0));
            let (tp, b) = (i(0.0, 1.0), i(0.0, -1.0));
            let (tr, r, br) = (i(1.0, 1.0), i(1.0, 0.0), i(1.0, -1.0));
            let x = tl + 2.0 * l + bl - tr - 2.0 * r - br;
            let y = -tl - 2.0 * tp - tr + bl + 2.0 * b + br;
            let edge = (x * x + y * y).sqrt();
            let c = src.sample(uv).truncate();
            opaque(c - Vec3::splat(edge * float(u, "u_edge_strength", 0.0)))
        }
        "builtin:present" => src.sample(Vec2::new(uv.x, 1.0 - uv.y)),
        _ => src.sample(uv),
    }
}

impl GpuBackend for SoftGpu {
    type Texture = SoftTexture;
    type Framebuffer = SoftFramebuffer;
    type Program = SoftProgram;
    type VertexArray = SoftVertexArray;
    type Buffer = SoftBuffer;
    type UniformLocation = SoftUniform;

    unsafe fn create_texture(
        &self,
        w: i32,
        h: i32,
        _filter: TextureFilter,
    ) -> Result<SoftTexture, EngineError> {
        let mut s = self.state.borrow_mut();
        if w <= 0 || h <= 0 {
            return Err(EngineError::GlCreate(format!("texture {w}x{h}")));
        }
        if s.texture_budget.is_some_and(|n| s.textures.len() >= n) {
            return Err(EngineError::GlCreate("texture budget exhausted".into()));
        }
        let id = s.id();
        s.textures.insert(id, Image::new(w, h));
        Ok(SoftTexture(id))
    }

    unsafe fn upload_rgba(&self, tex: SoftTexture, w: i32, h: i32, rgba: &[u8], mode: UploadMode) {
        let mut s = self.state.borrow_mut();
        let img = s
            .textures
            .get_mut(&tex.0)
            .unwrap_or_else(|| panic!("upload to deleted texture {}", tex.0));
        if mode == UploadMode::SubImage {
            assert_eq!((img.w, img.h), (w, h), "sub-image upload must match allocation");
        }
        *img = Image::new(w, h);
        for (t, px) in img.texels.iter_mut().zip(rgba.chunks_exact(4)) {
            *t = Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) / 255.0;
        }
        s.uploads.push(UploadRecord { texture: tex, mode, w, h });
    }

    unsafe fn delete_texture(&self, tex: SoftTexture) {
        let removed = self.state.borrow_mut().textures.remove(&tex.0).is_some();
        self.note_free(removed);
    }

    unsafe fn create_framebuffer(&self, tex: SoftTexture) -> Result<SoftFramebuffer, EngineError> {
        let mut s = self.state.borrow_mut();
        s.texture(tex.0);
        let id = s.id();
        s.framebuffers.insert(id, tex.0);
        Ok(SoftFramebuffer(id))
    }

    unsafe fn delete_framebuffer(&self, fbo: SoftFramebuffer) {
        let removed = self.state.borrow_mut().framebuffers.remove(&fbo.0).is_some();
        self.note_free(removed);
    }

    unsafe fn link_program(&self, vert: &str, frag: &str, origin: &str) -> Result<SoftProgram, EngineError> {
        let mut s = self.state.borrow_mut();
        if s.fail_origin.as_deref() == Some(origin) {
            return Err(EngineError::FragmentCompile {
                origin: origin.to_string(),
                log: "0:1(1): error: forced failure".to_string(),
                source_text: numbered_listing(frag),
            });
        }
        let id = s.id();
        s.programs.insert(
            id,
            ProgramState {
                origin: origin.to_string(),
                vert: vert.to_string(),
                frag: frag.to_string(),
                uniforms: HashMap::new(),
            },
        );
        Ok(SoftProgram(id))
    }

    unsafe fn delete_program(&self, program: SoftProgram) {
        let mut s = self.state.borrow_mut();
        let removed = s.programs.remove(&program.0).is_some();
        if s.current_program == Some(program.0) {
            s.current_program = None;
        }
        drop(s);
        self.note_free(removed);
    }

    unsafe fn attrib_location(&self, program: SoftProgram, name: &str) -> Option<u32> {
        let s = self.state.borrow();
        let p = s
            .programs
            .get(&program.0)
            .unwrap_or_else(|| panic!("query on deleted program {}", program.0));
        if !declares(&p.vert, "in ", name) || count_ident(&p.vert, name) < 2 {
            return None;
        }
        p.vert
            .lines()
            .filter(|l| l.trim().starts_with("in "))
            .position(|l| declares(l, "in ", name))
            .map(|i| i as u32)
    }

    unsafe fn uniform_location(&self, program: SoftProgram, name: &str) -> Option<SoftUniform> {
        let s = self.state.borrow();
        let p = s
            .programs
            .get(&program.0)
            .unwrap_or_else(|| panic!("query on deleted program {}", program.0));
        let declared = declares(&p.vert, "uniform ", name) || declares(&p.frag, "uniform ", name);
        let uses = count_ident(&p.vert, name) + count_ident(&p.frag, name);
        (declared && uses >= 2).then(|| SoftUniform {
            program: program.0,
            name: Rc::from(name),
        })
    }

    unsafe fn create_vertex_array(&self) -> Result<SoftVertexArray, EngineError> {
        let mut s = self.state.borrow_mut();
        let id = s.id();
        s.vertex_arrays.insert(id);
        Ok(SoftVertexArray(id))
    }

    unsafe fn create_vertex_buffer(
        &self,
        vao: SoftVertexArray,
        _slot: u32,
        components: i32,
        data: &[f32],
    ) -> Result<SoftBuffer, EngineError> {
        let mut s = self.state.borrow_mut();
        assert!(s.vertex_arrays.contains(&vao.0), "buffer for deleted vao {}", vao.0);
        assert_eq!(data.len() % components as usize, 0, "ragged vertex data");
        let id = s.id();
        s.buffers.insert(id);
        Ok(SoftBuffer(id))
    }

    unsafe fn delete_vertex_array(&self, vao: SoftVertexArray) {
        let removed = self.state.borrow_mut().vertex_arrays.remove(&vao.0);
        self.note_free(removed);
    }

    unsafe fn delete_buffer(&self, buffer: SoftBuffer) {
        let removed = self.state.borrow_mut().buffers.remove(&buffer.0);
        self.note_free(removed);
    }

    unsafe fn begin_pass(&self, target: Option<SoftFramebuffer>, w: i32, h: i32) {
        let index = {
            let mut s = self.state.borrow_mut();
            let black = Vec4::new(0.0, 0.0, 0.0, 1.0);
            match target {
                Some(fbo) => {
                    let tex = *s
                        .framebuffers
                        .get(&fbo.0)
                        .unwrap_or_else(|| panic!("bind of deleted framebuffer {}", fbo.0));
                    let img = s
                        .textures
                        .get_mut(&tex)
                        .unwrap_or_else(|| panic!("framebuffer {} lost its texture", fbo.0));
                    assert_eq!((img.w, img.h), (w, h), "viewport must cover the target");
                    img.clear(black);
                    s.target = Some(fbo.0);
                }
                None => {
                    let mut screen = Image::new(w, h);
                    screen.clear(black);
                    s.screen = Some(screen);
                    s.target = None;
                }
            }
            s.passes_begun += 1;
            s.passes_begun - 1
        };
        if let Some(hook) = self.hook.borrow_mut().as_mut() {
            hook(index);
        }
    }

    unsafe fn use_program(&self, program: SoftProgram) {
        let mut s = self.state.borrow_mut();
        assert!(s.programs.contains_key(&program.0), "use of deleted program {}", program.0);
        s.current_program = Some(program.0);
    }

    unsafe fn bind_texture(&self, unit: u32, tex: SoftTexture) {
        let mut s = self.state.borrow_mut();
        s.texture(tex.0);
        s.units.insert(unit, tex.0);
    }

    unsafe fn upload_uniform(&self, location: &SoftUniform, value: &UniformValue) {
        let mut s = self.state.borrow_mut();
        let p = s
            .programs
            .get_mut(&location.program)
            .unwrap_or_else(|| panic!("uniform on deleted program {}", location.program));
        p.uniforms.insert(location.name.to_string(), *value);
    }

    unsafe fn draw_triangles(&self, vao: SoftVertexArray, count: i32) {
        let mut s = self.state.borrow_mut();
        assert!(s.vertex_arrays.contains(&vao.0), "draw with deleted vao {}", vao.0);
        assert_eq!(count, 6, "quad draws six vertices");
        let program = s.current_program.expect("draw without a program");
        let (origin, uniforms) = {
            let p = &s.programs[&program];
            (p.origin.clone(), p.uniforms.clone())
        };
        let input = s
            .units
            .get(&0)
            .map(|t| s.texture(*t).clone())
            .unwrap_or_else(|| Image::new(1, 1));

        let mvp = mat4(&uniforms, "u_projection") * mat4(&uniforms, "u_view") * mat4(&uniforms, "u_model");
        let mvp_inv = mvp.inverse();

        let target = s.target;
        let (w, h) = match target {
            Some(fbo) => {
                let img = s.texture(s.framebuffers[&fbo]);
                (img.w, img.h)
            }
            None => s.screen.as_ref().map(|i| (i.w, i.h)).unwrap_or((1, 1)),
        };
        let mut out = Image::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let uv = Vec2::new((x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32);
                let c = shade(&origin, &uniforms, &input, uv, mvp_inv);
                out.texels[(y * w + x) as usize] = c.clamp(Vec4::ZERO, Vec4::ONE);
            }
        }

        match target {
            Some(fbo) => {
                let tex = s.framebuffers[&fbo];
                s.textures.insert(tex, out);
            }
            None => s.screen = Some(out),
        }
        s.draws.push(DrawRecord {
            origin,
            target: target.map(SoftFramebuffer),
            uniforms,
        });
    }
}
