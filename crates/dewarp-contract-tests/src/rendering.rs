#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_4;

    use dewarp_core::EngineError;
    use dewarp_graph::{
        AttributeDecl, PostPass, ShaderStage, StageManifest, UniformDecl, UniformKind, UniformValue,
    };
    use dewarp_lens::LensProfile;
    use dewarp_runtime_glow::{QuadMesh, SampleOutcome, ShaderProgram, TickOutcome, ViewportRect};
    use glam::{Vec2, Vec3, Vec4};

    use crate::support::*;
    use crate::SoftGpu;

    const COLOR: [u8; 4] = [200, 100, 50, 255];

    fn color_f32() -> [f32; 3] {
        [200.0 / 255.0, 100.0 / 255.0, 50.0 / 255.0]
    }

    fn origins(gpu: &SoftGpu) -> Vec<String> {
        gpu.draws().into_iter().map(|d| d.origin).collect()
    }

    #[test]
    fn lens_center_reaches_the_screen_and_corners_stay_black() {
        let mut rig = configured(small_config(&[PostPass::Sharpen]));
        let frame = solid_frame(2, 2, COLOR);
        rig.graph.start(&as_source(&frame)).unwrap();

        let out = unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        assert_eq!(
            out,
            TickOutcome::Rendered {
                frame: 1,
                sample: SampleOutcome::Captured,
                dewarp: true
            }
        );

        assert_eq!(rig.gpu.screen_size(), Some((64, 64)));
        assert_rgb_close(rig.gpu.screen_pixel(32, 32).unwrap(), color_f32(), 1e-4);
        for (x, y) in [(0, 0), (63, 0), (0, 63), (63, 63)] {
            assert_rgb_close(rig.gpu.screen_pixel(x, y).unwrap(), [0.0; 3], 1e-6);
        }
    }

    #[test]
    fn passes_run_in_plan_order_through_distinct_targets() {
        let mut rig = configured(small_config(&[PostPass::Sharpen, PostPass::Grain]));
        let frame = solid_frame(4, 4, COLOR);
        rig.graph.start(&as_source(&frame)).unwrap();
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();

        let draws = rig.gpu.draws();
        assert_eq!(
            origins(&rig.gpu),
            ["builtin:dewarp", "builtin:sharpen", "builtin:grain", "builtin:present"]
        );
        let targets: Vec<_> = draws.iter().map(|d| d.target).collect();
        assert!(targets[..3].iter().all(Option::is_some));
        assert_eq!(targets[3], None);
        assert_ne!(targets[0], targets[1]);
        assert_ne!(targets[1], targets[2]);

        for d in &draws {
            assert_eq!(d.uniform("u_texture"), Some(UniformValue::Sampler2D(0)), "{}", d.origin);
        }
    }

    #[test]
    fn orientation_is_read_once_per_tick() {
        let mut rig = configured(small_config(&[PostPass::Sharpen]));
        let frame = solid_frame(2, 2, COLOR);
        rig.graph.start(&as_source(&frame)).unwrap();

        let writer = rig.orientation.clone();
        rig.gpu.set_pass_hook(move |pass| {
            if pass == 0 {
                writer.set_rotation(Vec3::new(0.3, 0.0, 0.0));
            }
        });

        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        let first = rig.gpu.draws()[0].uniform("u_rotation");
        assert_eq!(first, Some(UniformValue::Vec3(Vec3::ZERO)));

        rig.gpu.clear_draws();
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        let second = rig.gpu.draws()[0].uniform("u_rotation");
        assert_eq!(second, Some(UniformValue::Vec3(Vec3::new(0.3, 0.0, 0.0))));
    }

    #[test]
    fn dewarp_toggle_takes_effect_on_the_next_tick() {
        let mut rig = configured(small_config(&[]));
        let frame = solid_frame(2, 2, COLOR);
        rig.graph.start(&as_source(&frame)).unwrap();

        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        assert_eq!(origins(&rig.gpu)[0], "builtin:dewarp");

        rig.graph.set_dewarp_enabled(false);
        rig.gpu.clear_draws();
        let out = unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        assert!(matches!(out, TickOutcome::Rendered { dewarp: false, .. }));
        assert_eq!(origins(&rig.gpu), ["builtin:perspective", "builtin:present"]);

        rig.graph.set_dewarp_enabled(true);
        rig.gpu.clear_draws();
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        assert_eq!(origins(&rig.gpu)[0], "builtin:dewarp");
    }

    #[test]
    fn perspective_view_rolls_with_rotation_z() {
        let mut rig = configured(small_config(&[]));
        rig.graph.set_dewarp_enabled(false);
        rig.orientation.set_rotation(Vec3::new(0.0, 0.0, FRAC_PI_4));
        let frame = solid_frame(2, 2, COLOR);
        rig.graph.start(&as_source(&frame)).unwrap();
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();

        assert_rgb_close(rig.gpu.screen_pixel(32, 32).unwrap(), color_f32(), 1e-4);
        // A quad rolled by 45° no longer reaches the corners.
        assert_rgb_close(rig.gpu.screen_pixel(0, 0).unwrap(), [0.0; 3], 1e-6);
        assert_rgb_close(rig.gpu.screen_pixel(63, 63).unwrap(), [0.0; 3], 1e-6);
    }

    #[test]
    fn lens_profile_update_reaches_the_next_draw() {
        let mut rig = configured(small_config(&[]));
        let frame = solid_frame(2, 2, COLOR);
        rig.graph.start(&as_source(&frame)).unwrap();
        rig.graph.set_lens_profile(LensProfile::from_coefficients(&[1.0, 2.0]));
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();

        let lens = rig.gpu.draws()[0].uniform("u_lens_profile");
        assert_eq!(lens, Some(UniformValue::Vec4(Vec4::new(0.0, 0.0, 1.0, 2.0))));
    }

    #[test]
    fn edge_detect_leaves_flat_regions_untouched() {
        let mut rig = configured(small_config(&[PostPass::EdgeDetect]));
        let frame = solid_frame(2, 2, COLOR);
        rig.graph.start(&as_source(&frame)).unwrap();
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();

        let edge = rig
            .gpu
            .draws()
            .into_iter()
            .find(|d| d.origin == "builtin:edge_detect")
            .unwrap();
        assert_eq!(edge.uniform("u_texel"), Some(UniformValue::Vec2(Vec2::splat(1.0 / 64.0))));
        assert_eq!(edge.uniform("u_edge_strength"), Some(UniformValue::Float(0.5)));
        assert_rgb_close(rig.gpu.screen_pixel(32, 32).unwrap(), color_f32(), 1e-4);
    }

    #[test]
    fn grain_is_deterministic_per_frame_counter() {
        let run = |ticks: usize| {
            let mut rig = configured(small_config(&[PostPass::Grain]));
            let frame = solid_frame(2, 2, COLOR);
            rig.graph.start(&as_source(&frame)).unwrap();
            let mut screens = Vec::new();
            for _ in 0..ticks {
                unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
                screens.push(rig.gpu.screen_rgba());
            }
            let counters: Vec<_> = rig
                .gpu
                .draws()
                .iter()
                .filter_map(|d| d.uniform("u_frame_counter"))
                .collect();
            (screens, counters)
        };

        let (a, counters) = run(2);
        let (b, _) = run(2);
        assert_eq!(a, b, "same frame counter, same noise");
        assert_ne!(a[0], a[1], "noise moves with the frame counter");
        assert_eq!(counters, [UniformValue::Uint(1), UniformValue::Uint(2)]);
    }

    #[test]
    fn screen_follows_viewport_and_never_collapses() {
        let mut rig = configured(small_config(&[]));
        let frame = solid_frame(2, 2, COLOR);
        rig.graph.start(&as_source(&frame)).unwrap();

        rig.viewport.set(ViewportRect::sized(32, 16));
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        assert_eq!(rig.gpu.screen_size(), Some((32, 16)));

        rig.viewport.set(ViewportRect::sized(0, 0));
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        assert_eq!(rig.gpu.screen_size(), Some((1, 1)));
    }

    const UNUSED_FRAG: &str = "#version 330 core
in vec2 v_texcoord;
uniform sampler2D u_texture;
uniform float u_unused;
out vec4 color;
void main() { color = texture(u_texture, v_texcoord); }
";

    const UNUSED_STAGE: ShaderStage = ShaderStage {
        source: UNUSED_FRAG,
        manifest: StageManifest {
            attributes: &[],
            uniforms: &[
                UniformDecl { name: "u_texture", kind: UniformKind::Sampler2D },
                UniformDecl { name: "u_unused", kind: UniformKind::Float },
            ],
        },
    };

    #[test]
    fn inactive_uniforms_are_pruned_and_skipped() {
        let gpu = SoftGpu::new();
        let program =
            unsafe { ShaderProgram::compile(&gpu, None, Some(&UNUSED_STAGE), "test:unused") }.unwrap();

        assert!(program.has_uniform("u_texture"));
        assert!(program.has_uniform("u_matrix"), "default vertex stage binds u_matrix");
        assert!(!program.has_uniform("u_unused"));
        assert_eq!(program.attribute("a_position"), Some(0));
        assert_eq!(program.attribute("a_texcoord"), Some(1));

        unsafe {
            assert!(!program.set_uniform(&gpu, "u_unused", &UniformValue::Float(1.0)));
            // Kind mismatch is dropped.
            assert!(!program.set_uniform(&gpu, "u_texture", &UniformValue::Float(1.0)));
            assert!(program.set_uniform(&gpu, "u_texture", &UniformValue::Sampler2D(0)));
        }
    }

    const NO_POSITION_VERT: &str = "#version 330 core
in vec3 a_position;
in vec2 a_texcoord;
out vec2 v_texcoord;
void main() {
    v_texcoord = a_texcoord;
    gl_Position = vec4(0.0);
}
";

    const NO_POSITION_STAGE: ShaderStage = ShaderStage {
        source: NO_POSITION_VERT,
        manifest: StageManifest {
            attributes: &[
                AttributeDecl { name: "a_position", components: 3 },
                AttributeDecl { name: "a_texcoord", components: 2 },
            ],
            uniforms: &[],
        },
    };

    #[test]
    fn quad_requires_an_active_position_attribute() {
        let gpu = SoftGpu::new();
        let mut program =
            unsafe { ShaderProgram::compile(&gpu, Some(&NO_POSITION_STAGE), None, "test:no_position") }
                .unwrap();
        assert_eq!(program.attribute("a_position"), None);

        let err = unsafe { QuadMesh::new(&gpu, &program) }.unwrap_err();
        assert!(
            matches!(&err, EngineError::MissingAttribute { name, .. } if name == "a_position"),
            "{err}"
        );
        unsafe { program.destroy(&gpu) };
        assert_eq!(gpu.live_objects(), 0);
    }
}
