#[cfg(test)]
mod tests {
    use dewarp_core::EngineError;
    use dewarp_graph::PostPass;
    use dewarp_runtime_glow::{Phase, RenderGraph, SampleOutcome, TickOutcome};

    use crate::support::*;
    use crate::SoftGpu;

    #[test]
    fn shutdown_releases_everything_and_is_idempotent() {
        let mut rig = configured(small_config(&[PostPass::Sharpen, PostPass::Grain]));
        assert_eq!(rig.graph.phase(), Phase::Ready);
        assert!(rig.gpu.live_objects() > 0);
        assert_eq!(rig.gpu.live_programs(), 6, "one program per built-in pass");

        unsafe {
            rig.graph.shutdown(&rig.gpu);
            rig.graph.shutdown(&rig.gpu);
        }
        assert_eq!(rig.graph.phase(), Phase::ShutDown);
        assert_eq!(rig.gpu.live_objects(), 0);
        assert_eq!(rig.gpu.double_frees(), 0);
    }

    #[test]
    fn compile_failure_leaves_nothing_allocated() {
        let gpu = SoftGpu::new();
        gpu.fail_compile("builtin:sharpen");
        let mut graph = RenderGraph::new(small_config(&[PostPass::Sharpen])).unwrap();

        let err = unsafe { graph.configure(&gpu, viewport(64, 64), axis_lens(), level_orientation()) }
            .expect_err("sharpen must fail to link");
        match &err {
            EngineError::FragmentCompile { origin, source_text, .. } => {
                assert_eq!(origin, "builtin:sharpen");
                assert!(source_text.contains("u_sharpness"));
                assert!(source_text.contains("   1| #version 330 core"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_fatal_setup());

        assert_eq!(graph.phase(), Phase::Uninitialized);
        assert_eq!(gpu.live_objects(), 0);
        unsafe { graph.shutdown(&gpu) };
        assert_eq!(gpu.double_frees(), 0);
    }

    #[test]
    fn target_allocation_failure_cleans_up() {
        let gpu = SoftGpu::new();
        // Sampler texture and stage target fit; the first ping-pong target does not.
        gpu.limit_textures(2);
        let mut graph = RenderGraph::new(small_config(&[PostPass::Sharpen])).unwrap();

        let err = unsafe { graph.configure(&gpu, viewport(64, 64), axis_lens(), level_orientation()) }
            .expect_err("texture budget exhausted");
        assert!(matches!(err, EngineError::GlCreate(_)), "{err}");
        assert_eq!(gpu.live_objects(), 0);
        assert_eq!(gpu.double_frees(), 0);
    }

    #[test]
    fn start_before_configure_is_invalid_state() {
        let mut graph: RenderGraph<SoftGpu> = RenderGraph::new(small_config(&[])).unwrap();
        let frame = solid_frame(2, 2, [255, 0, 0, 255]);
        let err = graph.start(&as_source(&frame)).unwrap_err();
        assert!(
            matches!(err, EngineError::InvalidState { op: "start", state: "uninitialized" }),
            "{err}"
        );
    }

    #[test]
    fn start_after_shutdown_is_invalid_state() {
        let mut rig = configured(small_config(&[]));
        unsafe { rig.graph.shutdown(&rig.gpu) };
        let frame = solid_frame(2, 2, [255, 0, 0, 255]);
        let err = rig.graph.start(&as_source(&frame)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { op: "start", .. }), "{err}");
    }

    #[test]
    fn configure_twice_is_rejected() {
        let mut rig = configured(small_config(&[]));
        let before = rig.gpu.live_objects();
        let err = unsafe {
            rig.graph
                .configure(&rig.gpu, rig.viewport.clone(), axis_lens(), rig.orientation.clone())
        }
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { op: "configure", state: "ready" }));
        assert_eq!(rig.gpu.live_objects(), before);
    }

    #[test]
    fn ticks_outside_running_are_inert() {
        let mut rig = configured(small_config(&[]));
        assert_eq!(unsafe { rig.graph.tick(&rig.gpu) }.unwrap(), TickOutcome::Inactive);
        assert!(rig.gpu.draws().is_empty());

        let frame = solid_frame(2, 2, [255, 0, 0, 255]);
        let source = as_source(&frame);
        rig.graph.start(&source).unwrap();
        rig.graph.stop();
        assert_eq!(rig.graph.phase(), Phase::Stopped);
        assert_eq!(unsafe { rig.graph.tick(&rig.gpu) }.unwrap(), TickOutcome::Inactive);
        assert!(rig.gpu.draws().is_empty());
        assert_eq!(rig.graph.frame_counter(), 0);
    }

    #[test]
    fn dropped_source_turns_ticks_idle() {
        let mut rig = configured(small_config(&[]));
        let frame = solid_frame(2, 2, [255, 0, 0, 255]);
        let source = as_source(&frame);
        rig.graph.start(&source).unwrap();
        drop(source);
        drop(frame);

        for _ in 0..3 {
            assert_eq!(unsafe { rig.graph.tick(&rig.gpu) }.unwrap(), TickOutcome::Idle);
        }
        assert!(rig.gpu.draws().is_empty());
        assert_eq!(rig.graph.phase(), Phase::Running);
    }

    #[test]
    fn source_without_a_frame_draws_nothing_until_first_capture() {
        let mut rig = configured(small_config(&[PostPass::Sharpen]));
        let frame = solid_frame(1, 1, [0, 255, 0, 255]);
        *frame.borrow_mut() = image::RgbaImage::new(0, 0);
        let source = as_source(&frame);
        rig.graph.start(&source).unwrap();

        for _ in 0..3 {
            assert_eq!(unsafe { rig.graph.tick(&rig.gpu) }.unwrap(), TickOutcome::Idle);
        }
        assert!(rig.gpu.draws().is_empty());
        assert_eq!(rig.graph.frame_counter(), 0);

        *frame.borrow_mut() = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 255]));
        let out = unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        assert!(
            matches!(out, TickOutcome::Rendered { frame: 1, sample: SampleOutcome::Captured, .. }),
            "{out:?}"
        );
        assert_rgb_close(rig.gpu.screen_pixel(32, 32).unwrap(), [0.0, 1.0, 0.0], 1e-4);
    }

    #[test]
    fn restart_after_stop_renders_again() {
        let mut rig = configured(small_config(&[]));
        let frame = solid_frame(2, 2, [0, 255, 0, 255]);
        let source = as_source(&frame);
        rig.graph.start(&source).unwrap();
        rig.graph.stop();
        rig.graph.start(&source).unwrap();
        let out = unsafe { rig.graph.tick(&rig.gpu) }.unwrap();
        assert!(matches!(out, TickOutcome::Rendered { frame: 1, .. }), "{out:?}");
    }

    #[test]
    fn start_while_running_keeps_the_live_source() {
        let mut rig = configured(small_config(&[]));
        let red = solid_frame(2, 2, [255, 0, 0, 255]);
        let blue = solid_frame(2, 2, [0, 0, 255, 255]);
        let (red_src, blue_src) = (as_source(&red), as_source(&blue));

        rig.graph.start(&red_src).unwrap();
        rig.graph.start(&blue_src).unwrap();
        unsafe { rig.graph.tick(&rig.gpu) }.unwrap();

        let center = rig.gpu.screen_pixel(32, 32).unwrap();
        assert_rgb_close(center, [1.0, 0.0, 0.0], 1e-4);
    }
}
