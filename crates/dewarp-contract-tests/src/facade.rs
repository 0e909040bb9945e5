#[cfg(test)]
mod tests {
    use std::fs;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use dewarp_core::EngineError;
    use dewarp_lens::MountMode;
    use dewarp_runtime_glow::{DewarpView, FrameSource, TickOutcome, ViewConfig};
    use glam::{Vec2, Vec3};

    use crate::support::*;
    use crate::SoftGpu;

    const VIEW_SMALL_JSON: &str = include_str!("../fixtures/view_small.json");
    const VIEW_BAD_BUFFER_JSON: &str = include_str!("../fixtures/view_bad_buffer.json");
    const VIEW_BAD_FOV_JSON: &str = include_str!("../fixtures/view_bad_fov.json");
    const VIEW_UNKNOWN_PASS_JSON: &str = include_str!("../fixtures/view_unknown_pass.json");

    fn small_view(gpu: &SoftGpu) -> DewarpView<SoftGpu> {
        let path = write_temp_fixture("view_small", VIEW_SMALL_JSON);
        let cfg = ViewConfig::from_json_path(&path).expect("view_small.json should load");
        let _ = fs::remove_file(path);
        unsafe { DewarpView::new(gpu.clone(), viewport(64, 64), cfg) }.expect("view builds")
    }

    #[test]
    fn fixture_view_renders_and_drop_releases_everything() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        view.set_rotation(Vec3::ZERO);

        let frame = solid_frame(2, 2, [200, 100, 50, 255]);
        let source: Rc<dyn FrameSource> = frame.clone();
        view.start(&source).unwrap();
        let out = view.frame(Instant::now()).unwrap();
        assert!(matches!(out, TickOutcome::Rendered { frame: 1, dewarp: true, .. }), "{out:?}");
        assert_rgb_close(
            gpu.screen_pixel(32, 32).unwrap(),
            [200.0 / 255.0, 100.0 / 255.0, 50.0 / 255.0],
            1e-4,
        );

        assert!(gpu.live_objects() > 0);
        drop(view);
        assert_eq!(gpu.live_objects(), 0);
        assert_eq!(gpu.double_frees(), 0);
    }

    #[test]
    fn explicit_shutdown_then_drop_frees_once() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        view.shutdown();
        view.shutdown();
        assert!(view.controller().is_shut_down());
        drop(view);
        assert_eq!(gpu.live_objects(), 0);
        assert_eq!(gpu.double_frees(), 0);
    }

    #[test]
    fn bad_fixtures_are_rejected() {
        for (name, json) in [
            ("view_bad_buffer", VIEW_BAD_BUFFER_JSON),
            ("view_bad_fov", VIEW_BAD_FOV_JSON),
        ] {
            let path = write_temp_fixture(name, json);
            let err = ViewConfig::from_json_path(&path).expect_err("must be rejected");
            assert!(matches!(err, EngineError::InvalidConfig { .. }), "{name}: {err}");
            let _ = fs::remove_file(path);
        }

        let path = write_temp_fixture("view_unknown_pass", VIEW_UNKNOWN_PASS_JSON);
        let err = ViewConfig::from_json_path(&path).expect_err("unknown pass");
        assert!(matches!(err, EngineError::Json { .. }), "{err}");
        assert!(err.to_string().contains("bloom"), "{err}");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn set_fov_reports_the_clamped_value() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        let stored = view.set_fov(0.01);
        assert!((stored - 10f32.to_radians()).abs() < 1e-6);
        assert_eq!(view.orientation().snapshot().fov, stored);
    }

    #[test]
    fn set_ptz_goes_through_the_mount() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        view.set_ptz(0.2, -0.1, Some(0.05));
        let mut want = MountMode::Ceiling.rotation_for(0.2, -0.1);
        want.z += 0.05;
        assert_eq!(view.orientation().snapshot().rotation, want);
    }

    #[test]
    fn short_lens_profile_is_left_padded() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        view.set_lens_profile(&[1.0]);
        assert_eq!(view.graph().lens().profile.coefficients(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn drag_rotates_on_frames_until_release() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        view.set_rotation(Vec3::ZERO);
        let t0 = Instant::now();

        view.pointer_down(Vec2::new(48.0, 32.0), t0);
        view.frame(t0).unwrap();
        let after_one = view.orientation().snapshot().rotation;
        assert!(after_one.x > 0.0, "{after_one:?}");
        assert_eq!(after_one.y, 0.0);

        view.frame(t0).unwrap();
        assert!(view.orientation().snapshot().rotation.x > after_one.x);

        // Held long enough to not count as a click.
        view.pointer_up(Vec2::new(48.0, 32.0), t0 + Duration::from_secs(1));
        let released = view.orientation().snapshot().rotation;
        view.frame(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(view.orientation().snapshot().rotation, released);
        assert!(view.controller().is_idle());
    }

    #[test]
    fn wheel_batch_zooms_in_after_the_window() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        let t0 = Instant::now();
        let start_fov = view.orientation().snapshot().fov;

        view.wheel(60.0, t0);
        view.wheel(40.0, t0 + Duration::from_millis(5));
        view.frame(t0 + Duration::from_millis(10)).unwrap();
        assert_eq!(view.controller().target_updates(), 0, "window still open");

        view.frame(t0 + Duration::from_millis(25)).unwrap();
        assert_eq!(view.controller().target_updates(), 1);
        assert!((view.controller().target_fov() - start_fov / 1.2).abs() < 1e-5);

        let mut now = t0 + Duration::from_millis(25);
        for _ in 0..100 {
            now += Duration::from_millis(16);
            view.frame(now).unwrap();
        }
        assert!((view.orientation().snapshot().fov - start_fov / 1.2).abs() < 1e-5);
    }

    #[test]
    fn graph_fov_write_overrides_wheel_easing() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        let t0 = Instant::now();
        let start_fov = view.orientation().snapshot().fov;

        view.wheel(300.0, t0);
        view.frame(t0 + Duration::from_millis(25)).unwrap();
        assert!(view.orientation().snapshot().fov < start_fov, "easing started");

        view.graph().set_fov(0.5);
        let mut now = t0 + Duration::from_millis(25);
        for _ in 0..20 {
            now += Duration::from_millis(16);
            view.frame(now).unwrap();
        }
        assert_eq!(view.orientation().snapshot().fov, 0.5);
        assert_eq!(view.controller().target_fov(), 0.5);
        assert!(view.controller().is_idle());
    }

    #[test]
    fn stop_detaches_source_until_restarted() {
        let gpu = SoftGpu::new();
        let mut view = small_view(&gpu);
        let frame = solid_frame(2, 2, [0, 0, 0, 255]);
        let source: Rc<dyn FrameSource> = frame.clone();
        view.start(&source).unwrap();
        view.stop();
        assert_eq!(view.frame(Instant::now()).unwrap(), TickOutcome::Inactive);
        view.start(&source).unwrap();
        assert!(matches!(view.frame(Instant::now()).unwrap(), TickOutcome::Rendered { .. }));
    }
}
