#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use dewarp_runtime_glow::{
        CropMode, FrameSampler, FrameSource, RenderConfig, SampleOutcome, UploadMode,
    };
    use image::{Rgba, RgbaImage};

    use crate::support::*;
    use crate::SoftGpu;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

    /// 6x2: two red columns, two green, two blue.
    fn banded() -> RefCell<RgbaImage> {
        RefCell::new(RgbaImage::from_fn(6, 2, |x, _| match x {
            0 | 1 => Rgba([255, 0, 0, 255]),
            2 | 3 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        }))
    }

    #[test]
    fn first_tick_captures_then_every_stride() {
        let gpu = SoftGpu::new();
        let cfg = RenderConfig { capture_stride: 2, ..small_config(&[]) };
        let mut sampler = unsafe { FrameSampler::new(&gpu, &cfg) }.unwrap();
        let frame = solid_frame(8, 8, [10, 20, 30, 255]);
        let src: &dyn FrameSource = &*frame;

        let outcomes: Vec<_> = (0..4).map(|_| unsafe { sampler.feed(&gpu, Some(src)) }).collect();
        assert_eq!(
            outcomes,
            [
                SampleOutcome::Captured,
                SampleOutcome::Skipped,
                SampleOutcome::Captured,
                SampleOutcome::Skipped
            ]
        );
        assert_eq!(sampler.captures(), 2);
        assert_eq!(gpu.uploads().len(), 2);
    }

    #[test]
    fn ticks_without_a_frame_do_not_use_up_the_stride() {
        let gpu = SoftGpu::new();
        let cfg = RenderConfig { capture_stride: 2, ..small_config(&[]) };
        let mut sampler = unsafe { FrameSampler::new(&gpu, &cfg) }.unwrap();
        let frame = RefCell::new(RgbaImage::new(0, 0));
        let src: &dyn FrameSource = &frame;

        for _ in 0..3 {
            assert_eq!(unsafe { sampler.feed(&gpu, Some(src)) }, SampleOutcome::Idle);
        }
        *frame.borrow_mut() = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));

        let outcomes: Vec<_> = (0..3).map(|_| unsafe { sampler.feed(&gpu, Some(src)) }).collect();
        assert_eq!(
            outcomes,
            [SampleOutcome::Captured, SampleOutcome::Skipped, SampleOutcome::Captured]
        );
        assert_eq!(gpu.uploads().len(), 2);
    }

    #[test]
    fn upload_mode_follows_config() {
        for (sub_image, mode) in [(true, UploadMode::SubImage), (false, UploadMode::Respecify)] {
            let gpu = SoftGpu::new();
            let cfg = RenderConfig { sub_image_upload: sub_image, ..small_config(&[]) };
            let mut sampler = unsafe { FrameSampler::new(&gpu, &cfg) }.unwrap();
            let frame = solid_frame(128, 96, [1, 2, 3, 255]);
            let src: &dyn FrameSource = &*frame;
            unsafe { sampler.feed(&gpu, Some(src)) };

            let up = gpu.uploads();
            assert_eq!(up.len(), 1);
            assert_eq!((up[0].mode, up[0].w, up[0].h), (mode, 64, 64));
            assert_eq!(up[0].texture, sampler.texture());
        }
    }

    #[test]
    fn stretch_keeps_the_whole_frame() {
        let gpu = SoftGpu::new();
        let mut sampler = unsafe { FrameSampler::new(&gpu, &small_config(&[])) }.unwrap();
        let frame = banded();
        unsafe { sampler.feed(&gpu, Some(&frame as &dyn FrameSource)) };

        let texels = gpu.texture_rgba(sampler.texture());
        assert_eq!(texels[0], RED);
        assert_eq!(texels[63], BLUE);
    }

    #[test]
    fn center_square_crops_the_sides() {
        let gpu = SoftGpu::new();
        let cfg = RenderConfig { crop: CropMode::CenterSquare, ..small_config(&[]) };
        let mut sampler = unsafe { FrameSampler::new(&gpu, &cfg) }.unwrap();
        let frame = banded();
        unsafe { sampler.feed(&gpu, Some(&frame as &dyn FrameSource)) };

        let texels = gpu.texture_rgba(sampler.texture());
        assert!(texels.iter().all(|t| *t == GREEN));
    }

    #[test]
    fn missing_or_empty_frames_are_idle() {
        let gpu = SoftGpu::new();
        let mut sampler = unsafe { FrameSampler::new(&gpu, &small_config(&[])) }.unwrap();
        assert_eq!(unsafe { sampler.feed(&gpu, None) }, SampleOutcome::Idle);

        let empty = RefCell::new(RgbaImage::new(0, 0));
        let out = unsafe { sampler.feed(&gpu, Some(&empty as &dyn FrameSource)) };
        assert_eq!(out, SampleOutcome::Idle);
        assert!(gpu.uploads().is_empty());
        assert_eq!(sampler.captures(), 0);

        unsafe { sampler.destroy(&gpu) };
        assert_eq!(gpu.live_objects(), 0);
    }
}
