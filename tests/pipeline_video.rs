use anyhow::Result;

use mask_overlay::{DisplayMode, Mask, ProcessRequest, Processor, ProcessorConfig, StubBackend, Ui};

fn processor(mask: Option<Mask>) -> Processor {
    Processor::new(
        ProcessorConfig::default(),
        Box::new(StubBackend::new(mask)),
        Ui::plain(),
    )
}

#[cfg(not(feature = "video-ffmpeg"))]
#[test]
fn video_input_without_ffmpeg_reports_missing_feature() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let request = ProcessRequest {
        display_mode: DisplayMode::Highlight,
        ..ProcessRequest::new(dir.path().join("clip.mp4"), dir.path().join("out.mp4"))
    };

    let err = processor(None)
        .process(&request)
        .expect_err("video input must fail without ffmpeg");
    assert!(err.to_string().contains("video-ffmpeg"), "{err:#}");
    assert!(!dir.path().join("out.mp4").exists());
    Ok(())
}

#[cfg(not(feature = "video-ffmpeg"))]
#[test]
fn video_output_without_ffmpeg_reports_missing_feature() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = match mask_overlay::VideoSink::create(
        &dir.path().join("out.mp4"),
        mask_overlay::FourCc::MP4V,
        30,
        64,
        48,
    ) {
        Ok(_) => panic!("video output must be unavailable"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("video-ffmpeg"), "{err:#}");
    Ok(())
}

#[cfg(feature = "video-ffmpeg")]
mod ffmpeg {
    use super::*;
    use mask_overlay::{Frame, FourCc, VideoSink, VideoSource};

    const BASE_BGR: [u8; 3] = [40, 90, 160];
    const FRAMES: u64 = 6;

    #[test]
    fn annotated_video_keeps_frame_count_and_size() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.mp4");

        let mut sink = VideoSink::create(&input, FourCc::MP4V, 10, 64, 48)?;
        for _ in 0..FRAMES {
            sink.write(&Frame::filled(64, 48, BASE_BGR))?;
        }
        assert_eq!(sink.finish()?, FRAMES);

        let request = ProcessRequest {
            display_mode: DisplayMode::Highlight,
            ..ProcessRequest::new(&input, &output)
        };
        let left_half = Mask::from_fn(4, 4, |x, _| x < 2);
        let written = processor(Some(left_half)).process(&request)?;
        assert_eq!(written, output);

        let source = VideoSource::open(&output)?;
        let info = source.info();
        assert_eq!((info.width, info.height), (64, 48));
        let frames: Vec<Frame> = source.collect();
        assert_eq!(frames.len() as u64, FRAMES);

        // Lossy codec: compare regions rather than exact values.
        for frame in &frames {
            let inside = frame.pixel(8, 24);
            let outside = frame.pixel(56, 24);
            assert!(inside[0] > outside[0] + 30, "{inside:?} vs {outside:?}");
            assert!((outside[0] as i32 - BASE_BGR[0] as i32).abs() <= 12, "{outside:?}");
        }
        Ok(())
    }
}
