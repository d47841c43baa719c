//! FFmpeg-backed video encoder.
//!
//! BGR frames are converted to YUV420P and encoded with the codec mapped from
//! the configured four-character tag. Packets are muxed as they are produced.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use std::path::Path;

use super::video::FourCc;
use crate::frame::Frame;

pub(crate) struct FfmpegVideoSink {
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    width: u32,
    height: u32,
    next_pts: i64,
}

impl FfmpegVideoSink {
    pub(crate) fn new(path: &Path, fourcc: FourCc, fps: u32, width: u32, height: u32) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let codec_id = codec_for_fourcc(fourcc)?;
        let codec = ffmpeg::encoder::find(codec_id)
            .ok_or_else(|| anyhow!("no ffmpeg encoder available for codec tag {}", fourcc))?;

        let mut output = ffmpeg::format::output(&path)
            .with_context(|| format!("failed to open video output '{}'", path.display()))?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let encoder_time_base = ffmpeg::Rational::new(1, fps as i32);
        let mut stream = output.add_stream(codec).context("add video stream")?;
        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .context("create ffmpeg video encoder")?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(ffmpeg::Rational::new(fps as i32, 1)));
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let encoder = encoder
            .open_as(codec)
            .with_context(|| format!("open ffmpeg encoder for codec tag {}", fourcc))?;
        stream.set_parameters(&encoder);
        stream.set_time_base(encoder_time_base);
        let stream_index = stream.index();

        output
            .write_header()
            .context("write video container header")?;
        let stream_time_base = output
            .stream(stream_index)
            .map(|s| s.time_base())
            .ok_or_else(|| anyhow!("video stream vanished after header write"))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            ffmpeg::format::Pixel::BGR24,
            width,
            height,
            ffmpeg::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width,
            height,
            next_pts: 0,
        })
    }

    pub(crate) fn write(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match video writer {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }

        let mut bgr = ffmpeg::frame::Video::new(ffmpeg::format::Pixel::BGR24, self.width, self.height);
        pixels_to_frame(frame.as_bytes(), self.width, self.height, &mut bgr)?;

        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&bgr, &mut yuv)
            .context("scale frame to YUV420P")?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&yuv)
            .context("send frame to ffmpeg encoder")?;
        self.drain_packets()
    }

    pub(crate) fn finish(mut self) -> Result<()> {
        self.encoder.send_eof().context("flush ffmpeg encoder")?;
        self.drain_packets()?;
        self.output
            .write_trailer()
            .context("write video container trailer")?;
        Ok(())
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .context("write video packet")?;
        }
        Ok(())
    }
}

/// Map a four-character tag to the ffmpeg codec it names.
fn codec_for_fourcc(fourcc: FourCc) -> Result<ffmpeg::codec::Id> {
    match fourcc.normalized().as_str() {
        "mp4v" | "fmp4" | "xvid" | "divx" => Ok(ffmpeg::codec::Id::MPEG4),
        "avc1" | "h264" | "x264" => Ok(ffmpeg::codec::Id::H264),
        "mjpg" => Ok(ffmpeg::codec::Id::MJPEG),
        "vp80" => Ok(ffmpeg::codec::Id::VP8),
        "vp90" => Ok(ffmpeg::codec::Id::VP9),
        _ => Err(anyhow!("unsupported video codec tag {}", fourcc)),
    }
}

fn pixels_to_frame(pixels: &[u8], width: u32, height: u32, frame: &mut ffmpeg::frame::Video) -> Result<()> {
    let row_bytes = width as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data_mut(0);
    for row in 0..height as usize {
        let src = pixels
            .get(row * row_bytes..(row + 1) * row_bytes)
            .context("frame row is out of bounds")?;
        data.get_mut(row * stride..row * stride + row_bytes)
            .context("ffmpeg frame row is out of bounds")?
            .copy_from_slice(src);
    }
    Ok(())
}
