use crate::error::{Result, VisualizerError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use ringbuf::{Consumer, HeapRb, Producer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Blocking source of mono signed 16-bit samples.
pub trait AudioSource {
    /// Rate the samples were captured at.
    fn sample_rate(&self) -> u32;

    /// Returns exactly `n_samples` samples, or a transient error if they do
    /// not arrive within the source's read bound.
    fn read(&mut self, n_samples: usize) -> Result<Vec<i16>>;

    /// Stops capture and releases the device. Idempotent.
    fn close(&mut self) {}
}

/// Names of the host's input devices, in index order.
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices
            .map(|dev| dev.name().unwrap_or_else(|_| "Unknown".into()))
            .collect(),
        Err(e) => {
            log::warn!("Cannot enumerate input devices: {}", e);
            Vec::new()
        }
    }
}

/// Live capture from a cpal input device through a ring buffer.
pub struct CpalSource {
    stream: Option<cpal::Stream>,
    consumer: Consumer<i16, Arc<HeapRb<i16>>>,
    capacity: usize,
    sample_rate: u32,
    device_name: String,
    read_timeout: Duration,
    overflowed: Arc<AtomicUsize>,
    stream_failed: Arc<AtomicBool>,
}

impl CpalSource {
    /// Opens input device `device_index` (see [`list_input_devices`]) and
    /// starts capturing at `sample_rate` when the device supports it, or at
    /// its default rate otherwise. `None` means no device was selected.
    pub fn open(
        device_index: Option<usize>,
        sample_rate: u32,
        block_size: usize,
        read_timeout: Duration,
    ) -> Result<Self> {
        let index = device_index
            .ok_or_else(|| VisualizerError::DeviceUnavailable("no input device selected".into()))?;

        let host = cpal::default_host();

        //
        // Log all available input devices for debugging.
        //
        log::info!("--- AVAILABLE INPUT DEVICES ---");
        let devices: Vec<cpal::Device> = host
            .input_devices()
            .map_err(|e| VisualizerError::DeviceUnavailable(e.to_string()))?
            .collect();
        for (i, dev) in devices.iter().enumerate() {
            let name = dev.name().unwrap_or_else(|_| "Unknown".into());
            log::info!("  [{}]: {}", i, name);
        }
        log::info!("-------------------------------");

        let device = devices.into_iter().nth(index).ok_or_else(|| {
            VisualizerError::DeviceUnavailable(format!("no input device at index {}", index))
        })?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".into());
        log::info!("Selected audio device: {}", device_name);

        //
        // Ring buffer sized 4x the block to absorb scheduling jitter.
        //
        let capacity = block_size * 4;
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();

        let supported_config = match requested_config(&device, sample_rate) {
            Some(config) => config,
            None => {
                let fallback = device
                    .default_input_config()
                    .map_err(|e| VisualizerError::DeviceUnavailable(e.to_string()))?;
                log::warn!(
                    "{} Hz not supported by {}, using default {} Hz",
                    sample_rate,
                    device_name,
                    fallback.sample_rate().0
                );
                fallback
            }
        };
        let sample_format = supported_config.sample_format();
        let config: cpal::StreamConfig = supported_config.into();
        let channels = config.channels as usize;

        log::info!(
            "Audio config: {:?} @ {}Hz, Channels: {}",
            sample_format,
            config.sample_rate.0,
            channels
        );

        let overflowed = Arc::new(AtomicUsize::new(0));
        let stream_failed = Arc::new(AtomicBool::new(false));
        let status = CaptureStatus {
            overflowed: Arc::clone(&overflowed),
            stream_failed: Arc::clone(&stream_failed),
        };

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, producer, status),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, producer, status),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, producer, status),
            other => {
                return Err(VisualizerError::DeviceUnavailable(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| VisualizerError::DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| VisualizerError::DeviceUnavailable(e.to_string()))?;

        Ok(Self {
            stream: Some(stream),
            consumer,
            capacity,
            sample_rate: config.sample_rate.0,
            device_name,
            read_timeout,
            overflowed,
            stream_failed,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Input config running at exactly `sample_rate`, if the device offers one
/// in a sample format the capture callback handles.
fn requested_config(device: &cpal::Device, sample_rate: u32) -> Option<cpal::SupportedStreamConfig> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> = match device.supported_input_configs() {
        Ok(ranges) => ranges.collect(),
        Err(e) => {
            log::warn!("Cannot query input configs: {}", e);
            return None;
        }
    };
    let candidates: Vec<RateRange> = ranges
        .iter()
        .map(|r| RateRange {
            min: r.min_sample_rate().0,
            max: r.max_sample_rate().0,
            format: r.sample_format(),
            channels: r.channels(),
        })
        .collect();
    let index = pick_rate_range(&candidates, sample_rate)?;
    ranges
        .into_iter()
        .nth(index)
        .map(|r| r.with_sample_rate(cpal::SampleRate(sample_rate)))
}

/// Summary of one supported input config range.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RateRange {
    min: u32,
    max: u32,
    format: SampleFormat,
    channels: u16,
}

fn format_supported(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16)
}

/// Index of the range to open at `sample_rate`: it must contain the rate and
/// use a handled format. Fewer channels win, then float samples.
fn pick_rate_range(ranges: &[RateRange], sample_rate: u32) -> Option<usize> {
    ranges
        .iter()
        .enumerate()
        .filter(|(_, r)| r.min <= sample_rate && sample_rate <= r.max && format_supported(r.format))
        .min_by_key(|(_, r)| (r.channels, r.format != SampleFormat::F32))
        .map(|(i, _)| i)
}

struct CaptureStatus {
    overflowed: Arc<AtomicUsize>,
    stream_failed: Arc<AtomicBool>,
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut producer: Producer<i16, Arc<HeapRb<i16>>>,
    status: CaptureStatus,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let CaptureStatus {
        overflowed,
        stream_failed,
    } = status;
    let channels = channels.max(1);

    let err_fn = move |err: cpal::StreamError| {
        log::warn!("Audio input error: {}", err);
        stream_failed.store(true, Ordering::Relaxed);
    };

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            //
            // Downmix to mono: average stereo pairs, take the first channel
            // of anything wider.
            //
            for frame in data.chunks_exact(channels) {
                let mono = match frame {
                    [l, r] => {
                        let l = i16::from_sample(*l) as i32;
                        let r = i16::from_sample(*r) as i32;
                        ((l + r) / 2) as i16
                    }
                    _ => i16::from_sample(frame[0]),
                };
                if producer.push(mono).is_err() {
                    overflowed.fetch_add(1, Ordering::Relaxed);
                }
            }
        },
        err_fn,
        None,
    )
}

impl AudioSource for CpalSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, n_samples: usize) -> Result<Vec<i16>> {
        if self.stream.is_none() {
            return Err(VisualizerError::DeviceReadTransient("stream closed".into()));
        }
        if n_samples > self.capacity {
            return Err(VisualizerError::InvalidBlockLength {
                expected: self.capacity,
                actual: n_samples,
            });
        }
        if self.stream_failed.swap(false, Ordering::Relaxed) {
            return Err(VisualizerError::DeviceReadTransient(
                "input stream reported an error".into(),
            ));
        }

        let deadline = Instant::now() + self.read_timeout;
        while self.consumer.len() < n_samples {
            if Instant::now() >= deadline {
                return Err(VisualizerError::DeviceReadTransient(format!(
                    "timed out waiting for {} samples ({} buffered)",
                    n_samples,
                    self.consumer.len()
                )));
            }
            thread::sleep(Duration::from_millis(1));
        }

        //
        // Keep only the newest block; older samples are stale by now.
        //
        let stale = self.consumer.len() - n_samples;
        if stale > 0 {
            self.consumer.skip(stale);
        }
        let mut block = vec![0i16; n_samples];
        let got = self.consumer.pop_slice(&mut block);

        let dropped = self.overflowed.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            return Err(VisualizerError::DeviceReadTransient(format!(
                "input overflow, {} samples dropped",
                dropped
            )));
        }
        if got != n_samples {
            return Err(VisualizerError::InvalidBlockLength {
                expected: n_samples,
                actual: got,
            });
        }
        Ok(block)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause audio stream: {}", e);
            }
            log::info!("Closed audio stream on {}", self.device_name);
        }
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Source that replays queued blocks and errors; once the queue is empty it
/// repeats the fallback block, or fails transiently if there is none.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    sample_rate: u32,
    script: VecDeque<Result<Vec<i16>>>,
    fallback: Option<Vec<i16>>,
    reads: usize,
    closed: bool,
}

impl ScriptedSource {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Source that returns `block` on every read.
    pub fn repeating(sample_rate: u32, block: Vec<i16>) -> Self {
        Self {
            fallback: Some(block),
            ..Self::new(sample_rate)
        }
    }

    pub fn push_block(&mut self, block: Vec<i16>) -> &mut Self {
        self.script.push_back(Ok(block));
        self
    }

    pub fn push_error(&mut self, error: VisualizerError) -> &mut Self {
        self.script.push_back(Err(error));
        self
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl AudioSource for ScriptedSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, _n_samples: usize) -> Result<Vec<i16>> {
        if self.closed {
            return Err(VisualizerError::DeviceReadTransient("source closed".into()));
        }
        self.reads += 1;
        match self.script.pop_front() {
            Some(next) => next,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| VisualizerError::DeviceReadTransient("script exhausted".into())),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Sine block of `len` samples at `freq_hz`, with `amplitude` in i16 units.
pub fn tone(freq_hz: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<i16> {
    let amplitude = amplitude.clamp(0.0, i16::MAX as f32);
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32;
            (amplitude * phase.sin()).round() as i16
        })
        .collect()
}
