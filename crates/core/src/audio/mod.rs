use std::{
    f32::consts::PI,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{config::AudioConfig, OverlayError, Result};

/// Read side of the smoothed amplitude scalar, shared with the render loop.
#[derive(Debug, Clone, Default)]
pub struct AudioLevel {
    bits: Arc<AtomicU32>,
}

impl AudioLevel {
    /// Raw level in `[0, 1]`, without sensitivity applied.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Level scaled by `sensitivity`, clamped back into `[0, 1]`.
    pub fn scaled(&self, sensitivity: f32) -> f32 {
        (self.get() * sensitivity).clamp(0.0, 1.0)
    }

    fn set(&self, level: f32) {
        self.bits.store(level.to_bits(), Ordering::Release);
    }
}

/// Handle given to a capture stream for delivering raw buffers.
///
/// Each sink belongs to one start/stop generation. Buffers delivered after
/// the generation ended are dropped, so a stopped stream can never leak its
/// amplitude into a later session.
#[derive(Debug, Clone)]
pub struct BufferSink {
    level: AudioLevel,
    current_generation: Arc<AtomicU64>,
    generation: u64,
    reference_scale: f32,
}

impl BufferSink {
    /// Feeds one buffer of samples. Returns `false` once the owning session
    /// has been stopped.
    pub fn deliver(&self, samples: &[f32]) -> bool {
        if !self.is_live() {
            return false;
        }
        if samples.is_empty() {
            return true;
        }
        let level = (compute_rms(samples) / self.reference_scale).clamp(0.0, 1.0);
        self.level.set(level);
        true
    }

    pub fn is_live(&self) -> bool {
        self.current_generation.load(Ordering::Acquire) == self.generation
    }
}

/// An open capture resource.
pub trait CaptureStream: Send {
    /// Releases the device. Must not return before the resource is freed.
    fn close(self: Box<Self>);
}

/// Something that can open a microphone-like capture stream.
pub trait AudioBackend: Send {
    /// Opens a stream that delivers buffers to `sink` from its own context.
    /// Fails with [`OverlayError::AudioUnavailable`] when no device exists.
    fn open(&mut self, sink: BufferSink) -> Result<Box<dyn CaptureStream>>;
}

/// Maintains the amplitude level from asynchronously delivered buffers.
pub struct AudioEnvelopeTracker {
    level: AudioLevel,
    generation: Arc<AtomicU64>,
    reference_scale: f32,
    stream: Option<Box<dyn CaptureStream>>,
}

impl AudioEnvelopeTracker {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            level: AudioLevel::default(),
            generation: Arc::new(AtomicU64::new(0)),
            reference_scale: config.reference_scale.max(f32::EPSILON),
            stream: None,
        }
    }

    pub fn level(&self) -> AudioLevel {
        self.level.clone()
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens a new capture session. A session already running is kept.
    pub fn start(&mut self, backend: &mut dyn AudioBackend) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let sink = BufferSink {
            level: self.level.clone(),
            current_generation: self.generation.clone(),
            generation,
            reference_scale: self.reference_scale,
        };

        match backend.open(sink) {
            Ok(stream) => {
                tracing::info!("audio capture started");
                self.stream = Some(stream);
                Ok(())
            }
            Err(err) => {
                // Retire the generation so the failed sink stays inert.
                self.generation.fetch_add(1, Ordering::AcqRel);
                Err(err)
            }
        }
    }

    /// Stops capture. The device is released before this returns.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(stream) = self.stream.take() {
            stream.close();
            tracing::info!("audio capture stopped");
        }
    }
}

impl Drop for AudioEnvelopeTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AudioEnvelopeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEnvelopeTracker")
            .field("level", &self.level.get())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Backend for machines without a capture device.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudioBackend;

impl AudioBackend for NoAudioBackend {
    fn open(&mut self, _sink: BufferSink) -> Result<Box<dyn CaptureStream>> {
        Err(OverlayError::AudioUnavailable("no capture device".into()))
    }
}

/// Synthetic capture source: an amplitude-modulated sine tone delivered from
/// a background thread at the real-time block rate.
#[derive(Debug, Clone)]
pub struct ToneBackend {
    sample_rate: u32,
    block_size: usize,
    frequency: f32,
    modulation_hz: f32,
}

impl ToneBackend {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate.max(1),
            block_size: config.block_size.max(2),
            frequency: 220.0,
            modulation_hz: 0.5,
        }
    }
}

impl AudioBackend for ToneBackend {
    fn open(&mut self, sink: BufferSink) -> Result<Box<dyn CaptureStream>> {
        let running = Arc::new(AtomicBool::new(true));
        let tone = self.clone();
        let flag = running.clone();
        let worker = thread::Builder::new()
            .name("tone-capture".into())
            .spawn(move || tone.run(&sink, &flag))?;

        Ok(Box::new(ToneStream {
            running,
            worker: Some(worker),
        }))
    }
}

impl ToneBackend {
    fn run(&self, sink: &BufferSink, running: &AtomicBool) {
        let rate = self.sample_rate as f32;
        let block_duration = Duration::from_secs_f32(self.block_size as f32 / rate);
        let mut buffer = vec![0.0_f32; self.block_size];
        let mut sample_index: u64 = 0;

        while running.load(Ordering::Acquire) {
            for sample in buffer.iter_mut() {
                let t = sample_index as f32 / rate;
                let envelope = 0.5 - 0.5 * (2.0 * PI * self.modulation_hz * t).cos();
                *sample = envelope * (2.0 * PI * self.frequency * t).sin();
                sample_index += 1;
            }
            if !sink.deliver(&buffer) {
                break;
            }
            thread::sleep(block_duration);
        }
    }
}

struct ToneStream {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureStream for ToneStream {
    fn close(mut self: Box<Self>) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("tone capture thread panicked");
            }
        }
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}
