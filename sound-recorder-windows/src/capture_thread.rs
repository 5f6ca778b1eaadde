//! Dedicated WASAPI capture thread shared by the loopback and microphone sources.
//!
//! Sequence on the thread:
//! 1. CoInitializeEx (MTA)
//! 2. Resolve the endpoint and activate `IAudioClient`
//! 3. Initialize in shared mode (loopback, or with the forced format)
//! 4. Get `IAudioCaptureClient`
//! 5. Register with MMCSS
//! 6. Start, report back to `start`, then poll for packets every 10 ms
//!
//! COM objects never leave the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Threading::AvSetMmThreadCharacteristicsW;

use sound_recorder_core::models::error::CaptureError;
use sound_recorder_core::models::wave_format::{SampleLayout, WaveFormat};
use sound_recorder_core::traits::capture_source::ChunkCallback;

use crate::com::{self, ComScope, Endpoint, MixFormat};
use crate::formats;

/// 100 ms, in 100 ns units.
const BUFFER_DURATION_HNS: i64 = 1_000_000;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How the stream is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Read the render mix; the format must still equal the device mix format.
    Loopback,
    /// Let the audio engine convert the device format into the requested one.
    ForcedFormat,
}

pub struct CaptureThread {
    name: &'static str,
    running: Arc<AtomicBool>,
    /// Error that ended the delivery loop, reported by the next `stop`.
    fault: Arc<Mutex<Option<CaptureError>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptureThread {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Arc::new(AtomicBool::new(false)),
            fault: Arc::new(Mutex::new(None)),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the thread and wait until the stream is initialized and started.
    pub fn start(
        &mut self,
        endpoint: Endpoint,
        format: WaveFormat,
        mode: StreamMode,
        callback: ChunkCallback,
    ) -> Result<(), CaptureError> {
        if self.handle.is_some() {
            return Err(CaptureError::InvalidState(format!("{} capture already running", self.name)));
        }

        self.running.store(true, Ordering::SeqCst);
        *self.fault.lock() = None;

        let running = Arc::clone(&self.running);
        let fault = Arc::clone(&self.fault);
        let (init_tx, init_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(format!("wasapi-{}-capture", self.name))
            .spawn(move || {
                run(&endpoint, format, mode, &callback, &running, &fault, init_tx);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::Unknown(format!("failed to spawn {} thread: {}", self.name, e))
            })?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                log::debug!("{} capture started: {}", self.name, format);
                self.handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Unknown(format!(
                    "{} capture thread exited during initialization",
                    self.name
                )))
            }
        }
    }

    /// Stop the delivery loop and join the thread. A no-op when not started.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(CaptureError::Unknown(format!("{} capture thread panicked", self.name)));
            }
        }
        match self.fault.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{} capture ended with an error: {}", self.name, e);
        }
    }
}

struct Stream {
    client: IAudioClient,
    capture: IAudioCaptureClient,
}

fn run(
    endpoint: &Endpoint,
    format: WaveFormat,
    mode: StreamMode,
    callback: &ChunkCallback,
    running: &AtomicBool,
    fault: &Mutex<Option<CaptureError>>,
    init_tx: mpsc::Sender<Result<(), CaptureError>>,
) {
    let _com = match ComScope::enter() {
        Ok(scope) => scope,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };

    let stream = match open_stream(endpoint, &format, mode) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };
    let _ = init_tx.send(Ok(()));

    if let Err(e) = pump(&stream, &format, callback, running) {
        log::error!("{:?} capture stopped delivering: {}", endpoint.track(), e);
        *fault.lock() = Some(e);
    }

    unsafe {
        let _ = stream.client.Stop();
    }
}

fn open_stream(endpoint: &Endpoint, format: &WaveFormat, mode: StreamMode) -> Result<Stream, CaptureError> {
    let device = com::open_device(endpoint)?;
    let client = com::activate_client(&device, endpoint.track())?;

    unsafe {
        match mode {
            StreamMode::Loopback => {
                let mix = MixFormat::of(&client)?;
                let current = mix.wave_format()?;
                if current != *format {
                    return Err(CaptureError::FormatMismatch(format!(
                        "output device switched to {}, expected {}",
                        current, format
                    )));
                }
                client
                    .Initialize(
                        AUDCLNT_SHAREMODE_SHARED,
                        AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_NOPERSIST,
                        BUFFER_DURATION_HNS,
                        0,
                        mix.as_ptr(),
                        None,
                    )
                    .map_err(|e| {
                        CaptureError::DeviceUnavailable(format!("IAudioClient::Initialize (loopback) failed: {}", e))
                    })?;
            }
            StreamMode::ForcedFormat => {
                let forced = formats::to_extensible(format);
                client
                    .Initialize(
                        AUDCLNT_SHAREMODE_SHARED,
                        AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM
                            | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY
                            | AUDCLNT_STREAMFLAGS_NOPERSIST,
                        BUFFER_DURATION_HNS,
                        0,
                        &forced as *const WAVEFORMATEXTENSIBLE as *const WAVEFORMATEX,
                        None,
                    )
                    .map_err(|e| CaptureError::FormatMismatch(format!("device cannot deliver {}: {}", format, e)))?;
            }
        }

        let capture: IAudioCaptureClient = client
            .GetService()
            .map_err(|e| CaptureError::ConfigurationFailed(format!("GetService failed: {}", e)))?;

        let mut task_index: u32 = 0;
        let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
        if let Err(e) = AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index) {
            log::warn!("MMCSS registration failed: {}", e);
        }

        client
            .Start()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("IAudioClient::Start failed: {}", e)))?;

        Ok(Stream { client, capture })
    }
}

/// Deliver packets as whole-block byte chunks until `running` is cleared.
fn pump(
    stream: &Stream,
    format: &WaveFormat,
    callback: &ChunkCallback,
    running: &AtomicBool,
) -> Result<(), CaptureError> {
    let block_align = format.block_align as usize;
    let silence_byte = match format.sample_layout()? {
        SampleLayout::U8 => 0x80,
        _ => 0,
    };

    while running.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);

        unsafe {
            let mut packet_length = stream
                .capture
                .GetNextPacketSize()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("GetNextPacketSize failed: {}", e)))?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                stream
                    .capture
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .map_err(|e| CaptureError::DeviceUnavailable(format!("GetBuffer failed: {}", e)))?;

                if num_frames > 0 && !buffer_ptr.is_null() {
                    let len = num_frames as usize * block_align;
                    if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                        callback(&vec![silence_byte; len]);
                    } else {
                        callback(std::slice::from_raw_parts(buffer_ptr, len));
                    }
                }

                stream
                    .capture
                    .ReleaseBuffer(num_frames)
                    .map_err(|e| CaptureError::DeviceUnavailable(format!("ReleaseBuffer failed: {}", e)))?;

                packet_length = stream
                    .capture
                    .GetNextPacketSize()
                    .map_err(|e| CaptureError::DeviceUnavailable(format!("GetNextPacketSize failed: {}", e)))?;
            }
        }
    }

    Ok(())
}
