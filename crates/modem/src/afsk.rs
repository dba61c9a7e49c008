//! Audio frequency-shift keying for the APRS channel
//!
//! Bell 202 AFSK at 1200 baud: two audio tones, one sine-table sample
//! written per timer tick, and a tone toggle on every 0 bit (a 1 bit
//! leaves the tone alone, which is the continuous-phase FSK that APRS
//! receivers expect). The timer runs at the *current tone's* sampling
//! period, so the bit cadence is tracked by accumulating elapsed
//! microseconds rather than by counting ticks.

use crate::hal::{NoPin, OutputPin, SampleSink, SampleTimer};
use crate::{ModemError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stratolink_core::bits::BitSeq;
use tracing::debug;

/// Entries in the tone lookup table; one full sine cycle.
pub const SAMPLES_PER_CYCLE: usize = 32;

/// AFSK tone and rate parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfskConfig {
    /// Tone for '1' bits, Hz.
    pub mark_frequency: u32,
    /// Tone for '0' bits, Hz.
    pub space_frequency: u32,
    /// Bits per second.
    pub baud_rate: u32,
    /// Distinct levels the sample sink accepts (DAC steps), 2..=256.
    pub output_resolution: u16,
}

impl AfskConfig {
    /// Bell 202 parameters used by 1200-baud APRS.
    pub fn bell_202() -> Self {
        Self {
            mark_frequency: 1200,
            space_frequency: 2200,
            baud_rate: 1200,
            output_resolution: 256,
        }
    }

    /// Microseconds between samples for a tone of `frequency` Hz.
    pub fn sampling_period(frequency: u32) -> u32 {
        1_000_000 / (frequency * SAMPLES_PER_CYCLE as u32)
    }

    /// Microseconds per transmitted bit.
    pub fn bit_period(&self) -> u32 {
        1_000_000 / self.baud_rate
    }

    fn validate(&self) -> Result<()> {
        for (name, frequency) in [
            ("mark", self.mark_frequency),
            ("space", self.space_frequency),
        ] {
            if frequency == 0 || frequency > 1_000_000 / SAMPLES_PER_CYCLE as u32 {
                return Err(ModemError::InvalidParameters {
                    msg: format!("{} frequency {} Hz is not sampleable", name, frequency),
                });
            }
        }
        if self.baud_rate == 0 || self.baud_rate > 1_000_000 {
            return Err(ModemError::InvalidParameters {
                msg: format!("baud rate {} out of range", self.baud_rate),
            });
        }
        if !(2..=256).contains(&self.output_resolution) {
            return Err(ModemError::InvalidParameters {
                msg: format!("output resolution {} out of range", self.output_resolution),
            });
        }
        Ok(())
    }
}

/// Readable handle on the modulator's transmitting flag.
///
/// This atomic is the only state shared between the timing context that
/// drives `tick` and the main loop; clone it out before handing the
/// modulator to the timing side.
#[derive(Debug, Clone)]
pub struct TransmitFlag(Arc<AtomicBool>);

impl TransmitFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Transmitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Mark,
    Space,
}

/// Two-tone modulator bound to a timer, a sample sink and an optional
/// PTT pin.
///
/// One instance owns one transmitter: starting a transmission while one
/// is in flight is refused rather than queued.
#[derive(Debug)]
pub struct AfskModulator<T: SampleTimer, S: SampleSink, P: OutputPin = NoPin> {
    config: AfskConfig,
    timer: T,
    sink: S,
    ptt: Option<P>,
    sine_table: [u8; SAMPLES_PER_CYCLE],
    mark_period: u32,
    space_period: u32,
    bit_period: u32,
    state: State,
    tone: Tone,
    sample_index: usize,
    elapsed_us: u32,
    bit_index: usize,
    bits: Option<BitSeq>,
    transmitting: Arc<AtomicBool>,
}

impl<T: SampleTimer, S: SampleSink> AfskModulator<T, S, NoPin> {
    /// Build a modulator with no PTT line.
    pub fn new(config: AfskConfig, timer: T, sink: S) -> Result<Self> {
        Self::build(config, timer, sink, None)
    }
}

impl<T: SampleTimer, S: SampleSink, P: OutputPin> AfskModulator<T, S, P> {
    /// Build a modulator that keys `ptt` around each transmission.
    pub fn with_ptt(config: AfskConfig, timer: T, sink: S, ptt: P) -> Result<Self> {
        Self::build(config, timer, sink, Some(ptt))
    }

    fn build(config: AfskConfig, timer: T, sink: S, ptt: Option<P>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sine_table: sine_table(config.output_resolution),
            mark_period: AfskConfig::sampling_period(config.mark_frequency),
            space_period: AfskConfig::sampling_period(config.space_frequency),
            bit_period: config.bit_period(),
            config,
            timer,
            sink,
            ptt,
            state: State::Idle,
            tone: Tone::Mark,
            sample_index: 0,
            elapsed_us: 0,
            bit_index: 0,
            bits: None,
            transmitting: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Begin transmitting `bits`: key PTT, select the mark tone and start
    /// the sampling timer. The sequence is held read-only until the
    /// transmission ends.
    pub fn transmit(&mut self, bits: BitSeq) -> Result<()> {
        if self.state == State::Transmitting {
            return Err(ModemError::TransmitterBusy);
        }
        if bits.is_empty() {
            return Err(ModemError::NothingToTransmit);
        }

        if let Some(ptt) = self.ptt.as_mut() {
            ptt.set_high();
        }
        self.bits = Some(bits);
        self.bit_index = 0;
        self.sample_index = 0;
        self.elapsed_us = 0;
        self.tone = Tone::Mark;
        self.state = State::Transmitting;
        self.transmitting.store(true, Ordering::Release);
        self.timer.start(self.mark_period);
        debug!(
            bits = self.bits.as_ref().map(BitSeq::len).unwrap_or(0),
            period_us = self.mark_period,
            "transmission started"
        );
        Ok(())
    }

    /// One sampling-timer period has elapsed: emit the next sine sample
    /// and advance the bit clock.
    ///
    /// Called from the timing context; a tick while idle does nothing.
    pub fn tick(&mut self) {
        if self.state != State::Transmitting {
            return;
        }
        let bit_count = match self.bits.as_ref() {
            Some(bits) => bits.len(),
            None => return,
        };

        self.sink.write_sample(self.sine_table[self.sample_index]);
        self.sample_index = (self.sample_index + 1) % SAMPLES_PER_CYCLE;

        self.elapsed_us += self.sample_period();
        if self.elapsed_us < self.bit_period {
            return;
        }
        self.elapsed_us -= self.bit_period;

        self.bit_index += 1;
        if self.bit_index >= bit_count {
            self.finish();
        } else if self.current_bit() == Some(false) {
            self.toggle_tone();
        }
    }

    /// Whether a transmission is in flight right now.
    pub fn transmitting(&self) -> bool {
        self.transmitting.load(Ordering::Acquire)
    }

    /// Handle for the main loop to poll without touching the modulator.
    pub fn transmit_flag(&self) -> TransmitFlag {
        TransmitFlag(Arc::clone(&self.transmitting))
    }

    /// How long `bits` will occupy the air at the configured baud rate.
    pub fn transmission_time(&self, bits: &BitSeq) -> Duration {
        Duration::from_millis(bits.len() as u64 * 1000 / self.config.baud_rate as u64)
    }

    /// Take back the transmitted sequence once the modulator is idle, so
    /// the buffer can be reused for the next frame.
    pub fn reclaim(&mut self) -> Option<BitSeq> {
        if self.state == State::Transmitting {
            return None;
        }
        self.bits.take()
    }

    /// Microseconds between samples of the active tone.
    pub fn sample_period(&self) -> u32 {
        match self.tone {
            Tone::Mark => self.mark_period,
            Tone::Space => self.space_period,
        }
    }

    fn current_bit(&self) -> Option<bool> {
        self.bits.as_ref().and_then(|bits| bits.get(self.bit_index))
    }

    fn toggle_tone(&mut self) {
        self.tone = match self.tone {
            Tone::Mark => Tone::Space,
            Tone::Space => Tone::Mark,
        };
        self.timer.set_period(self.sample_period());
    }

    fn finish(&mut self) {
        self.timer.stop();
        self.sink.write_sample(0);
        if let Some(ptt) = self.ptt.as_mut() {
            ptt.set_low();
        }
        self.sample_index = 0;
        self.elapsed_us = 0;
        self.bit_index = 0;
        self.tone = Tone::Mark;
        self.state = State::Idle;
        self.transmitting.store(false, Ordering::Release);
    }
}

/// One sine cycle scaled to `resolution` output levels.
fn sine_table(resolution: u16) -> [u8; SAMPLES_PER_CYCLE] {
    let mut table = [0u8; SAMPLES_PER_CYCLE];
    for (i, entry) in table.iter_mut().enumerate() {
        let level = (2.0 * PI * i as f64 / SAMPLES_PER_CYCLE as f64).sin();
        let scaled = (level + 1.0) / 2.0 * (resolution - 1) as f64;
        *entry = (scaled + 0.5) as u8;
    }
    table
}
