//! Smoothed voltage readings.
//!
//! Each averaged read sums a burst of raw samples, scales the truncated mean
//! to millivolts, stores it in the channel history and reports the mean of
//! that history.

use core::marker::PhantomData;

use embedded_hal::adc::{Channel as AdcChannel, OneShot};
use embedded_hal::blocking::delay::DelayMs;

use crate::protocol::{
    Channel, ADC_FULL_SCALE, CHANNELS, CHARGE_THRESHOLD_MV, HISTORY_LEN, SAMPLE_COUNT,
    SAMPLE_DELAY_MS, VREF_MV,
};

/// Raw analog sample access
pub trait SampleSource<E> {
    fn sample(&mut self, channel: Channel) -> Result<u16, E>;
}

/// How history positions are counted across channels
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum HistoryMode {
    /// Each channel counts its own samples
    PerChannel,
    /// One counter for all channels, reads on one channel advance the
    /// write position and warm-up state of every other
    Shared,
}

impl core::str::FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-channel" => Ok(HistoryMode::PerChannel),
            "shared" => Ok(HistoryMode::Shared),
            _ => Err(format!("unknown history mode '{}'", s)),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "structopt", derive(structopt::StructOpt))]
pub struct Config {
    /// Raw samples per averaged read
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "204"))]
    pub sample_count: u32,

    /// Delay between raw samples
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "1"))]
    pub sample_delay_ms: u32,

    /// History counting (per-channel or shared)
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "per-channel"))]
    pub history: HistoryMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_count: SAMPLE_COUNT,
            sample_delay_ms: SAMPLE_DELAY_MS,
            history: HistoryMode::PerChannel,
        }
    }
}

/// Convert a raw ADC count to millivolts
pub fn scale(raw: u32) -> u32 {
    raw * VREF_MV / ADC_FULL_SCALE
}

pub struct VoltageAverager<A, D, E> {
    config: Config,
    source: A,
    delay: D,
    history: [[u32; HISTORY_LEN]; CHANNELS],
    counters: [u64; CHANNELS],
    _err: PhantomData<E>,
}

impl<A, D, E> VoltageAverager<A, D, E>
where
    A: SampleSource<E>,
    D: DelayMs<u32>,
{
    pub fn new(source: A, delay: D, config: Config) -> Self {
        Self {
            config,
            source,
            delay,
            history: [[CHARGE_THRESHOLD_MV; HISTORY_LEN]; CHANNELS],
            counters: [0; CHANNELS],
            _err: PhantomData,
        }
    }

    /// Single unfiltered sample
    pub fn raw_sample(&mut self, channel: Channel) -> Result<u16, E> {
        self.source.sample(channel)
    }

    /// Take a burst of samples and return the rolling average in millivolts
    pub fn averaged_voltage(&mut self, channel: Channel) -> Result<u32, E> {
        let count = self.config.sample_count.max(1);

        let mut sum: u64 = 0;
        for _ in 0..count {
            sum += u64::from(self.source.sample(channel)?);
            self.delay.delay_ms(self.config.sample_delay_ms);
        }

        // Mean of u16 samples always fits back in u32
        let mv = scale((sum / u64::from(count)) as u32);

        let counter = self.counter_index(channel);
        let taken = self.counters[counter];
        let history = &mut self.history[channel.index()];

        history[(taken % HISTORY_LEN as u64) as usize] = mv;
        self.counters[counter] += 1;

        let filled = if taken < HISTORY_LEN as u64 {
            taken as usize + 1
        } else {
            HISTORY_LEN
        };
        let average = history[..filled].iter().sum::<u32>() / filled as u32;

        debug!(
            "Channel {:?} sample {} scaled {} mV, average {} mV",
            channel, taken, mv, average
        );

        Ok(average)
    }

    /// Averaged reads counted against a channel so far
    pub fn samples_taken(&self, channel: Channel) -> u64 {
        self.counters[self.counter_index(channel)]
    }

    pub fn history(&self, channel: Channel) -> &[u32; HISTORY_LEN] {
        &self.history[channel.index()]
    }

    pub fn source(&mut self) -> &mut A {
        &mut self.source
    }

    fn counter_index(&self, channel: Channel) -> usize {
        match self.config.history {
            HistoryMode::PerChannel => channel.index(),
            HistoryMode::Shared => 0,
        }
    }
}

/// [`SampleSource`] over an embedded-hal one-shot ADC and four channel pins
pub struct AdcSource<ADC, A, P0, P1, P2, P3> {
    adc: A,
    pins: (P0, P1, P2, P3),
    _adc: PhantomData<ADC>,
}

impl<ADC, A, P0, P1, P2, P3> AdcSource<ADC, A, P0, P1, P2, P3> {
    pub fn new(adc: A, pins: (P0, P1, P2, P3)) -> Self {
        Self {
            adc,
            pins,
            _adc: PhantomData,
        }
    }
}

impl<ADC, A, P0, P1, P2, P3, E> SampleSource<E> for AdcSource<ADC, A, P0, P1, P2, P3>
where
    A: OneShot<ADC, u16, P0, Error = E>
        + OneShot<ADC, u16, P1, Error = E>
        + OneShot<ADC, u16, P2, Error = E>
        + OneShot<ADC, u16, P3, Error = E>,
    P0: AdcChannel<ADC>,
    P1: AdcChannel<ADC>,
    P2: AdcChannel<ADC>,
    P3: AdcChannel<ADC>,
{
    fn sample(&mut self, channel: Channel) -> Result<u16, E> {
        let v = match channel {
            Channel::A0 => block!(OneShot::<ADC, u16, P0>::read(&mut self.adc, &mut self.pins.0))?,
            Channel::A1 => block!(OneShot::<ADC, u16, P1>::read(&mut self.adc, &mut self.pins.1))?,
            Channel::A2 => block!(OneShot::<ADC, u16, P2>::read(&mut self.adc, &mut self.pins.2))?,
            Channel::A3 => block!(OneShot::<ADC, u16, P3>::read(&mut self.adc, &mut self.pins.3))?,
        };
        Ok(v)
    }
}
