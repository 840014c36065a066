use crate::audio_queue::{AudioConsumer, AudioProducer, audio_queue};

const CPU_CLOCK_HZ: u32 = 4_194_304;
const SAMPLE_RATE: u32 = 44_100;
// The frame sequencer ticks at 512 Hz.
const FRAME_SEQUENCER_PERIOD: u32 = 8192;
// About 90 ms of buffered audio before pushes start dropping.
const QUEUE_CAPACITY: usize = 4096;

const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0], // 12.5%
    [0, 1, 1, 0, 0, 0, 0, 0], // 25%
    [0, 1, 1, 1, 1, 0, 0, 0], // 50%
    [1, 0, 0, 1, 1, 1, 1, 1], // 75%
];

#[derive(Default)]
struct Envelope {
    initial: u8,
    volume: u8,
    add_mode: bool,
    period: u8,
    timer: u8,
}

impl Envelope {
    fn reset(&mut self, val: u8) {
        self.initial = val >> 4;
        self.add_mode = val & 0x08 != 0;
        self.period = val & 0x07;
        self.volume = self.initial;
        self.timer = if self.period == 0 { 8 } else { self.period };
    }

    fn clock(&mut self) {
        if self.period == 0 {
            return;
        }
        if self.timer > 0 {
            self.timer -= 1;
        }
        if self.timer == 0 {
            self.timer = self.period;
            if self.add_mode && self.volume < 0x0F {
                self.volume += 1;
            } else if !self.add_mode && self.volume > 0 {
                self.volume -= 1;
            }
        }
    }
}

#[derive(Default)]
struct Sweep {
    enabled: bool,
    period: u8,
    negate: bool,
    shift: u8,
    timer: u8,
    shadow: u16,
}

impl Sweep {
    fn set_params(&mut self, val: u8) {
        self.period = (val >> 4) & 0x07;
        self.negate = val & 0x08 != 0;
        self.shift = val & 0x07;
    }

    fn calculate(&self) -> u16 {
        let delta = self.shadow >> self.shift;
        if self.negate {
            self.shadow.wrapping_sub(delta)
        } else {
            self.shadow + delta
        }
    }

    fn reload(&mut self, freq: u16) {
        self.shadow = freq;
        self.timer = if self.period == 0 { 8 } else { self.period };
        self.enabled = self.period != 0 || self.shift != 0;
    }
}

#[derive(Default)]
struct PulseChannel {
    enabled: bool,
    dac_enabled: bool,
    length: u8,
    length_enable: bool,
    duty: u8,
    duty_pos: u8,
    frequency: u16,
    timer: i32,
    envelope: Envelope,
    sweep: Option<Sweep>,
}

impl PulseChannel {
    fn new(with_sweep: bool) -> Self {
        Self {
            sweep: if with_sweep {
                Some(Sweep::default())
            } else {
                None
            },
            ..Default::default()
        }
    }

    fn period(&self) -> i32 {
        ((2048 - self.frequency) * 4) as i32
    }

    fn step(&mut self, cycles: u32) {
        if !self.enabled || !self.dac_enabled {
            return;
        }
        let mut cycles = cycles as i32;
        while self.timer <= cycles {
            cycles -= self.timer;
            self.timer = self.period();
            self.duty_pos = (self.duty_pos + 1) & 7;
        }
        self.timer -= cycles;
    }

    fn output(&self) -> u8 {
        if !self.enabled || !self.dac_enabled {
            return 0;
        }
        let level = DUTY_TABLE[self.duty as usize][self.duty_pos as usize];
        level * self.envelope.volume
    }

    /// DAC transfer: a live channel's 0-15 level becomes a centered
    /// -1.0..1.0 voltage; a disabled DAC outputs silence.
    fn dac_output(&self) -> f32 {
        if !self.enabled || !self.dac_enabled {
            return 0.0;
        }
        self.output() as f32 / 7.5 - 1.0
    }

    fn trigger(&mut self, nrx2: u8) {
        self.enabled = self.dac_enabled;
        if self.length == 0 {
            self.length = 64;
        }
        self.timer = self.period();
        self.envelope.reset(nrx2);
        if let Some(sweep) = self.sweep.as_mut() {
            sweep.reload(self.frequency);
            if sweep.shift != 0 && sweep.calculate() > 2047 {
                self.enabled = false;
            }
        }
    }

    fn clock_length(&mut self) {
        if self.length_enable && self.length > 0 {
            self.length -= 1;
            if self.length == 0 {
                self.enabled = false;
            }
        }
    }

    fn clock_sweep(&mut self) {
        let Some(sweep) = self.sweep.as_mut() else {
            return;
        };
        if !sweep.enabled {
            return;
        }
        if sweep.timer > 0 {
            sweep.timer -= 1;
        }
        if sweep.timer == 0 {
            sweep.timer = if sweep.period == 0 { 8 } else { sweep.period };
            if sweep.period != 0 {
                let new_freq = sweep.calculate();
                if new_freq > 2047 {
                    self.enabled = false;
                    sweep.enabled = false;
                } else if sweep.shift != 0 {
                    sweep.shadow = new_freq;
                    self.frequency = new_freq;
                    if sweep.calculate() > 2047 {
                        self.enabled = false;
                        sweep.enabled = false;
                    }
                }
            }
        }
    }
}

struct FrameSequencer {
    step: u8,
    counter: u32,
}

impl FrameSequencer {
    fn new() -> Self {
        Self { step: 0, counter: 0 }
    }

    fn advance(&mut self) -> u8 {
        let step = self.step;
        self.step = (self.step + 1) & 7;
        step
    }
}

/// Two-pulse-channel APU producing mono `f32` samples at 44.1 kHz.
///
/// Wave and noise synthesis are not modeled; their registers read as open
/// bus. Samples go into a lossy SPSC queue drained by the host audio
/// callback.
pub struct Apu {
    ch1: PulseChannel,
    ch2: PulseChannel,
    nr50: u8,
    nr51: u8,
    power: bool,
    regs: [u8; 0x17],
    sequencer: FrameSequencer,
    sample_timer: u32,
    output: AudioProducer,
    consumer: AudioConsumer,
}

impl Apu {
    pub fn new() -> Self {
        let (output, consumer) = audio_queue(QUEUE_CAPACITY);
        let mut apu = Self {
            ch1: PulseChannel::new(true),
            ch2: PulseChannel::new(false),
            nr50: 0x77,
            nr51: 0xF3,
            power: true,
            regs: [0; 0x17],
            sequencer: FrameSequencer::new(),
            sample_timer: 0,
            output,
            consumer,
        };

        // Post-boot channel 1 state: duty 50%, full volume, DAC on.
        apu.ch1.duty = 2;
        apu.ch1.length = 0x3F;
        apu.ch1.envelope.initial = 0x0F;
        apu.ch1.envelope.volume = 0x0F;
        apu.ch1.envelope.period = 3;
        apu.ch1.frequency = 0x03FF;
        apu.ch1.dac_enabled = true;

        apu.ch2.length = 0x3F;
        apu.ch2.frequency = 0x03FF;

        apu.regs[0x01] = 0xBF;
        apu.regs[0x02] = 0xF3;

        apu
    }

    /// Handle for the audio consumer side of the sample queue.
    pub fn samples(&self) -> AudioConsumer {
        self.consumer.clone()
    }

    fn read_mask(addr: u16) -> u8 {
        match addr {
            0xFF10 => 0x80,
            0xFF11 | 0xFF16 => 0x3F,
            0xFF12 | 0xFF17 => 0x00,
            0xFF13 | 0xFF18 => 0xFF,
            0xFF14 | 0xFF19 => 0xBF,
            0xFF24 | 0xFF25 => 0x00,
            0xFF26 => 0x70,
            _ => 0xFF,
        }
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF26 => {
                let mut val = 0x70;
                if self.power {
                    val |= 0x80;
                }
                if self.ch1.enabled {
                    val |= 0x01;
                }
                if self.ch2.enabled {
                    val |= 0x02;
                }
                val
            }
            0xFF10..=0xFF19 | 0xFF24 | 0xFF25 => {
                self.regs[(addr - 0xFF10) as usize] | Self::read_mask(addr)
            }
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        if !self.power && addr != 0xFF26 {
            return;
        }
        if matches!(addr, 0xFF10..=0xFF19 | 0xFF24 | 0xFF25) {
            self.regs[(addr - 0xFF10) as usize] = val;
        }
        match addr {
            0xFF10 => {
                if let Some(sweep) = self.ch1.sweep.as_mut() {
                    sweep.set_params(val);
                }
            }
            0xFF11 => {
                self.ch1.duty = val >> 6;
                self.ch1.length = 64 - (val & 0x3F);
            }
            0xFF12 => {
                self.ch1.dac_enabled = val & 0xF8 != 0;
                if !self.ch1.dac_enabled {
                    self.ch1.enabled = false;
                }
            }
            0xFF13 => self.ch1.frequency = (self.ch1.frequency & 0x0700) | val as u16,
            0xFF14 => {
                self.ch1.frequency =
                    (self.ch1.frequency & 0x00FF) | (((val & 0x07) as u16) << 8);
                self.ch1.length_enable = val & 0x40 != 0;
                if val & 0x80 != 0 {
                    let nr12 = self.regs[0x02];
                    self.ch1.trigger(nr12);
                }
            }
            0xFF16 => {
                self.ch2.duty = val >> 6;
                self.ch2.length = 64 - (val & 0x3F);
            }
            0xFF17 => {
                self.ch2.dac_enabled = val & 0xF8 != 0;
                if !self.ch2.dac_enabled {
                    self.ch2.enabled = false;
                }
            }
            0xFF18 => self.ch2.frequency = (self.ch2.frequency & 0x0700) | val as u16,
            0xFF19 => {
                self.ch2.frequency =
                    (self.ch2.frequency & 0x00FF) | (((val & 0x07) as u16) << 8);
                self.ch2.length_enable = val & 0x40 != 0;
                if val & 0x80 != 0 {
                    let nr22 = self.regs[0x07];
                    self.ch2.trigger(nr22);
                }
            }
            0xFF24 => self.nr50 = val,
            0xFF25 => self.nr51 = val,
            0xFF26 => {
                let was_on = self.power;
                self.power = val & 0x80 != 0;
                if was_on && !self.power {
                    self.power_off();
                }
            }
            _ => {}
        }
    }

    fn power_off(&mut self) {
        self.ch1 = PulseChannel::new(true);
        self.ch2 = PulseChannel::new(false);
        self.regs.fill(0);
        self.nr50 = 0;
        self.nr51 = 0;
        self.sequencer = FrameSequencer::new();
    }

    /// Advance the APU by `cycles` T-cycles, clocking the frame sequencer
    /// and emitting one mono sample every CPU_CLOCK_HZ / 44_100 cycles.
    pub fn step(&mut self, cycles: u32) {
        let cycles_per_sample = CPU_CLOCK_HZ / SAMPLE_RATE;
        for _ in 0..cycles {
            self.ch1.step(1);
            self.ch2.step(1);

            self.sequencer.counter += 1;
            if self.sequencer.counter >= FRAME_SEQUENCER_PERIOD {
                self.sequencer.counter = 0;
                match self.sequencer.advance() {
                    0 | 4 => {
                        self.ch1.clock_length();
                        self.ch2.clock_length();
                    }
                    2 | 6 => {
                        self.ch1.clock_length();
                        self.ch2.clock_length();
                        self.ch1.clock_sweep();
                    }
                    7 => {
                        self.ch1.envelope.clock();
                        self.ch2.envelope.clock();
                    }
                    _ => {}
                }
            }

            self.sample_timer += 1;
            if self.sample_timer >= cycles_per_sample {
                self.sample_timer -= cycles_per_sample;
                let sample = self.mix_output();
                self.output.push(sample);
            }
        }
    }

    /// Mono mix of both channels, scaled by the NR50 master volume. A
    /// channel contributes when NR51 routes it to either side.
    fn mix_output(&self) -> f32 {
        if !self.power {
            return 0.0;
        }
        let mut sample = 0.0;
        if self.nr51 & 0x11 != 0 {
            sample += self.ch1.dac_output();
        }
        if self.nr51 & 0x22 != 0 {
            sample += self.ch2.dac_output();
        }
        let left_vol = (self.nr50 >> 4) & 0x07;
        let right_vol = self.nr50 & 0x07;
        let volume = (left_vol + right_vol + 2) as f32 / 16.0;
        sample * volume * 0.25
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}
